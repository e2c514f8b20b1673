//! Response cleanup for LLM outputs.
//!
//! Models are asked for raw SQL but frequently wrap it in markdown fences
//! anyway. Fences are removed wherever they appear; nothing else about the
//! text is changed.

use regex::Regex;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:sql)?").expect("fence pattern is valid")
});

/// Removes markdown code-fence markers and surrounding whitespace.
///
/// Idempotent: clean text is returned unchanged (modulo trimming).
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}
