//! Query safety gate.
//!
//! A keyword filter that keeps data-modifying statements away from the
//! database. It does not parse SQL: it is allow-by-default and rejects a
//! statement when a forbidden keyword starts it or appears as a
//! whitespace-delimited token anywhere in it. Keywords embedded in longer
//! identifiers (`updated_at`, `is_deleted`) are not matched. A statement that
//! smuggles a keyword past this (e.g. `(DELETE ...)`) is not caught; this is
//! a lightweight barrier, not a guarantee.

use std::fmt;

/// Keywords that mark a statement as data-modifying.
pub const FORBIDDEN_KEYWORDS: [&str; 8] = [
    "DROP", "DELETE", "INSERT", "UPDATE", "ALTER", "TRUNCATE", "GRANT", "REVOKE",
];

/// Outcome of running a statement through the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyVerdict {
    /// No forbidden keyword was found.
    Safe,
    /// The statement contains the given forbidden keyword.
    Rejected { keyword: &'static str },
}

impl SafetyVerdict {
    /// Returns true if the statement may be executed.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }
}

impl fmt::Display for SafetyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Rejected { keyword } => write!(f, "Rejected ({keyword})"),
        }
    }
}

/// Classifies `sql`, reporting the first forbidden keyword found.
pub fn check(sql: &str) -> SafetyVerdict {
    let upper = sql.to_uppercase();
    let statement = upper.trim_start();

    for keyword in FORBIDDEN_KEYWORDS {
        let leading = statement.starts_with(keyword);
        let standalone = statement.split_whitespace().any(|token| token == keyword);
        if leading || standalone {
            return SafetyVerdict::Rejected { keyword };
        }
    }

    SafetyVerdict::Safe
}

/// Returns true if `sql` looks read-only.
pub fn is_safe(sql: &str) -> bool {
    check(sql).is_safe()
}
