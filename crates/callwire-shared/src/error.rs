use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an operation failure should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The requested operation cannot succeed as issued.
    Fatal,
    /// The operation failed but may succeed if issued again.
    Recoverable,
    /// Informational only; the call continues unaffected.
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fatal => "fatal",
            Self::Recoverable => "recoverable",
            Self::Advisory => "advisory",
        };
        f.write_str(s)
    }
}

/// A stored enum column held a value no variant matches.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
