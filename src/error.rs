//! Error kinds for the query-string codec (§7).
//!
//! Every kind named in spec §7 gets a variant. In lax (default) mode the
//! parser is infallible on any byte input — `QsError` only ever surfaces
//! from limit enforcement, strict-mode checks, or a user hook returning
//! an error. Internal invariant violations are bugs, not `QsError`s, and
//! are never caught here — they panic.

use std::error::Error as StdError;
use std::fmt;

/// A processing error from `parse` or `stringify`.
#[derive(Debug)]
pub enum QsError {
    /// A key path exceeded `depth` segments while `strictDepth` was set.
    DepthExceeded,
    /// The raw parameter count exceeded `parameterLimit` while
    /// `throwOnLimitExceeded` was set.
    ParameterLimitExceeded,
    /// A `combine` duplicate pushed an array past `arrayLimit` while
    /// `throwOnLimitExceeded` was set.
    ArrayLimitExceeded,
    /// `strictMode` rejected an unclosed `[` in a key.
    UnclosedBracket,
    /// `strictMode` rejected a malformed `%` escape.
    InvalidPercentEncoding,
    /// A user-supplied decoder returned an error.
    DecodeError(Box<dyn StdError + Send + Sync>),
    /// A user-supplied encoder or filter hook returned an error.
    EncodeError(Box<dyn StdError + Send + Sync>),
    /// `stringify` was called on something that isn't a valid root
    /// (only `Value::Map` roots are accepted — see `stringify.rs`).
    InvalidTarget,
}

impl fmt::Display for QsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QsError::DepthExceeded => write!(f, "key nesting exceeded the configured depth"),
            QsError::ParameterLimitExceeded => {
                write!(f, "parameter count exceeded parameterLimit")
            }
            QsError::ArrayLimitExceeded => write!(f, "array length exceeded arrayLimit"),
            QsError::UnclosedBracket => write!(f, "unclosed '[' in key"),
            QsError::InvalidPercentEncoding => write!(f, "invalid percent-encoding"),
            QsError::DecodeError(e) => write!(f, "decoder error: {}", e),
            QsError::EncodeError(e) => write!(f, "encoder error: {}", e),
            QsError::InvalidTarget => write!(f, "stringify target must be a Map"),
        }
    }
}

impl StdError for QsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            QsError::DecodeError(e) | QsError::EncodeError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QsError>;
