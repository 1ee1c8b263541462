//! Crate-wide error kinds. REFERENCE: [7. ERROR HANDLING DESIGN].
//!
//! Every error names the component that raised it plus an opaque, matchable
//! code, rather than a single flat error enum.

use ::thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// One of the error kinds a filter operation can propagate.
/// REFERENCE: [7. ERROR HANDLING DESIGN].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterErrorCode {
    /// Generic underlying-device or protocol failure.
    #[error("I/O error")]
    Io,
    /// Input exceeded declared bounds.
    #[error("limit check: {0}")]
    LimitCheck(String),
    /// Parameter out of range.
    #[error("range check: {0}")]
    RangeCheck(String),
    /// Wrong object/argument type supplied.
    #[error("type check: {0}")]
    TypeCheck(String),
    /// Reader/writer direction mismatch, or access-restricted source.
    #[error("invalid access: {0}")]
    InvalidAccess(String),
    /// A required parameter was missing.
    #[error("undefined: {0}")]
    Undefined(String),
    /// `filter_standard_find` could not resolve a filter name.
    #[error("undefined filter name: {0}")]
    UndefinedFilterName(String),
    /// Allocation failure (arena exhausted, etc).
    #[error("VM error")]
    VmError,
    /// Key derivation or other configuration failure.
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

/// REFERENCE: [7. ERROR HANDLING DESIGN] propagation policy: the framework
/// always knows which component raised an error, even once it has been
/// deferred and re-surfaced several fill cycles later.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{object}: {code}")]
pub struct FilterError {
    pub object: &'static str,
    pub code: FilterErrorCode,
}

impl FilterError {
    pub fn new(object: &'static str, code: FilterErrorCode) -> Self {
        Self { object, code }
    }

    pub fn io(object: &'static str) -> Self {
        Self::new(object, FilterErrorCode::Io)
    }
}
