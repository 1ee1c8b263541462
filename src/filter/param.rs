//! Filter creation parameters. Stands in for the PostScript parameter
//! dictionary (`/DecodeParms`) read by `filter_create_check_args` in the
//! original sources: a small owned key/value map, not the full PDF object
//! system.

use ::std::collections::BTreeMap;

use crate::error::FilterError;
use crate::error::FilterErrorCode;
use crate::error::FilterResult;

/// One parameter value. Intentionally minimal: filters in this crate only
/// ever need integers, bools, byte strings (keys) and nested dicts
/// (`/DP` chains passed through to an underlying filter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    Dict(ParamDict),
}

/// A filter's creation-time parameter dictionary.
/// REFERENCE: [4.2 Filter lifecycle, Creation].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDict {
    entries: BTreeMap<&'static str, ParamValue>,
}

impl ParamDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, value: ParamValue) -> Self {
        self.entries.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn int(&self, object: &'static str, key: &'static str) -> FilterResult<Option<i64>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParamValue::Int(value)) => Ok(Some(*value)),
            Some(_) => Err(FilterError::new(
                object,
                FilterErrorCode::TypeCheck(format!("{key} is not an integer")),
            )),
        }
    }

    pub fn bool(&self, object: &'static str, key: &'static str) -> FilterResult<Option<bool>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParamValue::Bool(value)) => Ok(Some(*value)),
            Some(_) => Err(FilterError::new(
                object,
                FilterErrorCode::TypeCheck(format!("{key} is not a boolean")),
            )),
        }
    }

    pub fn bytes(&self, object: &'static str, key: &'static str) -> FilterResult<Option<&[u8]>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParamValue::Bytes(value)) => Ok(Some(value.as_slice())),
            Some(_) => Err(FilterError::new(
                object,
                FilterErrorCode::TypeCheck(format!("{key} is not a string")),
            )),
        }
    }

    pub fn dict(&self, object: &'static str, key: &'static str) -> FilterResult<Option<&ParamDict>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParamValue::Dict(value)) => Ok(Some(value)),
            Some(_) => Err(FilterError::new(
                object,
                FilterErrorCode::TypeCheck(format!("{key} is not a dictionary")),
            )),
        }
    }

    pub fn require_int(&self, object: &'static str, key: &'static str) -> FilterResult<i64> {
        self.int(object, key)?.ok_or_else(|| {
            FilterError::new(object, FilterErrorCode::Undefined(key.to_string()))
        })
    }

    pub fn require_bytes(&self, object: &'static str, key: &'static str) -> FilterResult<&[u8]> {
        self.bytes(object, key)?.ok_or_else(|| {
            FilterError::new(object, FilterErrorCode::Undefined(key.to_string()))
        })
    }
}
