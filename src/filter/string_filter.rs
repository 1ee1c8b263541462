//! The string filter: a decode/encode pair backed directly by an in-memory
//! byte string rather than a further underlying filter. REFERENCE:
//! [4.5 String filter].

use crate::arena::FilterRef;
use crate::engine::Engine;
use crate::error::FilterResult;
use crate::filter::state::DecodeOutcome;
use crate::filter::FilterOps;

pub struct StringDecodeState {
    bytes: Vec<u8>,
    pos: usize,
}

impl StringDecodeState {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl FilterOps for StringDecodeState {
    fn decode(
        &mut self,
        _engine: &mut Engine,
        _this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let remaining = &self.bytes[self.pos..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        if self.pos == self.bytes.len() {
            Ok(DecodeOutcome::Eof { produced: n })
        } else {
            Ok(DecodeOutcome::Filled { produced: n })
        }
    }

    fn get_position(&self) -> Option<u64> {
        Some(self.pos as u64)
    }

    fn set_position(&mut self, _engine: &mut Engine, _this: FilterRef, pos: u64) -> FilterResult<()> {
        self.pos = (pos as usize).min(self.bytes.len());
        Ok(())
    }

    fn reset(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        self.pos = 0;
        Ok(())
    }
}

pub struct StringEncodeState {
    bytes: Vec<u8>,
}

impl StringEncodeState {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl FilterOps for StringEncodeState {
    fn decode(
        &mut self,
        _engine: &mut Engine,
        _this: FilterRef,
        _out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        Err(crate::error::FilterError::new(
            "StringEncode",
            crate::error::FilterErrorCode::InvalidAccess("output filter".into()),
        ))
    }

    fn encode(&mut self, _engine: &mut Engine, _this: FilterRef, input: &[u8]) -> FilterResult<()> {
        self.bytes.extend_from_slice(input);
        Ok(())
    }

    fn get_position(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }
}
