//! ReusableStreamDecode: caches everything read from its underlying filter
//! so the stream can be replayed from the start without re-running the
//! underlying decode chain. REFERENCE: [4.10 Reusable stream decoder].

use crate::arena::FilterRef;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::FilterError;
use crate::error::FilterErrorCode;
use crate::error::FilterResult;
use crate::filter::param::ParamDict;
use crate::filter::state::DecodeOutcome;
use crate::filter::Built;
use crate::filter::Direction;
use crate::filter::Flags;
use crate::filter::FilterKind;
use crate::filter::FilterOps;

pub struct RsdState {
    cache: Vec<u8>,
    pos: usize,
    underlying_exhausted: bool,
}

impl RsdState {
    pub fn construct(
        _params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Input) {
            return Err(FilterError::new(
                "ReusableStreamDecode",
                FilterErrorCode::InvalidAccess("requires a readable underlying source".into()),
            ));
        }
        Ok(Built {
            kind: FilterKind::Rsd(Box::new(RsdState {
                cache: Vec::new(),
                pos: 0,
                underlying_exhausted: false,
            })),
            direction: Direction::Input,
            extra_flags: Flags::REWINDABLE | Flags::REUSABLE_STREAM,
            buffer_size: config.stream_buffer_size,
        })
    }
}

impl FilterOps for RsdState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        if self.pos < self.cache.len() {
            let n = (self.cache.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.cache[self.pos..self.pos + n]);
            self.pos += n;
            return if self.pos == self.cache.len() && self.underlying_exhausted {
                Ok(DecodeOutcome::Eof { produced: n })
            } else {
                Ok(DecodeOutcome::Filled { produced: n })
            };
        }
        if self.underlying_exhausted {
            return Ok(DecodeOutcome::Eof { produced: 0 });
        }
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("ReusableStreamDecode"))?;
        let n = engine.read(underlying, out)?;
        self.cache.extend_from_slice(&out[..n]);
        self.pos += n;
        if n < out.len() {
            self.underlying_exhausted = true;
            Ok(DecodeOutcome::Eof { produced: n })
        } else {
            Ok(DecodeOutcome::Filled { produced: n })
        }
    }

    fn reset(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        self.pos = 0;
        Ok(())
    }

    fn get_position(&self) -> Option<u64> {
        Some(self.pos as u64)
    }

    fn set_position(&mut self, _engine: &mut Engine, _this: FilterRef, pos: u64) -> FilterResult<()> {
        let pos = pos as usize;
        if pos > self.cache.len() && !self.underlying_exhausted {
            return Err(FilterError::new(
                "ReusableStreamDecode",
                FilterErrorCode::RangeCheck("cannot seek past what has been cached".into()),
            ));
        }
        self.pos = pos.min(self.cache.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_the_same_bytes_after_reset() {
        let mut engine = crate::Engine::new(Default::default());
        let src = engine.open_bytes(b"replay me".to_vec(), false).unwrap();
        let built =
            RsdState::construct(&ParamDict::new(), &EngineConfig::default(), Some(Direction::Input)).unwrap();
        let r = engine.install_for_tests(built, Some(src));

        assert_eq!(engine.read_all(r).unwrap(), b"replay me");
        engine.reset(r).unwrap();
        assert_eq!(engine.read_all(r).unwrap(), b"replay me");
    }
}
