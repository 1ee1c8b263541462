//! RC4Decode/RC4Encode: the stream cipher is its own inverse, so both
//! directions share one state. REFERENCE: [4.6 RC4 filter], grounded on
//! `rc4.c` (`RC4DecodeBuffer`/key-scheduling `rc4_init`).

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

/// The classic RC4 key-scheduling algorithm and pseudo-random generation
/// algorithm, kept as a small self-contained struct rather than pulled in
/// from a crate: the whole cipher is ~20 lines and every RustCrypto stream
/// cipher crate demands a fixed key-length type parameter that does not
/// suit PDF's variable-length (5-16 byte) keys. REFERENCE: `rc4.c`.
struct KeyStream {
    s: [u8; 256],
    i: u8,
    j: u8,
}

impl KeyStream {
    fn new(key: &[u8]) -> FilterResult<Self> {
        if key.is_empty() || key.len() > 256 {
            return Err(FilterError::new(
                "RC4",
                FilterErrorCode::RangeCheck("key must be 1-256 bytes".into()),
            ));
        }
        let mut s = [0u8; 256];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut j: u8 = 0;
        for i in 0..256 {
            j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
            s.swap(i, j as usize);
        }
        Ok(Self { s, i: 0, j: 0 })
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        self.j = self.j.wrapping_add(self.s[self.i as usize]);
        self.s.swap(self.i as usize, self.j as usize);
        let sum = self.s[self.i as usize].wrapping_add(self.s[self.j as usize]);
        self.s[sum as usize]
    }

    fn apply(&mut self, buf: &mut [u8]) {
        for byte in buf {
            *byte ^= self.next_byte();
        }
    }
}

pub struct Rc4State {
    keystream: KeyStream,
}

impl Rc4State {
    fn build(params: &ParamDict, config: &EngineConfig, direction: Direction) -> FilterResult<Built> {
        let key = params.require_bytes("RC4", "Key")?;
        let keystream = KeyStream::new(key)?;
        Ok(Built {
            kind: FilterKind::Rc4(Rc4State { keystream }),
            direction,
            extra_flags: Flags::empty(),
            buffer_size: config.rc4_buffer_size,
        })
    }

    pub fn construct_decode(
        params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Input) {
            return Err(FilterError::new(
                "RC4Decode",
                FilterErrorCode::InvalidAccess("requires a readable underlying source".into()),
            ));
        }
        Self::build(params, config, Direction::Input)
    }

    pub fn construct_encode(
        params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Output) {
            return Err(FilterError::new(
                "RC4Encode",
                FilterErrorCode::InvalidAccess("requires a writable underlying target".into()),
            ));
        }
        Self::build(params, config, Direction::Output)
    }
}

impl FilterOps for Rc4State {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("RC4Decode"))?;
        let n = engine.read(underlying, out)?;
        self.keystream.apply(&mut out[..n]);
        if n < out.len() {
            Ok(DecodeOutcome::Eof { produced: n })
        } else {
            Ok(DecodeOutcome::Filled { produced: n })
        }
    }

    fn encode(&mut self, engine: &mut Engine, this: FilterRef, input: &[u8]) -> FilterResult<()> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("RC4Encode"))?;
        let mut buf = input.to_vec();
        self.keystream.apply(&mut buf);
        engine.write(underlying, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_through_the_engine_recovers_plaintext() {
        let key = b"secretkey".to_vec();
        let plaintext = b"attack at dawn".to_vec();
        let mut ciphertext = plaintext.clone();
        KeyStream::new(&key).unwrap().apply(&mut ciphertext);

        let mut engine = crate::Engine::new(Default::default());
        let src = engine.open_bytes(ciphertext, false).unwrap();
        let params = ParamDict::new().with("Key", crate::filter::param::ParamValue::Bytes(key));
        let built =
            Rc4State::construct_decode(&params, &EngineConfig::default(), Some(Direction::Input)).unwrap();
        let r = engine.install_for_tests(built, Some(src));
        assert_eq!(engine.read_all(r).unwrap(), plaintext);
    }

    #[test]
    fn keystream_is_deterministic_for_a_given_key() {
        let mut a = KeyStream::new(b"Key").unwrap();
        let mut b = KeyStream::new(b"Key").unwrap();
        let mut buf_a = *b"Plaintext";
        let mut buf_b = *b"Plaintext";
        a.apply(&mut buf_a);
        b.apply(&mut buf_b);
        assert_eq!(buf_a, buf_b);
        assert_ne!(&buf_a[..], b"Plaintext");
    }

    #[test]
    fn rejects_empty_key() {
        assert!(KeyStream::new(b"").is_err());
    }
}
