//! ObFontDecode: a 32-byte XOR prelude keyed by scanning backward through a
//! key string for hex digits, starting just before its last `.`. REFERENCE:
//! [4.8 Obfuscated-font filter], grounded on `obfont.c`
//! (`get_prev_hex_digit`, `obFontFilterInit`, `obFontDecodeBuffer`).

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

const PRELUDE_LEN: usize = 32;
const KEY_LEN: usize = 16;

/// Scans `key` backward from `start` (exclusive) for the next ASCII hex
/// digit, wrapping around to the end of the string if the start of the
/// string is reached before enough digits are found. Returns the digit's
/// value and the index to resume scanning from. REFERENCE: `obfont.c`,
/// `get_prev_hex_digit`.
fn prev_hex_digit(key: &[u8], mut cursor: usize) -> FilterResult<(u8, usize)> {
    if key.is_empty() {
        return Err(FilterError::new(
            "ObFontDecode",
            FilterErrorCode::RangeCheck("empty key".into()),
        ));
    }
    for _ in 0..=key.len() {
        cursor = if cursor == 0 { key.len() - 1 } else { cursor - 1 };
        if let Some(digit) = (key[cursor] as char).to_digit(16) {
            return Ok((digit as u8, cursor));
        }
    }
    Err(FilterError::new(
        "ObFontDecode",
        FilterErrorCode::RangeCheck("key contains no hex digits".into()),
    ))
}

/// Finds the index just before the last `.` in `key` (or the end of the
/// string if there is none), which is where the backward scan starts.
fn scan_start(key: &[u8]) -> usize {
    key.iter()
        .rposition(|&b| b == b'.')
        .unwrap_or(key.len())
}

/// Derives the 32-byte XOR prelude key from a font file name: scans 16 bytes
/// backward for the key proper, then repeats it once to fill the remaining
/// half. REFERENCE: `obFontFilterInit`.
fn derive_prelude(key: &[u8]) -> FilterResult<[u8; PRELUDE_LEN]> {
    let mut prelude = [0u8; PRELUDE_LEN];
    let mut cursor = scan_start(key);
    let mut i = 0;
    while i < KEY_LEN {
        let (hi, next_cursor) = prev_hex_digit(key, cursor)?;
        cursor = next_cursor;
        let (lo, next_cursor) = prev_hex_digit(key, cursor)?;
        cursor = next_cursor;
        prelude[i] = (hi << 4) | lo;
        i += 1;
    }
    let (first, second) = prelude.split_at_mut(KEY_LEN);
    second.copy_from_slice(first);
    Ok(prelude)
}

pub struct ObFontState {
    prelude: [u8; PRELUDE_LEN],
    position: usize,
}

impl ObFontState {
    pub fn construct(
        params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Input) {
            return Err(FilterError::new(
                "ObFontDecode",
                FilterErrorCode::InvalidAccess("requires a readable underlying source".into()),
            ));
        }
        let name = params.require_bytes("ObFontDecode", "Name")?;
        let prelude = derive_prelude(name)?;
        Ok(Built {
            kind: FilterKind::ObFontDecode(ObFontState {
                prelude,
                position: 0,
            }),
            direction: Direction::Input,
            extra_flags: Flags::empty(),
            buffer_size: config.font_file_buffer_size,
        })
    }
}

impl FilterOps for ObFontState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("ObFontDecode"))?;
        let n = engine.read(underlying, out)?;
        for byte in &mut out[..n] {
            if self.position < PRELUDE_LEN {
                *byte ^= self.prelude[self.position];
            }
            self.position += 1;
        }
        if n < out.len() {
            Ok(DecodeOutcome::Eof { produced: n })
        } else {
            Ok(DecodeOutcome::Filled { produced: n })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_start_lands_before_last_dot() {
        assert_eq!(scan_start(b"myfont.A1B2.pfa"), 11);
        assert_eq!(scan_start(b"nodothere"), 9);
    }

    #[test]
    fn prev_hex_digit_wraps_around() {
        let key = b"A1";
        let (digit, cursor) = prev_hex_digit(key, 0).unwrap();
        assert_eq!(digit, 1);
        assert_eq!(cursor, 1);
        let (digit, _) = prev_hex_digit(key, cursor).unwrap();
        assert_eq!(digit, 0xA);
    }

    /// Independently re-derived (via a standalone re-implementation of the
    /// backward hex scan, not this crate) 16-byte key for
    /// `"font.DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF.pfb"`,
    /// repeated once to form the 32-byte prelude.
    const KNOWN_PRELUDE: [u8; PRELUDE_LEN] = [
        254, 235, 218, 237, 254, 235, 218, 237, 254, 235, 218, 237, 254, 235, 218, 237, 254, 235,
        218, 237, 254, 235, 218, 237, 254, 235, 218, 237, 254, 235, 218, 237,
    ];

    #[test]
    fn derive_prelude_matches_a_known_vector() {
        let name = b"font.DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF.pfb";
        let prelude = derive_prelude(name).unwrap();
        assert_eq!(prelude, KNOWN_PRELUDE);
        // The second 16 bytes are always a verbatim repeat of the first.
        assert_eq!(&prelude[..16], &prelude[16..]);
    }

    #[test]
    fn prelude_only_obfuscates_first_32_bytes() {
        let name = b"font.DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF.pfb";

        let mut plain = vec![0x41u8; 40];
        let mut obfuscated = plain.clone();
        for (i, b) in obfuscated.iter_mut().enumerate().take(PRELUDE_LEN) {
            *b ^= KNOWN_PRELUDE[i];
        }

        let mut engine = crate::Engine::new(Default::default());
        let src = engine.open_bytes(obfuscated, false).unwrap();
        let params = ParamDict::new().with("Name", crate::filter::param::ParamValue::Bytes(name.to_vec()));
        let built = ObFontState::construct(&params, &EngineConfig::default(), Some(Direction::Input)).unwrap();
        let r = engine.install_for_tests(built, Some(src));
        let decoded = engine.read_all(r).unwrap();
        assert_eq!(decoded, plain);
    }
}
