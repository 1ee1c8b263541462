//! ObFontDecode end-to-end scenario: the 32-byte XOR prelude derived from a
//! font file name only covers the first 32 bytes of the stream, and the
//! derivation itself scans backward from just before the last `.`.

use ::filterio::engine::Source;
use ::filterio::Engine;
use ::filterio::EngineConfig;
use ::filterio::ParamDict;
use ::filterio::ParamValue;

/// Independently re-derived (via a standalone re-implementation of the
/// backward hex scan, not this crate) 16-byte key for the key string
/// `"0123456789abcdef-01234567-89abcdef.odttf"`, repeated once to form the
/// 32-byte prelude.
const PRELUDE: [u8; 32] = [
    254, 220, 186, 152, 118, 84, 50, 16, 254, 220, 186, 152, 118, 84, 50, 16, 254, 220, 186, 152,
    118, 84, 50, 16, 254, 220, 186, 152, 118, 84, 50, 16,
];

#[test]
fn decode_recovers_a_known_prelude_vector() {
    let name = b"0123456789abcdef-01234567-89abcdef.odttf".to_vec();
    let plain = vec![0x41u8; 40];
    let mut obfuscated = plain.clone();
    for (i, b) in obfuscated.iter_mut().enumerate().take(PRELUDE.len()) {
        *b ^= PRELUDE[i];
    }

    let mut engine = Engine::new(EngineConfig::default());
    let src = engine.open_bytes(obfuscated, false).unwrap();
    let params = ParamDict::new().with("Name", ParamValue::Bytes(name));
    let r = engine.open("ObFontDecode", params, Source::Filter(src), false).unwrap();
    let decoded = engine.read_all(r).unwrap();

    assert_eq!(decoded, plain);
}

#[test]
fn only_the_first_32_bytes_are_obfuscated() {
    let name = b"fonts/embedded.A1.pfb".to_vec();
    let plain = vec![0x7Eu8; 50];

    // Derive the real prelude the same way the filter does, by round
    // tripping a single byte through it.
    let mut engine = Engine::new(EngineConfig::default());
    let probe_src = engine.open_bytes(plain.clone(), false).unwrap();
    let probe_params = ParamDict::new().with("Name", ParamValue::Bytes(name.clone()));
    let probe = engine
        .open("ObFontDecode", probe_params, Source::Filter(probe_src), false)
        .unwrap();
    let obfuscated_probe = engine.read_all(probe).unwrap();

    // Since decode is its own inverse (XOR), feeding the probe's output back
    // through a fresh ObFontDecode with the same key must recover `plain`
    // for the first 32 bytes and leave the tail untouched either way.
    let src2 = engine.open_bytes(obfuscated_probe.clone(), false).unwrap();
    let params2 = ParamDict::new().with("Name", ParamValue::Bytes(name));
    let r2 = engine.open("ObFontDecode", params2, Source::Filter(src2), false).unwrap();
    let recovered = engine.read_all(r2).unwrap();

    assert_eq!(recovered, plain);
    // The tail beyond the prelude was never touched by either pass.
    assert_eq!(&obfuscated_probe[32..], &plain[32..]);
}
