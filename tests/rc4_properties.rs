//! RC4Encode/RC4Decode reversibility, driven through the public `Engine`
//! registry API and a real temporary file as the encode target / decode
//! source.

use ::std::fs;

use ::filterio::device::FileDevice;
use ::filterio::engine::Source;
use ::filterio::filter::Direction;
use ::filterio::Engine;
use ::filterio::EngineConfig;
use ::filterio::ParamDict;
use ::filterio::ParamValue;

fn temp_path(name: &str) -> ::std::path::PathBuf {
    let mut p = ::std::env::temp_dir();
    p.push(format!("filterio-rc4-test-{name}-{}", ::std::process::id()));
    p
}

#[test]
fn encode_then_decode_recovers_the_plaintext() {
    let key = b"secretkey".to_vec();
    let plaintext = b"attack at dawn, bring the whole army".to_vec();
    let path = temp_path("roundtrip");

    let mut engine = Engine::new(EngineConfig::default());
    let file = FileDevice::create_write(&path).unwrap();
    let target = engine
        .open_device(Box::new(file), "RC4Encode:target", Direction::Output)
        .unwrap();
    let enc_params = ParamDict::new().with("Key", ParamValue::Bytes(key.clone()));
    let enc = engine
        .open("RC4Encode", enc_params, Source::Filter(target), false)
        .unwrap();
    engine.write(enc, &plaintext).unwrap();
    engine.flush(enc).unwrap();
    engine.close(enc, ::filterio::CloseReason::Explicit).unwrap();
    engine.close(target, ::filterio::CloseReason::Explicit).unwrap();

    let reader = FileDevice::open_read(&path).unwrap();
    let src = engine
        .open_device(Box::new(reader), "RC4Decode:source", Direction::Input)
        .unwrap();
    let dec_params = ParamDict::new().with("Key", ParamValue::Bytes(key));
    let dec = engine
        .open("RC4Decode", dec_params, Source::Filter(src), false)
        .unwrap();
    let out = engine.read_all(dec).unwrap();

    let _ = fs::remove_file(&path);
    assert_eq!(out, plaintext);
}

/// Independently computed (via a standalone RC4 key-scheduling/PRGA
/// implementation, not this crate) ciphertext for key `[1, 2, 3, 4, 5]` and
/// plaintext `"hello world 1234"`.
#[test]
fn decode_recovers_a_known_ciphertext_vector() {
    let key: Vec<u8> = vec![1, 2, 3, 4, 5];
    let ciphertext: Vec<u8> = vec![
        218, 92, 15, 105, 159, 29, 183, 72, 190, 175, 54, 106, 59, 35, 43, 156,
    ];

    let mut engine = Engine::new(EngineConfig::default());
    let src = engine.open_bytes(ciphertext, false).unwrap();
    let params = ParamDict::new().with("Key", ParamValue::Bytes(key));
    let dec = engine.open("RC4Decode", params, Source::Filter(src), false).unwrap();
    let out = engine.read_all(dec).unwrap();

    assert_eq!(out, b"hello world 1234");
}

/// RC4 is its own inverse: decoding a stream twice with the same key must
/// restore the original bytes, entirely in memory (no file round trip
/// needed since `RC4Decode` can sit directly on top of another `RC4Decode`).
#[test]
fn decoding_twice_with_the_same_key_is_the_identity() {
    let key = b"identity-key".to_vec();
    let plaintext = b"round and round it goes".to_vec();

    let mut engine = Engine::new(EngineConfig::default());
    let src = engine.open_bytes(plaintext.clone(), false).unwrap();
    let first_params = ParamDict::new().with("Key", ParamValue::Bytes(key.clone()));
    let first = engine
        .open("RC4Decode", first_params, Source::Filter(src), false)
        .unwrap();
    let second_params = ParamDict::new().with("Key", ParamValue::Bytes(key));
    let second = engine
        .open("RC4Decode", second_params, Source::Filter(first), false)
        .unwrap();

    assert_eq!(engine.read_all(second).unwrap(), plaintext);
}
