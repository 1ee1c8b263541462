//! Coverage for `StreamDecode`'s external source mode, the generic
//! flush-for-input behaviour, and `last_error`.

use ::std::fs;

use ::filterio::engine::Source;
use ::filterio::Engine;
use ::filterio::EngineConfig;
use ::filterio::ParamDict;
use ::filterio::ParamValue;

fn temp_path(name: &str) -> ::std::path::PathBuf {
    let mut p = ::std::env::temp_dir();
    p.push(format!("filterio-supplemented-test-{name}-{}", ::std::process::id()));
    p
}

#[test]
fn stream_decode_reads_straight_through_an_external_file_source() {
    let path = temp_path("external-file");
    fs::write(&path, b"bytes living on disk, no terminator needed").unwrap();

    let mut engine = Engine::new(EngineConfig::default());
    // The underlying filter is irrelevant when `Filename` is supplied: the
    // external-source mode bypasses it entirely and opens its own device.
    let irrelevant = engine.open_bytes(b"ignored".to_vec(), false).unwrap();
    let params = ParamDict::new().with(
        "Filename",
        ParamValue::Bytes(path.to_str().unwrap().as_bytes().to_vec()),
    );
    let r = engine
        .open("StreamDecode", params, Source::Filter(irrelevant), false)
        .unwrap();
    let out = engine.read_all(r).unwrap();

    let _ = fs::remove_file(&path);
    assert_eq!(out, b"bytes living on disk, no terminator needed");
}

#[test]
fn stream_decode_reads_straight_through_an_embedded_byte_source() {
    let mut engine = Engine::new(EngineConfig::default());
    let irrelevant = engine.open_bytes(b"ignored".to_vec(), false).unwrap();
    let params = ParamDict::new().with(
        "HqEmbeddedStream",
        ParamValue::Bytes(b"already-resident payload".to_vec()),
    );
    let r = engine
        .open("StreamDecode", params, Source::Filter(irrelevant), false)
        .unwrap();
    assert_eq!(engine.read_all(r).unwrap(), b"already-resident payload");
}

/// Flushing an input filter drains it to its own EOF and then closes it,
/// rather than erroring the way an encode-only `flush` would for a decode
/// filter in the original framework.
#[test]
fn flushing_an_input_filter_drains_it_and_closes_it() {
    let mut engine = Engine::new(EngineConfig::default());
    let r = engine.open_bytes(b"only a few bytes".to_vec(), false).unwrap();
    assert!(engine.is_live(r));

    engine.flush(r).unwrap();

    assert!(!engine.is_live(r));
}

/// A filter that hits a decode error (here: an AES key of an invalid
/// length) defers it onto the core instead of panicking; repeated
/// `get_byte` calls keep re-reporting the same error until `last_error`
/// surfaces and clears it, closing the filter as a side effect.
#[test]
fn last_error_surfaces_a_deferred_error_exactly_once() {
    let mut engine = Engine::new(EngineConfig::default());
    let src = engine.open_bytes(vec![0u8; 32], false).unwrap();
    let params = ParamDict::new().with("Key", ParamValue::Bytes(vec![0u8; 10]));
    let r = engine.open("AESDecode", params, Source::Filter(src), false).unwrap();

    assert!(engine.get_byte(r).is_err());
    assert!(engine.get_byte(r).is_err());
    assert!(engine.is_live(r));

    assert!(engine.last_error(r).is_some());
    assert!(!engine.is_live(r));
    assert!(engine.last_error(r).is_none());
}

#[test]
fn last_error_is_none_for_a_stale_reference() {
    let mut engine = Engine::new(EngineConfig::default());
    let r = engine.open_bytes(b"x".to_vec(), false).unwrap();
    engine.close(r, ::filterio::CloseReason::Explicit).unwrap();
    assert!(engine.last_error(r).is_none());
}
