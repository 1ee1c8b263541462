//! End-to-end tests for the consumer-facing properties that apply to every
//! decode filter, driven purely through the public `Engine` API the way a
//! real consumer would use it.

use ::filterio::engine::Source;
use ::filterio::filter::image::dct::DctState;
use ::filterio::filter::FilterKind;
use ::filterio::Engine;
use ::filterio::EngineConfig;
use ::filterio::ParamDict;
use ::filterio::ParamValue;

fn identity_chain(engine: &mut Engine, bytes: Vec<u8>) -> ::filterio::FilterRef {
    let src = engine.open_bytes(bytes, false).unwrap();
    // DCTDecode's `decode` is pure passthrough (no real JPEG codec is in
    // scope), which makes it a convenient stand-in for "an identity
    // transform over its underlying".
    engine
        .open_image_decoder(
            FilterKind::DctDecode(Box::new(DctState::new(None))),
            64,
            Source::Filter(src),
            false,
        )
        .unwrap()
}

#[test]
fn identity_and_byte_count_are_preserved() {
    let mut engine = Engine::new(EngineConfig::default());
    let input = b"the quick brown fox jumps over the lazy dog".to_vec();
    let r = identity_chain(&mut engine, input.clone());
    let out = engine.read_all(r).unwrap();
    assert_eq!(out, input);
    assert_eq!(out.len(), input.len());
}

#[test]
fn eof_is_idempotent() {
    let mut engine = Engine::new(EngineConfig::default());
    let r = identity_chain(&mut engine, b"ab".to_vec());
    assert_eq!(engine.get_byte(r).unwrap(), Some(b'a'));
    assert_eq!(engine.get_byte(r).unwrap(), Some(b'b'));
    assert_eq!(engine.get_byte(r).unwrap(), None);
    // Once EOF is reached, repeated get_byte calls keep returning EOF rather
    // than erroring or re-running the underlying decode.
    assert_eq!(engine.get_byte(r).unwrap(), None);
    assert_eq!(engine.get_byte(r).unwrap(), None);
}

#[test]
fn unget_is_honoured_mid_stream_and_across_the_eof_boundary() {
    let mut engine = Engine::new(EngineConfig::default());
    let r = identity_chain(&mut engine, b"xyz".to_vec());

    // Mid-stream: get then immediately unget must be transparent.
    let first = engine.get_byte(r).unwrap().unwrap();
    assert_eq!(first, b'x');
    engine.unget_byte(r, first).unwrap();
    assert_eq!(engine.get_byte(r).unwrap(), Some(first));

    let second = engine.get_byte(r).unwrap().unwrap();
    assert_eq!(second, b'y');
    let last = engine.get_byte(r).unwrap().unwrap();
    assert_eq!(last, b'z');

    // Push the final byte back across the last-char/EOF boundary: the next
    // get_byte must still return it before reporting real EOF.
    engine.unget_byte(r, last).unwrap();
    assert_eq!(engine.get_byte(r).unwrap(), Some(last));
    assert_eq!(engine.get_byte(r).unwrap(), None);
}

#[test]
fn closed_reference_is_invalidated_and_does_not_resurrect_on_slot_reuse() {
    let mut engine = Engine::new(EngineConfig::default());
    let a = identity_chain(&mut engine, b"first".to_vec());
    assert!(engine.is_live(a));
    // Close while there is still unread data, so this exercises explicit
    // close invalidating the reference rather than the close-on-EOF path.
    assert_eq!(engine.get_byte(a).unwrap(), Some(b'f'));

    engine.close(a, ::filterio::CloseReason::Explicit).unwrap();
    assert!(!engine.is_live(a));
    // Any further operation on the stale reference reports an error rather
    // than silently reusing whatever now occupies the slot.
    assert!(engine.get_byte(a).is_err());

    // A fresh filter may legitimately reuse the same arena slot the closed
    // one vacated, but the stale handle must still not observe it.
    let b = identity_chain(&mut engine, b"second".to_vec());
    assert!(engine.is_live(b));
    assert!(!engine.is_live(a));
    assert_eq!(engine.read_all(b).unwrap(), b"second");
}

#[test]
fn reading_to_natural_eof_implicitly_closes_the_filter() {
    let mut engine = Engine::new(EngineConfig::default());
    let r = identity_chain(&mut engine, b"ab".to_vec());
    assert!(engine.is_live(r));

    // Reading to natural EOF (no explicit close/flush call) must dispose the
    // filter on its own, per the close-on-last-character-read contract.
    assert_eq!(engine.read_all(r).unwrap(), b"ab");
    assert!(!engine.is_live(r));
}

#[test]
fn restore_closes_overlying_filters_created_after_the_save_mark() {
    let mut engine = Engine::new(EngineConfig::default());
    let base = engine.open_bytes(b"0123456789".to_vec(), false).unwrap();
    let mark = engine.save();

    let params = ParamDict::new().with("Length", ParamValue::Int(5));
    let overlying = engine
        .open("StreamDecode", params, Source::Filter(base), false)
        .unwrap();
    assert!(engine.is_live(overlying));
    assert!(engine.is_live(base));

    engine.restore(mark).unwrap();

    // The filter created after the save mark is force-closed...
    assert!(!engine.is_live(overlying));
    // ...while the filter that predates the mark survives the restore.
    assert!(engine.is_live(base));
    assert_eq!(engine.read_all(base).unwrap(), b"0123456789");
}
