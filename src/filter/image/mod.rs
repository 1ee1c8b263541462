//! Illustrative image-decoder adapter contracts: `decode_info` prescan,
//! purge-notify callback, scanline-oriented decode. REFERENCE: [4.9
//! Image-decoder adapter contract]. These are plug-in shapes only, not real
//! JPEG/PNG codecs (explicit Non-goal).

pub mod dct;
pub mod png;

/// Invoked when the engine purges a reusable decoder's cached scanlines
/// (e.g. on `reset`), so an adapter holding external decoder resources can
/// release them eagerly rather than waiting for `dispose`. REFERENCE:
/// [4.9 Image-decoder adapter contract, purge-notify].
pub type PurgeNotify = Box<dyn FnMut() + Send>;
