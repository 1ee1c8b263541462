mod arena;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod filter;
mod fmt;

pub use self::arena::FilterRef;
pub use self::config::EngineConfig;
pub use self::engine::CloseReason;
pub use self::engine::Engine;
pub use self::error::FilterError;
pub use self::error::FilterErrorCode;
pub use self::error::FilterResult;
pub use self::filter::param::ParamDict;
pub use self::filter::param::ParamValue;

/// Renders the first `limit` bytes of `bytes` for diagnostics: printable
/// ASCII and whitespace pass through, everything else becomes a `\xHH`
/// escape. REFERENCE: [7. ERROR HANDLING DESIGN] (byte-level diagnostics).
pub fn debug_bytes_preview(bytes: &[u8], limit: usize) -> String {
    let truncated = bytes.len() > limit;
    let mut rendered = self::fmt::debug_bytes(&bytes[..bytes.len().min(limit)]);
    if truncated {
        rendered.push_str("...");
    }
    rendered
}

/// A single stream byte. REFERENCE: [4.7 byte].
pub(crate) type Byte = u8;

/// Generation counter attached to every arena slot.
/// REFERENCE: [3.2 Filter id / generation counter].
pub(crate) type Generation = u16;

#[cfg(test)]
mod tests {
    #[macro_export]
    macro_rules! assert_err_eq {
        ($result:expr, $expected_error:expr) => {
            assert_eq!($result, Err($expected_error.into()));
        };
    }
}
