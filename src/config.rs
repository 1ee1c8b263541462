//! Engine-wide tunables: per-kind buffer sizes, the filter-creation gate, and
//! the acyclic-chain depth bound.

/// Buffer size used for real files on a device. REFERENCE: `FILEBUFFSIZE` in
/// the original `fileio.h`.
pub const FILE_BUFFER_SIZE: usize = 16 * 1024;
/// Buffer size for the obfuscated-font filter. REFERENCE: `OBFONTBUFFSIZE`.
pub const FONT_FILE_BUFFER_SIZE: usize = 1024;
/// Buffer size for `StreamDecode`. REFERENCE: `STREAMBUFFSIZE` in `streamd.c`.
pub const STREAM_BUFFER_SIZE: usize = 1024;
/// Buffer size for `RC4Decode`/`RC4Encode`. REFERENCE: `RC4BUFFSIZE`.
pub const RC4_BUFFER_SIZE: usize = 4096;
/// Buffer size for `AESDecode`/`AESEncode`, kept a multiple of the AES block
/// size. REFERENCE: `AESBUFFSIZE`.
pub const AES_BUFFER_SIZE: usize = 4096;

/// Engine-wide tunables that stand in for the PostScript VM's global state
/// that the filter framework otherwise reads directly (buffer sizes, the
/// rendering-mode gate on filter creation, and the depth at which the
/// acyclic-chain debug assertion gives up rather than looping forever).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub file_buffer_size: usize,
    pub font_file_buffer_size: usize,
    pub stream_buffer_size: usize,
    pub rc4_buffer_size: usize,
    pub aes_buffer_size: usize,
    /// Stands in for querying `is_interpreter`/the rendering execution mode:
    /// when `false`, filter creation fails with `Undefined`.
    /// REFERENCE: [5. CONCURRENCY & RESOURCE MODEL].
    pub creation_allowed: bool,
    /// Upper bound used only by the debug-only acyclic-chain check.
    /// REFERENCE: [3.1 Filter object, invariants].
    pub max_chain_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            file_buffer_size: FILE_BUFFER_SIZE,
            font_file_buffer_size: FONT_FILE_BUFFER_SIZE,
            stream_buffer_size: STREAM_BUFFER_SIZE,
            rc4_buffer_size: RC4_BUFFER_SIZE,
            aes_buffer_size: AES_BUFFER_SIZE,
            creation_allowed: true,
            max_chain_depth: 256,
        }
    }
}
