//! Filter kinds, per-filter core state, and the operation set every kind
//! implements. REFERENCE: [3. CORE ABSTRACTIONS], [4. KEY ALGORITHMS &
//! BEHAVIOURS], [9. DESIGN NOTES] ("sum type of concrete filter kinds, plus
//! a trait providing the operation set" replacing a function-pointer
//! vtable).

pub mod aes;
pub mod base;
pub mod image;
pub mod obfont;
pub mod param;
pub mod rc4;
pub mod rsd;
pub mod state;
pub mod string_filter;
pub mod stream_decode;

use ::std::collections::VecDeque;

use crate::arena::FilterRef;
use crate::device::Device;
use crate::engine::Engine;
use crate::error::FilterResult;
use crate::filter::param::ParamDict;
use crate::filter::state::DecodeOutcome;
use crate::filter::state::DecodeState;
use crate::Generation;

::bitflags::bitflags! {
    /// The filter/base-file status bits. REFERENCE: [3.1 Filter object,
    /// Flags] lists exactly this set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u32 {
        const INPUT               = 1 << 0;
        const OUTPUT              = 1 << 1;
        const OPEN                = 1 << 2;
        const FILTER               = 1 << 3;
        const REAL_FILE            = 1 << 4;
        const BASE_FILE            = 1 << 5;
        const STANDARD             = 1 << 6;
        const LINE_BUFFERED        = 1 << 7;
        const EOF                  = 1 << 8;
        const IO_ERROR             = 1 << 9;
        const TIMEOUT              = 1 << 10;
        const REWINDABLE           = 1 << 11;
        const REUSABLE_STREAM      = 1 << 12;
        const DELIMITS_DATA        = 1 << 13;
        const EXPANDS_DATA         = 1 << 14;
        const CLOSING              = 1 << 15;
        const CLOSE_SOURCE_TARGET  = 1 << 16;
        const PURGE_NOTIFY         = 1 << 17;
        const CTRL_D_TERMINATES    = 1 << 18;
        const GOT_CR               = 1 << 19;
        const SKIP_LF              = 1 << 20;
        const DONE_FILL            = 1 << 21;
    }
}

/// REFERENCE: [3.1 Filter object]: a filter is opened for reading (decode)
/// or writing (encode), never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Per-filter mutable state shared by every kind: the decode/encode
/// bookkeeping, the link to the underlying filter, and the bits the engine
/// itself (rather than the concrete kind) is responsible for maintaining.
/// REFERENCE: [3.1 Filter object], [4.3 Decode state machine].
#[derive(Debug)]
pub struct FilterCore {
    pub name: &'static str,
    pub flags: Flags,
    pub direction: Direction,
    pub buffer_size: usize,
    pub state: DecodeState,
    /// Bytes decoded-ahead and not yet handed to the consumer.
    pub ready: VecDeque<u8>,
    /// The one stashed byte a filter kind reports alongside its final,
    /// EOF-flagged fill. REFERENCE: [9. DESIGN NOTES] ("explicit last_char
    /// field instead of negative-indexed buffer peek slot").
    pub last_char: Option<u8>,
    pub deferred_error: Option<crate::error::FilterError>,
    pub underlying: Option<FilterRef>,
    pub underlying_generation: Generation,
    pub save_level: u32,
    pub param_dict: ParamDict,
    pub bytes_processed: u64,
}

impl FilterCore {
    pub fn is_open(&self) -> bool {
        self.flags.contains(Flags::OPEN)
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }
}

/// A filter kind together with its shared core. REFERENCE: [3.1 Filter
/// object].
pub struct FilterEntry {
    pub core: FilterCore,
    pub kind: FilterKind,
}

/// The sum type standing in for the original vtable dispatch. REFERENCE:
/// [9. DESIGN NOTES].
pub enum FilterKind {
    /// Placeholder installed while a kind's own methods are mid-call (the
    /// value is swapped out of the arena slot and back via `mem::replace`
    /// so the call can recurse into the engine for its underlying filter
    /// without a borrow conflict). Never observed outside that window.
    Taken,
    BaseFile(base::BaseFileState),
    StringDecode(string_filter::StringDecodeState),
    StringEncode(string_filter::StringEncodeState),
    StreamDecode(Box<stream_decode::StreamDecodeState>),
    Rc4(rc4::Rc4State),
    AesDecode(Box<aes::AesDecodeState>),
    AesEncode(Box<aes::AesEncodeState>),
    ObFontDecode(obfont::ObFontState),
    Rsd(Box<rsd::RsdState>),
    DctDecode(Box<image::dct::DctState>),
    PngDecode(Box<image::png::PngState>),
}

/// Metadata the `decode_info` prescan can report without advancing any
/// output. REFERENCE: [4.9 Image-decoder adapter contract, decode_info].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub components: Option<u8>,
}

/// The operation set every filter kind implements. Default methods cover
/// the common "not applicable to this kind" case so that e.g. RC4Decode
/// need not stub out `decode_info`. REFERENCE: [3.1 Filter object,
/// Operations].
pub trait FilterOps {
    /// Decode up to `out.len()` bytes. Implementations that need a
    /// one-byte lookahead to detect EOF precisely (RC4 does not; AES,
    /// StreamDecode and ObFontDecode do) perform it here, reporting it via
    /// `DecodeOutcome::Eof { produced }` with the final byte included in
    /// `produced` so the generic loop can stash it. REFERENCE: [4.3 Decode
    /// state machine].
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome>;

    /// Encode: consume `input` and push encoded bytes to the underlying
    /// filter via `engine.put_byte`/`engine.write`.
    fn encode(&mut self, _engine: &mut Engine, _this: FilterRef, _input: &[u8]) -> FilterResult<()> {
        Err(crate::error::FilterError::new(
            "Filter",
            crate::error::FilterErrorCode::InvalidAccess("not an encode filter".into()),
        ))
    }

    /// Flush any buffered encoded output to the underlying filter.
    /// REFERENCE: [4.2 Filter lifecycle, Close].
    fn flush(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        Ok(())
    }

    /// Release any resources the kind itself owns (crypto state, open
    /// device handles). Called exactly once per close, before the core is
    /// marked closed. REFERENCE: [4.2 Filter lifecycle, Dispose].
    fn dispose(&mut self) {}

    /// Reset decode/encode progress so the filter can be run again from
    /// the start (only meaningful for `Flags::REUSABLE_STREAM` kinds).
    /// REFERENCE: [4.10 Reusable stream decoder].
    fn reset(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        Err(crate::error::FilterError::new(
            "Filter",
            crate::error::FilterErrorCode::InvalidAccess("not resettable".into()),
        ))
    }

    fn get_position(&self) -> Option<u64> {
        None
    }

    fn set_position(&mut self, _engine: &mut Engine, _this: FilterRef, _pos: u64) -> FilterResult<()> {
        Err(crate::error::FilterError::new(
            "Filter",
            crate::error::FilterErrorCode::InvalidAccess("not seekable".into()),
        ))
    }

    /// REFERENCE: [4.9 Image-decoder adapter contract, decode_info]: a
    /// metadata prescan that must not advance any output position.
    fn decode_info(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<DecodeInfo> {
        Ok(DecodeInfo::default())
    }

    /// Called once, after construction but before the filter is linked
    /// into the lists, to do any last validation/initialization that
    /// needed the resolved underlying direction. Most kinds need nothing
    /// beyond what their constructor already did.
    fn on_linked(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        Ok(())
    }
}

impl FilterKind {
    pub fn ops(&mut self) -> &mut dyn FilterOps {
        match self {
            FilterKind::Taken => unreachable!("dispatched while kind was taken out of its slot"),
            FilterKind::BaseFile(s) => s,
            FilterKind::StringDecode(s) => s,
            FilterKind::StringEncode(s) => s,
            FilterKind::StreamDecode(s) => s.as_mut(),
            FilterKind::Rc4(s) => s,
            FilterKind::AesDecode(s) => s.as_mut(),
            FilterKind::AesEncode(s) => s.as_mut(),
            FilterKind::ObFontDecode(s) => s,
            FilterKind::Rsd(s) => s.as_mut(),
            FilterKind::DctDecode(s) => s.as_mut(),
            FilterKind::PngDecode(s) => s.as_mut(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::Taken => "Taken",
            FilterKind::BaseFile(_) => "BaseFile",
            FilterKind::StringDecode(_) => "StringDecode",
            FilterKind::StringEncode(_) => "StringEncode",
            FilterKind::StreamDecode(_) => "StreamDecode",
            FilterKind::Rc4(_) => "RC4",
            FilterKind::AesDecode(_) => "AESDecode",
            FilterKind::AesEncode(_) => "AESEncode",
            FilterKind::ObFontDecode(_) => "ObFontDecode",
            FilterKind::Rsd(_) => "ReusableStreamDecode",
            FilterKind::DctDecode(_) => "DCTDecode",
            FilterKind::PngDecode(_) => "PNGDecode",
        }
    }
}

/// What a filter constructor hands back to `Engine::open` once it has
/// validated its parameters. REFERENCE: [4.2 Filter lifecycle, Creation].
pub struct Built {
    pub kind: FilterKind,
    pub direction: Direction,
    pub extra_flags: Flags,
    pub buffer_size: usize,
}

/// A named, registered filter constructor. REFERENCE: [6.2 Registry API,
/// filter_standard_add / filter_standard_find].
#[derive(Clone, Copy)]
pub struct Template {
    pub name: &'static str,
    pub constructor: fn(
        params: &ParamDict,
        config: &crate::config::EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built>,
}

pub(crate) fn base_file_entry(
    device: Box<dyn Device>,
    name: &'static str,
    direction: Direction,
    buffer_size: usize,
    save_level: u32,
) -> FilterEntry {
    let flags = Flags::BASE_FILE
        | Flags::REAL_FILE
        | Flags::OPEN
        | if direction == Direction::Input {
            Flags::INPUT
        } else {
            Flags::OUTPUT
        };
    FilterEntry {
        core: FilterCore {
            name,
            flags,
            direction,
            buffer_size,
            state: DecodeState::Init,
            ready: VecDeque::new(),
            last_char: None,
            deferred_error: None,
            underlying: None,
            underlying_generation: 0,
            save_level,
            param_dict: ParamDict::new(),
            bytes_processed: 0,
        },
        kind: FilterKind::BaseFile(base::BaseFileState::open(device)),
    }
}
