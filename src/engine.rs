//! The engine: the registry, the arena, save-level bookkeeping, and the
//! consumer-facing operations every filter is driven through. REFERENCE:
//! [6.1 Consumer API], [6.2 Registry API], [4.2 Filter lifecycle],
//! [4.3 Decode state machine].

use ::std::collections::HashMap;

use crate::arena::Arena;
use crate::arena::FilterRef;
use crate::config::EngineConfig;
use crate::device::Device;
use crate::error::FilterError;
use crate::error::FilterErrorCode;
use crate::error::FilterResult;
use crate::filter::aes;
use crate::filter::base_file_entry;
use crate::filter::obfont;
use crate::filter::param::ParamDict;
use crate::filter::rc4;
use crate::filter::rsd;
use crate::filter::state::DecodeOutcome;
use crate::filter::state::DecodeState;
use crate::filter::stream_decode;
use crate::filter::string_filter::StringDecodeState;
use crate::filter::string_filter::StringEncodeState;
use crate::filter::Built;
use crate::filter::Direction;
use crate::filter::DecodeInfo;
use crate::filter::FilterCore;
use crate::filter::FilterEntry;
use crate::filter::FilterKind;
use crate::filter::Flags;
use crate::filter::Template;

/// Why a filter was closed. REFERENCE: [3.1 Filter object],
/// [GLOSSARY: Close reason].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The consumer called `Engine::close` directly.
    Explicit,
    /// The filter's own decode reached end of data and the consumer asked
    /// for an auto-close on exhaustion.
    Implicit,
    /// A `restore` cascaded this close because the filter was created at a
    /// save level being discarded.
    Forced,
}

/// Where a newly created filter reads from or writes to. REFERENCE:
/// [4.2 Filter lifecycle, Creation, underlying source/target binding].
pub enum Source {
    /// Deferred: no underlying filter yet (only the base-file and
    /// already-pointed-at-a-filter cases are common; this is for filters
    /// that can have their source attached later).
    None,
    Filter(FilterRef),
    Bytes(Vec<u8>),
}

pub struct Engine {
    arena: Arena,
    registry: HashMap<&'static str, Template>,
    config: EngineConfig,
    save_level: u32,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut engine = Self {
            arena: Arena::new(),
            registry: HashMap::new(),
            config,
            save_level: 0,
        };
        engine.register_standard_filters();
        engine
    }

    fn register_standard_filters(&mut self) {
        self.registry.insert(
            "StreamDecode",
            Template {
                name: "StreamDecode",
                constructor: stream_decode::StreamDecodeState::construct,
            },
        );
        self.registry.insert(
            "RC4Decode",
            Template {
                name: "RC4Decode",
                constructor: rc4::Rc4State::construct_decode,
            },
        );
        self.registry.insert(
            "RC4Encode",
            Template {
                name: "RC4Encode",
                constructor: rc4::Rc4State::construct_encode,
            },
        );
        self.registry.insert(
            "AESDecode",
            Template {
                name: "AESDecode",
                constructor: aes::AesDecodeState::construct,
            },
        );
        self.registry.insert(
            "AESEncode",
            Template {
                name: "AESEncode",
                constructor: aes::AesEncodeState::construct,
            },
        );
        self.registry.insert(
            "ObFontDecode",
            Template {
                name: "ObFontDecode",
                constructor: obfont::ObFontState::construct,
            },
        );
        self.registry.insert(
            "ReusableStreamDecode",
            Template {
                name: "ReusableStreamDecode",
                constructor: rsd::RsdState::construct,
            },
        );
    }

    /// Returns the save level to later pass to `restore` to undo everything
    /// created from this point on. REFERENCE: [5. CONCURRENCY & RESOURCE
    /// MODEL, Save/restore interaction].
    pub fn save(&mut self) -> u32 {
        let mark = self.save_level;
        self.save_level += 1;
        mark
    }

    /// Force-closes every live filter with `save_level > level`, in list
    /// order (overlying before underlying, per the §3.3 list invariant --
    /// this already achieves what the source describes as closing
    /// "overlying filters before the underlying ones" during restore; see
    /// DESIGN.md). REFERENCE: [5. CONCURRENCY & RESOURCE MODEL,
    /// Save/restore interaction].
    pub fn restore(&mut self, level: u32) -> FilterResult<()> {
        for r in self.arena.live_in_list_order() {
            if self.core(r).save_level > level {
                self.close(r, CloseReason::Forced)?;
            }
        }
        self.save_level = level;
        Ok(())
    }

    fn find_template(&self, name: &str) -> FilterResult<Template> {
        self.registry.get(name).copied().ok_or_else(|| {
            FilterError::new(
                "Engine",
                FilterErrorCode::UndefinedFilterName(name.to_string()),
            )
        })
    }

    /// REFERENCE: [6.2 Registry API, filter_standard_add]. Exposed so the
    /// image-decoder adapters (constructed directly by their consumer
    /// rather than looked up by name, since they are illustrative
    /// plug-ins) can still be opened through the same lifecycle path.
    pub fn open_image_decoder(
        &mut self,
        kind: FilterKind,
        buffer_size: usize,
        source: Source,
        local: bool,
    ) -> FilterResult<FilterRef> {
        self.open_built(
            Built {
                kind,
                direction: Direction::Input,
                extra_flags: Flags::DELIMITS_DATA,
                buffer_size,
            },
            source,
            local,
        )
    }

    pub fn open(
        &mut self,
        name: &str,
        params: ParamDict,
        source: Source,
        local: bool,
    ) -> FilterResult<FilterRef> {
        if !self.config.creation_allowed {
            return Err(FilterError::new(
                "Engine",
                FilterErrorCode::Undefined("filter creation is disabled".into()),
            ));
        }
        let template = self.find_template(name)?;
        let underlying_direction = self.peek_source_direction(&source, local)?;
        let built = (template.constructor)(&params, &self.config, underlying_direction)?;
        self.open_built_with_params(built, source, local, params)
    }

    fn peek_source_direction(&mut self, source: &Source, local: bool) -> FilterResult<Option<Direction>> {
        // Resolving a Bytes source always yields an Input underlying; a
        // Filter source's direction is read directly; None has no
        // underlying yet.
        match source {
            Source::None => Ok(None),
            Source::Bytes(_) => Ok(Some(Direction::Input)),
            Source::Filter(r) => {
                self.ensure_live(*r)?;
                let _ = local;
                Ok(Some(self.core(*r).direction))
            }
        }
    }

    fn open_built(&mut self, built: Built, source: Source, local: bool) -> FilterResult<FilterRef> {
        self.open_built_with_params(built, source, local, ParamDict::new())
    }

    fn open_built_with_params(
        &mut self,
        built: Built,
        source: Source,
        local: bool,
        params: ParamDict,
    ) -> FilterResult<FilterRef> {
        let mut implicit_string_underlying = false;
        let underlying = match source {
            Source::None => None,
            Source::Filter(r) => {
                self.ensure_live(r)?;
                Some(r)
            }
            Source::Bytes(bytes) => {
                implicit_string_underlying = true;
                Some(self.open_bytes(bytes, local)?)
            }
        };
        debug_assert!(
            self.chain_depth(underlying) < self.config.max_chain_depth,
            "filter chain exceeds max_chain_depth ({}); a filter's underlying \
             must always terminate in a base filter within this many links",
            self.config.max_chain_depth,
        );
        let underlying_generation = underlying.map(|r| r.generation).unwrap_or(0);

        let direction_flag = if built.direction == Direction::Input {
            Flags::INPUT
        } else {
            Flags::OUTPUT
        };
        let cascade_flag = if implicit_string_underlying {
            Flags::CLOSE_SOURCE_TARGET
        } else {
            Flags::empty()
        };
        let core = FilterCore {
            name: "Filter",
            flags: Flags::FILTER | Flags::OPEN | direction_flag | built.extra_flags | cascade_flag,
            direction: built.direction,
            buffer_size: built.buffer_size.max(1),
            state: DecodeState::Init,
            ready: Default::default(),
            last_char: None,
            deferred_error: None,
            underlying,
            underlying_generation,
            save_level: self.save_level,
            param_dict: params,
            bytes_processed: 0,
        };
        let entry = FilterEntry {
            core,
            kind: built.kind,
        };
        let r = self.insert(entry, local);
        let mut kind = self.take_kind(r);
        let result = kind.ops().on_linked(self, r);
        self.put_kind(r, kind);
        result?;
        Ok(r)
    }

    fn insert(&mut self, entry: FilterEntry, local: bool) -> FilterRef {
        if let Some(index) = self.arena.find_reusable(local) {
            self.arena.reuse(index, local, entry)
        } else {
            self.arena.alloc(local, entry)
        }
    }

    /// Opens an implicit string-filter source/target over `bytes`.
    /// REFERENCE: [4.5 String filter], [4.2 Filter lifecycle, Creation].
    pub fn open_bytes(&mut self, bytes: Vec<u8>, local: bool) -> FilterResult<FilterRef> {
        let entry = FilterEntry {
            core: FilterCore {
                name: "StringDecode",
                flags: Flags::FILTER | Flags::OPEN | Flags::INPUT,
                direction: Direction::Input,
                buffer_size: bytes.len().max(1),
                state: DecodeState::Init,
                ready: Default::default(),
                last_char: None,
                deferred_error: None,
                underlying: None,
                underlying_generation: 0,
                save_level: self.save_level,
                param_dict: ParamDict::new(),
                bytes_processed: 0,
            },
            kind: FilterKind::StringDecode(StringDecodeState::new(bytes)),
        };
        Ok(self.insert(entry, local))
    }

    /// Opens a fresh string-encode target. REFERENCE: [4.5 String filter].
    pub fn open_string_target(&mut self, local: bool) -> FilterResult<FilterRef> {
        let entry = FilterEntry {
            core: FilterCore {
                name: "StringEncode",
                flags: Flags::FILTER | Flags::OPEN | Flags::OUTPUT,
                direction: Direction::Output,
                buffer_size: 64,
                state: DecodeState::Init,
                ready: Default::default(),
                last_char: None,
                deferred_error: None,
                underlying: None,
                underlying_generation: 0,
                save_level: self.save_level,
                param_dict: ParamDict::new(),
                bytes_processed: 0,
            },
            kind: FilterKind::StringEncode(StringEncodeState::new()),
        };
        Ok(self.insert(entry, local))
    }

    pub fn open_device(
        &mut self,
        device: Box<dyn Device>,
        name: &'static str,
        direction: Direction,
    ) -> FilterResult<FilterRef> {
        let entry = base_file_entry(
            device,
            name,
            direction,
            self.config.file_buffer_size,
            self.save_level,
        );
        Ok(self.insert(entry, false))
    }

    #[cfg(test)]
    pub(crate) fn install_for_tests(&mut self, built: Built, underlying: Option<FilterRef>) -> FilterRef {
        let source = match underlying {
            Some(r) => Source::Filter(r),
            None => Source::None,
        };
        self.open_built(built, source, false).expect("test install")
    }

    /// Counts links from `start` down to the base of the chain, stopping
    /// early once `max_chain_depth` is exceeded (the walk only backs a debug
    /// assertion, not a real traversal limit). REFERENCE: [3.1 Filter
    /// object, invariants].
    fn chain_depth(&self, start: Option<FilterRef>) -> usize {
        let mut depth = 0;
        let mut current = start;
        while let Some(r) = current {
            depth += 1;
            if depth > self.config.max_chain_depth {
                break;
            }
            current = self.core(r).underlying;
        }
        depth
    }

    pub(crate) fn core(&self, r: FilterRef) -> &FilterCore {
        &self.arena.entry(r.index).core
    }

    pub(crate) fn core_mut(&mut self, r: FilterRef) -> &mut FilterCore {
        &mut self.arena.entry_mut(r.index).core
    }

    pub fn is_live(&self, r: FilterRef) -> bool {
        self.arena.is_live(r)
    }

    fn ensure_live(&self, r: FilterRef) -> FilterResult<()> {
        if self.arena.is_live(r) {
            Ok(())
        } else {
            Err(FilterError::new(
                "Engine",
                FilterErrorCode::InvalidAccess("stale filter reference".into()),
            ))
        }
    }

    /// Weaker than `ensure_live`: accepts a reference whose slot has been
    /// closed (by the close-on-last-character-read transition) as long as
    /// the generation still matches, i.e. the slot has not been recycled by
    /// a later creation call. `get_byte`/`unget_byte` use this so EOF
    /// idempotence and unget-across-the-EOF-boundary keep working on a
    /// reference that `get_byte` itself already closed.
    fn ensure_addressable(&self, r: FilterRef) -> FilterResult<()> {
        match self.arena.slot(r) {
            Some(slot) if slot.generation == r.generation => Ok(()),
            _ => Err(FilterError::new(
                "Engine",
                FilterErrorCode::InvalidAccess("stale filter reference".into()),
            )),
        }
    }

    fn take_kind(&mut self, r: FilterRef) -> FilterKind {
        ::std::mem::replace(&mut self.arena.entry_mut(r.index).kind, FilterKind::Taken)
    }

    fn put_kind(&mut self, r: FilterRef, kind: FilterKind) {
        self.arena.entry_mut(r.index).kind = kind;
    }

    fn fill(&mut self, r: FilterRef) -> FilterResult<()> {
        let buffer_size = self.core(r).buffer_size;
        let mut tmp = vec![0u8; buffer_size];
        let mut kind = self.take_kind(r);
        let outcome = kind.ops().decode(self, r, &mut tmp);
        self.put_kind(r, kind);

        match outcome {
            Err(e) => {
                let core = self.core_mut(r);
                core.state = DecodeState::Err;
                core.deferred_error = Some(e.clone());
                Err(e)
            }
            Ok(DecodeOutcome::Filled { produced }) => {
                let core = self.core_mut(r);
                core.ready.extend(tmp[..produced].iter().copied());
                core.bytes_processed += produced as u64;
                core.state = DecodeState::Empty;
                Ok(())
            }
            Ok(DecodeOutcome::Eof { produced }) => {
                let core = self.core_mut(r);
                core.bytes_processed += produced as u64;
                if produced == 0 {
                    core.state = DecodeState::Eof;
                } else {
                    core.ready.extend(tmp[..produced - 1].iter().copied());
                    core.last_char = Some(tmp[produced - 1]);
                    core.state = DecodeState::LastChar;
                }
                Ok(())
            }
        }
    }

    /// Reads a single byte, or `None` at end of data. REFERENCE:
    /// [6.1 Consumer API, get_byte], [4.3 Decode state machine].
    pub fn get_byte(&mut self, r: FilterRef) -> FilterResult<Option<u8>> {
        self.ensure_addressable(r)?;
        loop {
            let core = self.core(r);
            if let Some(err) = core.deferred_error.clone() {
                return Err(err);
            }
            if !core.ready.is_empty() {
                return Ok(self.core_mut(r).ready.pop_front());
            }
            match core.state {
                DecodeState::Eof => {
                    return Ok(None);
                }
                DecodeState::LastChar => {
                    let b = self.core_mut(r).last_char.take();
                    self.core_mut(r).state = DecodeState::Eof;
                    self.close(r, CloseReason::Implicit)?;
                    return Ok(b);
                }
                DecodeState::Init | DecodeState::Empty => {
                    // A filter closed before reaching EOF on its own (explicit
                    // close, or restore's forced close) has nothing left to
                    // fill from.
                    if !core.is_open() {
                        return Err(FilterError::new(
                            "Engine",
                            FilterErrorCode::InvalidAccess("stale filter reference".into()),
                        ));
                    }
                    self.fill(r)?;
                }
                DecodeState::Err => unreachable!("handled by deferred_error check above"),
            }
        }
    }

    /// Pushes a previously read byte back so the next `get_byte` returns it
    /// again. REFERENCE: [6.1 Consumer API, unget_byte].
    pub fn unget_byte(&mut self, r: FilterRef, byte: u8) -> FilterResult<()> {
        self.ensure_addressable(r)?;
        self.core_mut(r).ready.push_front(byte);
        Ok(())
    }

    /// Reads up to `out.len()` bytes, returning the number actually read
    /// (0 means EOF). REFERENCE: [6.1 Consumer API, read].
    pub fn read(&mut self, r: FilterRef, out: &mut [u8]) -> FilterResult<usize> {
        let mut n = 0;
        while n < out.len() {
            match self.get_byte(r)? {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    pub fn read_all(&mut self, r: FilterRef) -> FilterResult<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(b) = self.get_byte(r)? {
            out.push(b);
        }
        Ok(out)
    }

    /// Discards up to `n` bytes, returning the number actually skipped.
    /// REFERENCE: [6.1 Consumer API, skip].
    pub fn skip(&mut self, r: FilterRef, n: u64) -> FilterResult<u64> {
        let mut skipped = 0;
        while skipped < n {
            if self.get_byte(r)?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    pub fn put_byte(&mut self, r: FilterRef, byte: u8) -> FilterResult<()> {
        self.write(r, &[byte])
    }

    /// REFERENCE: [6.1 Consumer API, write].
    pub fn write(&mut self, r: FilterRef, buf: &[u8]) -> FilterResult<()> {
        self.ensure_live(r)?;
        let mut kind = self.take_kind(r);
        let result = kind.ops().encode(self, r, buf);
        self.put_kind(r, kind);
        result?;
        let core = self.core_mut(r);
        core.bytes_processed += buf.len() as u64;
        Ok(())
    }

    /// For an input filter: reads and discards everything up to EOF, then
    /// closes it -- the generic `FilterFlushFile` behaviour. For an output
    /// filter: delegates to the kind's own `flush` (encoders pad/finalize
    /// their last block there). Grounded on `FilterReset`/`FilterFlushFile`
    /// in `filtops.c`.
    pub fn flush(&mut self, r: FilterRef) -> FilterResult<()> {
        self.ensure_live(r)?;
        if self.core(r).is_input() {
            while self.get_byte(r)?.is_some() {}
            return self.close(r, CloseReason::Implicit);
        }
        let mut kind = self.take_kind(r);
        let result = kind.ops().flush(self, r);
        self.put_kind(r, kind);
        result
    }

    /// Surfaces a filter's deferred error exactly once, disposing it as a
    /// side effect if still open. Returns `None` once already surfaced or
    /// for a stale reference, since there is nothing left to report.
    /// REFERENCE: [7. ERROR HANDLING DESIGN].
    pub fn last_error(&mut self, r: FilterRef) -> Option<FilterError> {
        if !self.arena.is_live(r) {
            return None;
        }
        let err = self.core_mut(r).deferred_error.take();
        if err.is_some() {
            let _ = self.close(r, CloseReason::Implicit);
        }
        err
    }

    pub fn reset(&mut self, r: FilterRef) -> FilterResult<()> {
        self.ensure_live(r)?;
        let mut kind = self.take_kind(r);
        let result = kind.ops().reset(self, r);
        self.put_kind(r, kind);
        result?;
        let core = self.core_mut(r);
        core.ready.clear();
        core.last_char = None;
        core.deferred_error = None;
        core.state = DecodeState::Init;
        Ok(())
    }

    pub fn get_position(&mut self, r: FilterRef) -> FilterResult<Option<u64>> {
        self.ensure_live(r)?;
        let mut kind = self.take_kind(r);
        let pos = kind.ops().get_position();
        self.put_kind(r, kind);
        Ok(pos)
    }

    pub fn set_position(&mut self, r: FilterRef, pos: u64) -> FilterResult<()> {
        self.ensure_live(r)?;
        let mut kind = self.take_kind(r);
        let result = kind.ops().set_position(self, r, pos);
        self.put_kind(r, kind);
        result?;
        let core = self.core_mut(r);
        core.ready.clear();
        core.last_char = None;
        core.state = DecodeState::Init;
        Ok(())
    }

    /// REFERENCE: [4.9 Image-decoder adapter contract, decode_info].
    pub fn decode_info(&mut self, r: FilterRef) -> FilterResult<DecodeInfo> {
        self.ensure_live(r)?;
        let mut kind = self.take_kind(r);
        let result = kind.ops().decode_info(self, r);
        self.put_kind(r, kind);
        result
    }

    /// REFERENCE: [4.2 Filter lifecycle, Close]: disposes the kind's own
    /// resources, cascades to the underlying filter if
    /// `Flags::CLOSE_SOURCE_TARGET` is set, then clears `OPEN` so the slot
    /// becomes recyclable. The slot itself is never removed from the
    /// arena.
    pub fn close(&mut self, r: FilterRef, reason: CloseReason) -> FilterResult<()> {
        if !self.arena.is_live(r) {
            return Ok(());
        }
        let _ = reason;
        let cascade = self.core(r).flags.contains(Flags::CLOSE_SOURCE_TARGET);
        let underlying = self.core(r).underlying;

        let mut kind = self.take_kind(r);
        kind.ops().dispose();
        self.put_kind(r, kind);

        let core = self.core_mut(r);
        core.flags.remove(Flags::OPEN);
        core.ready.clear();
        core.last_char = None;

        if cascade {
            if let Some(u) = underlying {
                self.close(u, reason)?;
            }
        }
        Ok(())
    }
}
