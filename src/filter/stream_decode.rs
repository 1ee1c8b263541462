//! `StreamDecode`: recognizes the end of a length-delimited stream body,
//! falling back to scanning for an `endstream` sentinel when the declared
//! length is wrong or absent. REFERENCE: [4.4 StreamDecode], grounded on
//! `streamd.c` (`StreamDecodeInternal`, `StreamFillBuff`,
//! `StreamLookForKeyword`).

use crate::arena::FilterRef;
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

/// The four byte sequences `streamd.c` accepts as a stream terminator when
/// the declared `/Length` undershoots or is absent, in the order they are
/// tried. REFERENCE: [4.4 StreamDecode, terminator recognition].
const TERMINATORS: [&[u8]; 4] = [
    b"endstream",
    b"\rendstream",
    b"\nendstream",
    b"\r\nendstream",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    /// Trust the declared length; stop exactly there.
    LengthDelimited { remaining: u64 },
    /// No usable length: scan for one of `TERMINATORS` instead.
    ScanForTerminator,
    /// Source is an external file or already-embedded byte string, read
    /// straight through until that source's own EOF; no terminator
    /// scanning. Grounded on `SDS_STATE_EXTERNAL[_STREAM]` in `streamd.c`.
    External(ExternalSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExternalSource {
    Embedded { bytes: Vec<u8>, pos: usize },
    File { path: String, opened: Option<FilterRef> },
}

pub struct StreamDecodeState {
    mode: Mode,
    /// Bytes matched so far against every still-possible terminator
    /// candidate; flushed to the caller once a read byte breaks all
    /// remaining candidates, or consumed silently once one fully matches.
    scan_buffer: Vec<u8>,
    done: bool,
}

impl StreamDecodeState {
    pub fn construct(
        params: &ParamDict,
        config: &crate::config::EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if let Some(embedded) = params.bytes("StreamDecode", "HqEmbeddedStream")? {
            let mode = Mode::External(ExternalSource::Embedded {
                bytes: embedded.to_vec(),
                pos: 0,
            });
            return Ok(Built {
                kind: FilterKind::StreamDecode(Box::new(StreamDecodeState {
                    mode,
                    scan_buffer: Vec::new(),
                    done: false,
                })),
                direction: Direction::Input,
                extra_flags: Flags::DELIMITS_DATA,
                buffer_size: config.stream_buffer_size,
            });
        }
        if let Some(path) = params.bytes("StreamDecode", "Filename")? {
            let path = String::from_utf8(path.to_vec()).map_err(|_| {
                FilterError::new(
                    "StreamDecode",
                    FilterErrorCode::TypeCheck("Filename is not valid UTF-8".into()),
                )
            })?;
            let mode = Mode::External(ExternalSource::File { path, opened: None });
            return Ok(Built {
                kind: FilterKind::StreamDecode(Box::new(StreamDecodeState {
                    mode,
                    scan_buffer: Vec::new(),
                    done: false,
                })),
                direction: Direction::Input,
                extra_flags: Flags::DELIMITS_DATA,
                buffer_size: config.stream_buffer_size,
            });
        }

        if underlying_direction != Some(Direction::Input) {
            return Err(FilterError::new(
                "StreamDecode",
                FilterErrorCode::InvalidAccess("requires a readable underlying source".into()),
            ));
        }
        let length = params.int("StreamDecode", "Length")?;
        let mode = match length {
            Some(n) if n >= 0 => Mode::LengthDelimited { remaining: n as u64 },
            _ => Mode::ScanForTerminator,
        };
        Ok(Built {
            kind: FilterKind::StreamDecode(Box::new(StreamDecodeState {
                mode,
                scan_buffer: Vec::new(),
                done: false,
            })),
            direction: Direction::Input,
            extra_flags: Flags::DELIMITS_DATA,
            buffer_size: config.stream_buffer_size,
        })
    }

    /// How many of the still-live terminator candidates `scan_buffer` (plus
    /// one prospective next byte) matches, returning `Some(full_match_len)`
    /// the moment a candidate is satisfied in full.
    fn terminator_progress(buffer: &[u8]) -> (bool, Option<usize>) {
        let mut any_prefix = false;
        for term in TERMINATORS {
            if term.len() >= buffer.len() && term[..buffer.len()] == *buffer {
                any_prefix = true;
                if term.len() == buffer.len() {
                    return (true, Some(term.len()));
                }
            }
        }
        (any_prefix, None)
    }

    /// Reads and discards from `underlying` up to and including the first
    /// matched terminator, leaving it positioned just past it. Used once
    /// the declared `Length` body has been fully delivered, so the
    /// underlying ends up correctly positioned even though the terminator
    /// itself is never handed to the consumer. Tolerates a missing
    /// terminator (stops at underlying EOF) rather than erroring.
    /// REFERENCE: [4.4 StreamDecode].
    fn consume_terminator(&mut self, engine: &mut Engine, underlying: FilterRef) -> FilterResult<()> {
        self.scan_buffer.clear();
        loop {
            let Some(byte) = engine.get_byte(underlying)? else {
                self.scan_buffer.clear();
                return Ok(());
            };
            self.scan_buffer.push(byte);
            let (is_prefix, full_match) = Self::terminator_progress(&self.scan_buffer);
            if full_match.is_some() {
                self.scan_buffer.clear();
                return Ok(());
            }
            if !is_prefix {
                self.scan_buffer.remove(0);
            }
        }
    }
}

impl FilterOps for StreamDecodeState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        if self.done {
            return Ok(DecodeOutcome::Eof { produced: 0 });
        }

        if let Mode::External(source) = &mut self.mode {
            return match source {
                ExternalSource::Embedded { bytes, pos } => {
                    let n = (bytes.len() - *pos).min(out.len());
                    out[..n].copy_from_slice(&bytes[*pos..*pos + n]);
                    *pos += n;
                    if *pos == bytes.len() {
                        self.done = true;
                        Ok(DecodeOutcome::Eof { produced: n })
                    } else {
                        Ok(DecodeOutcome::Filled { produced: n })
                    }
                }
                ExternalSource::File { path, opened } => {
                    let file_ref = match opened {
                        Some(r) => *r,
                        None => {
                            let device = crate::device::FileDevice::open_read(path.as_str())
                                .map_err(|_| {
                                    FilterError::new(
                                        "StreamDecode",
                                        FilterErrorCode::Io,
                                    )
                                })?;
                            let r = engine.open_device(
                                Box::new(device),
                                "StreamDecode:external",
                                Direction::Input,
                            )?;
                            *opened = Some(r);
                            r
                        }
                    };
                    let n = engine.read(file_ref, out)?;
                    if n < out.len() {
                        self.done = true;
                        Ok(DecodeOutcome::Eof { produced: n })
                    } else {
                        Ok(DecodeOutcome::Filled { produced: n })
                    }
                }
            };
        }

        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("StreamDecode"))?;

        match self.mode.clone() {
            Mode::External(_) => unreachable!("handled above"),
            Mode::LengthDelimited { remaining } => {
                if remaining == 0 {
                    self.consume_terminator(engine, underlying)?;
                    self.done = true;
                    return Ok(DecodeOutcome::Eof { produced: 0 });
                }
                let want = (remaining as usize).min(out.len());
                let mut produced = 0;
                while produced < want {
                    match engine.get_byte(underlying)? {
                        Some(b) => {
                            out[produced] = b;
                            produced += 1;
                        }
                        None => break,
                    }
                }
                let new_remaining = remaining - produced as u64;
                self.mode = Mode::LengthDelimited {
                    remaining: new_remaining,
                };
                if new_remaining == 0 {
                    // The declared body is fully delivered; consume (but do
                    // not emit) the terminator so the underlying ends up
                    // positioned just past it. REFERENCE: [4.4 StreamDecode].
                    self.consume_terminator(engine, underlying)?;
                    self.done = true;
                    Ok(DecodeOutcome::Eof { produced })
                } else if produced < want {
                    self.done = true;
                    Ok(DecodeOutcome::Eof { produced })
                } else {
                    Ok(DecodeOutcome::Filled { produced })
                }
            }
            Mode::ScanForTerminator => {
                let mut produced = 0;
                while produced < out.len() {
                    let Some(byte) = engine.get_byte(underlying)? else {
                        // Underlying exhausted before any terminator matched;
                        // whatever is left in scan_buffer belongs to the body.
                        let leftover = ::std::mem::take(&mut self.scan_buffer);
                        let n = leftover.len().min(out.len() - produced);
                        out[produced..produced + n].copy_from_slice(&leftover[..n]);
                        produced += n;
                        self.done = true;
                        return Ok(DecodeOutcome::Eof { produced });
                    };
                    self.scan_buffer.push(byte);
                    let (is_prefix, full_match) = Self::terminator_progress(&self.scan_buffer);
                    if full_match.is_some() {
                        self.scan_buffer.clear();
                        self.done = true;
                        return Ok(DecodeOutcome::Eof { produced });
                    }
                    if !is_prefix {
                        // Nothing in scan_buffer can become a terminator any
                        // more: the byte at the front is confirmed body data.
                        let emit = self.scan_buffer.remove(0);
                        out[produced] = emit;
                        produced += 1;
                    }
                }
                Ok(DecodeOutcome::Filled { produced })
            }
        }
    }

    fn get_position(&self) -> Option<u64> {
        None
    }
}
