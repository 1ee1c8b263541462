//! `DCTDecode`: illustrative JPEG adapter. Reads just enough of the header
//! to answer `decode_info` (SOF0 marker: precision, height, width,
//! component count) without consuming any output, then passes the
//! compressed bytes through unchanged -- there is no real DCT/entropy
//! decoder here, matching the stated Non-goal. REFERENCE: [4.9
//! Image-decoder adapter contract].

use crate::arena::FilterRef;
use crate::engine::Engine;
use crate::error::FilterError;
use crate::error::FilterResult;
use crate::filter::image::PurgeNotify;
use crate::filter::state::DecodeOutcome;
use crate::filter::DecodeInfo;
use crate::filter::FilterOps;

const SOF0: u8 = 0xC0;
const MARKER_PREFIX: u8 = 0xFF;

pub struct DctState {
    purge_notify: Option<PurgeNotify>,
    info: Option<DecodeInfo>,
}

impl DctState {
    pub fn new(purge_notify: Option<PurgeNotify>) -> Self {
        Self {
            purge_notify,
            info: None,
        }
    }

    /// Scans forward from the current read position for an SOF0 marker,
    /// then pushes every consumed byte back via `unget_byte` so the scan
    /// leaves the stream exactly where it found it. REFERENCE: [4.9 Image-
    /// decoder adapter contract, decode_info: "must not advance any output
    /// position"].
    fn scan_header(&mut self, engine: &mut Engine, underlying: FilterRef) -> FilterResult<DecodeInfo> {
        let mut consumed = Vec::new();
        let mut info = DecodeInfo::default();

        loop {
            let Some(b) = engine.get_byte(underlying)? else {
                break;
            };
            consumed.push(b);
            if b != MARKER_PREFIX {
                continue;
            }
            let Some(marker) = engine.get_byte(underlying)? else {
                break;
            };
            consumed.push(marker);
            if marker != SOF0 {
                continue;
            }
            let mut header = [0u8; 6];
            let n = engine.read(underlying, &mut header)?;
            consumed.extend_from_slice(&header[..n]);
            if n == 6 {
                let height = u16::from_be_bytes([header[1], header[2]]);
                let width = u16::from_be_bytes([header[3], header[4]]);
                info = DecodeInfo {
                    width: Some(width as u32),
                    height: Some(height as u32),
                    components: Some(header[5]),
                };
            }
            break;
        }

        for byte in consumed.into_iter().rev() {
            engine.unget_byte(underlying, byte)?;
        }
        Ok(info)
    }
}

impl FilterOps for DctState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("DCTDecode"))?;
        let n = engine.read(underlying, out)?;
        if n < out.len() {
            Ok(DecodeOutcome::Eof { produced: n })
        } else {
            Ok(DecodeOutcome::Filled { produced: n })
        }
    }

    fn decode_info(&mut self, engine: &mut Engine, this: FilterRef) -> FilterResult<DecodeInfo> {
        if let Some(info) = self.info {
            return Ok(info);
        }
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("DCTDecode"))?;
        let info = self.scan_header(engine, underlying)?;
        self.info = Some(info);
        Ok(info)
    }

    fn dispose(&mut self) {
        if let Some(notify) = self.purge_notify.as_mut() {
            notify();
        }
    }
}
