//! `PNGDecode`: illustrative PNG adapter. Reads the signature and `IHDR`
//! chunk to answer `decode_info`, then passes the remaining bytes through
//! unchanged -- there is no real inflate/unfilter pipeline here, matching
//! the stated Non-goal. REFERENCE: [4.9 Image-decoder adapter contract].

use crate::arena::FilterRef;
use crate::engine::Engine;
use crate::error::FilterError;
use crate::error::FilterErrorCode;
use crate::error::FilterResult;
use crate::filter::image::PurgeNotify;
use crate::filter::state::DecodeOutcome;
use crate::filter::DecodeInfo;
use crate::filter::FilterOps;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub struct PngState {
    purge_notify: Option<PurgeNotify>,
    info: Option<DecodeInfo>,
}

impl PngState {
    pub fn new(purge_notify: Option<PurgeNotify>) -> Self {
        Self {
            purge_notify,
            info: None,
        }
    }

    fn scan_header(&mut self, engine: &mut Engine, underlying: FilterRef) -> FilterResult<DecodeInfo> {
        let mut consumed = Vec::new();
        let mut sig = [0u8; 8];
        let n = engine.read(underlying, &mut sig)?;
        consumed.extend_from_slice(&sig[..n]);
        if n != 8 || sig != SIGNATURE {
            for byte in consumed.into_iter().rev() {
                engine.unget_byte(underlying, byte)?;
            }
            return Err(FilterError::new(
                "PNGDecode",
                FilterErrorCode::TypeCheck("missing PNG signature".into()),
            ));
        }

        let mut chunk_header = [0u8; 8]; // length(4) + "IHDR"(4)
        let n = engine.read(underlying, &mut chunk_header)?;
        consumed.extend_from_slice(&chunk_header[..n]);

        let mut info = DecodeInfo::default();
        if n == 8 && &chunk_header[4..8] == b"IHDR" {
            let mut body = [0u8; 8]; // width(4) + height(4)
            let n = engine.read(underlying, &mut body)?;
            consumed.extend_from_slice(&body[..n]);
            if n == 8 {
                let width = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let height = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                info = DecodeInfo {
                    width: Some(width),
                    height: Some(height),
                    components: None,
                };
            }
        }

        for byte in consumed.into_iter().rev() {
            engine.unget_byte(underlying, byte)?;
        }
        Ok(info)
    }
}

impl FilterOps for PngState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("PNGDecode"))?;
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
            .ok_or_else(|| FilterError::io("PNGDecode"))?;
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
