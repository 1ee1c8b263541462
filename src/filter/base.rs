//! Base files: the bottom of every chain, wrapping a `Device`. REFERENCE:
//! [3.4 Base-file sentinel], grounded on the `FILELIST` "real file" cases
//! in `fileio/export/fileio.h`.

use crate::arena::FilterRef;
use crate::device::Device;
use crate::engine::Engine;
use crate::error::FilterError;
use crate::error::FilterResult;
use crate::filter::state::DecodeOutcome;
use crate::filter::FilterOps;

pub struct BaseFileState {
    device: Option<Box<dyn Device>>,
}

impl BaseFileState {
    pub fn open(device: Box<dyn Device>) -> Self {
        Self {
            device: Some(device),
        }
    }

    pub fn closed() -> Self {
        Self { device: None }
    }
}

impl FilterOps for BaseFileState {
    fn decode(
        &mut self,
        _engine: &mut Engine,
        _this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| FilterError::io("BaseFile"))?;
        let produced = device.read(out).map_err(|_| FilterError::io("BaseFile"))?;
        if produced == 0 {
            Ok(DecodeOutcome::Eof { produced: 0 })
        } else if produced < out.len() {
            // Confirm EOF now so the final byte can be stashed per the
            // close-on-last-character contract instead of requiring one
            // extra round trip from the caller.
            let mut probe = [0u8; 1];
            let more = device.read(&mut probe).map_err(|_| FilterError::io("BaseFile"))?;
            if more == 0 {
                Ok(DecodeOutcome::Eof { produced })
            } else {
                // Unread the probe byte by shifting it back in; devices in
                // this crate are either in-memory or real files, both of
                // which support seeking one byte back.
                device
                    .seek(device.position().map_err(|_| FilterError::io("BaseFile"))? - 1)
                    .map_err(|_| FilterError::io("BaseFile"))?;
                Ok(DecodeOutcome::Filled { produced })
            }
        } else {
            Ok(DecodeOutcome::Filled { produced })
        }
    }

    fn encode(&mut self, _engine: &mut Engine, _this: FilterRef, input: &[u8]) -> FilterResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| FilterError::io("BaseFile"))?;
        device
            .write(input)
            .map_err(|_| FilterError::io("BaseFile"))?;
        Ok(())
    }

    fn flush(&mut self, _engine: &mut Engine, _this: FilterRef) -> FilterResult<()> {
        if let Some(device) = self.device.as_mut() {
            device.flush().map_err(|_| FilterError::io("BaseFile"))?;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        self.device = None;
    }

    fn get_position(&self) -> Option<u64> {
        None
    }

    fn set_position(&mut self, _engine: &mut Engine, _this: FilterRef, pos: u64) -> FilterResult<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| FilterError::io("BaseFile"))?;
        device.seek(pos).map_err(|_| FilterError::io("BaseFile"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDevice;
    use crate::Engine;

    #[test]
    fn reads_until_exhausted() {
        let mut engine = Engine::new(Default::default());
        let r = engine
            .open_device(Box::new(MemoryDevice::new(b"abc".to_vec())), "mem", crate::filter::Direction::Input)
            .unwrap();
        assert_eq!(engine.get_byte(r).unwrap(), Some(b'a'));
        assert_eq!(engine.get_byte(r).unwrap(), Some(b'b'));
        assert_eq!(engine.get_byte(r).unwrap(), Some(b'c'));
        assert_eq!(engine.get_byte(r).unwrap(), None);
    }
}
