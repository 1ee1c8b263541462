//! AESDecode/AESEncode: AES-CBC with a leading IV and PKCS#7 padding.
//! REFERENCE: [4.7 AES filter], grounded on `aes.c` (`aesFilterInit`,
//! `aesDecodeBuffer`): IV capture from the first block, a one-block
//! lookahead to detect the final block before stripping padding, and a
//! residual byte carry across fills when the underlying source hands back
//! fewer than 16 bytes at a time.

use ::aes::Aes128;
use ::aes::Aes192;
use ::aes::Aes256;
use ::cbc::Decryptor;
use ::cbc::Encryptor;
use ::cipher::block_padding::Pkcs7;
use ::cipher::BlockDecryptMut;
use ::cipher::BlockEncryptMut;
use ::cipher::KeyIvInit;

use crate::arena::FilterRef;
use crate::config::EngineConfig;
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

const BLOCK_SIZE: usize = 16;

enum CbcDecryptor {
    Aes128(Decryptor<Aes128>),
    Aes192(Decryptor<Aes192>),
    Aes256(Decryptor<Aes256>),
}

impl CbcDecryptor {
    fn new(key: &[u8], iv: &[u8; BLOCK_SIZE]) -> FilterResult<Self> {
        match key.len() {
            16 => Ok(Self::Aes128(Decryptor::<Aes128>::new(key.into(), iv.into()))),
            24 => Ok(Self::Aes192(Decryptor::<Aes192>::new(key.into(), iv.into()))),
            32 => Ok(Self::Aes256(Decryptor::<Aes256>::new(key.into(), iv.into()))),
            n => Err(FilterError::new(
                "AESDecode",
                FilterErrorCode::RangeCheck(format!("key must be 16, 24, or 32 bytes, got {n}")),
            )),
        }
    }

    fn decrypt_block(&mut self, block: &mut [u8; BLOCK_SIZE]) {
        match self {
            Self::Aes128(d) => d.decrypt_block_mut(block.into()),
            Self::Aes192(d) => d.decrypt_block_mut(block.into()),
            Self::Aes256(d) => d.decrypt_block_mut(block.into()),
        }
    }

    fn decrypt_final(&mut self, block: [u8; BLOCK_SIZE]) -> FilterResult<Vec<u8>> {
        let mut buf = block;
        let plain = match self {
            Self::Aes128(d) => d
                .decrypt_padded_mut::<Pkcs7>(&mut buf)
                .map_err(|_| FilterError::new("AESDecode", FilterErrorCode::RangeCheck("bad padding".into())))?,
            Self::Aes192(d) => d
                .decrypt_padded_mut::<Pkcs7>(&mut buf)
                .map_err(|_| FilterError::new("AESDecode", FilterErrorCode::RangeCheck("bad padding".into())))?,
            Self::Aes256(d) => d
                .decrypt_padded_mut::<Pkcs7>(&mut buf)
                .map_err(|_| FilterError::new("AESDecode", FilterErrorCode::RangeCheck("bad padding".into())))?,
        };
        Ok(plain.to_vec())
    }
}

pub struct AesDecodeState {
    key: Vec<u8>,
    cipher: Option<CbcDecryptor>,
    held: Option<[u8; BLOCK_SIZE]>,
    carry: Vec<u8>,
}

impl AesDecodeState {
    pub fn construct(
        params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Input) {
            return Err(FilterError::new(
                "AESDecode",
                FilterErrorCode::InvalidAccess("requires a readable underlying source".into()),
            ));
        }
        let key = params.require_bytes("AESDecode", "Key")?.to_vec();
        Ok(Built {
            kind: FilterKind::AesDecode(Box::new(AesDecodeState {
                key,
                cipher: None,
                held: None,
                carry: Vec::new(),
            })),
            direction: Direction::Input,
            extra_flags: Flags::empty(),
            buffer_size: config.aes_buffer_size,
        })
    }

    fn read_block(&mut self, engine: &mut Engine, underlying: FilterRef) -> FilterResult<Option<[u8; BLOCK_SIZE]>> {
        while self.carry.len() < BLOCK_SIZE {
            match engine.get_byte(underlying)? {
                Some(b) => self.carry.push(b),
                None => {
                    if self.carry.is_empty() {
                        return Ok(None);
                    }
                    return Err(FilterError::new(
                        "AESDecode",
                        FilterErrorCode::RangeCheck("truncated ciphertext".into()),
                    ));
                }
            }
        }
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&self.carry[..BLOCK_SIZE]);
        self.carry.drain(..BLOCK_SIZE);
        Ok(Some(block))
    }
}

impl FilterOps for AesDecodeState {
    fn decode(
        &mut self,
        engine: &mut Engine,
        this: FilterRef,
        out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("AESDecode"))?;

        if self.cipher.is_none() {
            let mut iv = [0u8; BLOCK_SIZE];
            let n = engine.read(underlying, &mut iv)?;
            if n < BLOCK_SIZE {
                return Err(FilterError::new(
                    "AESDecode",
                    FilterErrorCode::RangeCheck("truncated IV".into()),
                ));
            }
            self.cipher = Some(CbcDecryptor::new(&self.key, &iv)?);
            self.held = self.read_block(engine, underlying)?;
            if self.held.is_none() {
                return Ok(DecodeOutcome::Eof { produced: 0 });
            }
        }

        let mut produced = 0;
        loop {
            if produced + BLOCK_SIZE > out.len() {
                return Ok(DecodeOutcome::Filled { produced });
            }
            let Some(current) = self.held else {
                return Ok(DecodeOutcome::Eof { produced });
            };
            let next = self.read_block(engine, underlying)?;
            let cipher = self
                .cipher
                .as_mut()
                .ok_or_else(|| FilterError::io("AESDecode"))?;
            match next {
                Some(next) => {
                    let mut block = current;
                    cipher.decrypt_block(&mut block);
                    out[produced..produced + BLOCK_SIZE].copy_from_slice(&block);
                    produced += BLOCK_SIZE;
                    self.held = Some(next);
                }
                None => {
                    let plain = cipher.decrypt_final(current)?;
                    out[produced..produced + plain.len()].copy_from_slice(&plain);
                    produced += plain.len();
                    self.held = None;
                    return Ok(DecodeOutcome::Eof { produced });
                }
            }
        }
    }
}

enum CbcEncryptor {
    Aes128(Encryptor<Aes128>),
    Aes192(Encryptor<Aes192>),
    Aes256(Encryptor<Aes256>),
}

impl CbcEncryptor {
    fn new(key: &[u8], iv: &[u8; BLOCK_SIZE]) -> FilterResult<Self> {
        match key.len() {
            16 => Ok(Self::Aes128(Encryptor::<Aes128>::new(key.into(), iv.into()))),
            24 => Ok(Self::Aes192(Encryptor::<Aes192>::new(key.into(), iv.into()))),
            32 => Ok(Self::Aes256(Encryptor::<Aes256>::new(key.into(), iv.into()))),
            n => Err(FilterError::new(
                "AESEncode",
                FilterErrorCode::RangeCheck(format!("key must be 16, 24, or 32 bytes, got {n}")),
            )),
        }
    }

    fn encrypt_block(&mut self, block: &mut [u8; BLOCK_SIZE]) {
        match self {
            Self::Aes128(e) => e.encrypt_block_mut(block.into()),
            Self::Aes192(e) => e.encrypt_block_mut(block.into()),
            Self::Aes256(e) => e.encrypt_block_mut(block.into()),
        }
    }
}

/// REFERENCE: [4.7 AES filter]: encode is the lesser-used direction (most
/// producers write plaintext once and hand it to an already-encrypted
/// store). Without an RNG dependency in the stack, the IV is supplied by
/// the caller rather than generated; see DESIGN.md.
pub struct AesEncodeState {
    cipher: CbcEncryptor,
    carry: Vec<u8>,
    iv_written: bool,
    iv: [u8; BLOCK_SIZE],
}

impl AesEncodeState {
    pub fn construct(
        params: &ParamDict,
        config: &EngineConfig,
        underlying_direction: Option<Direction>,
    ) -> FilterResult<Built> {
        if underlying_direction != Some(Direction::Output) {
            return Err(FilterError::new(
                "AESEncode",
                FilterErrorCode::InvalidAccess("requires a writable underlying target".into()),
            ));
        }
        let key = params.require_bytes("AESEncode", "Key")?.to_vec();
        let iv_bytes = params.require_bytes("AESEncode", "IV")?;
        if iv_bytes.len() != BLOCK_SIZE {
            return Err(FilterError::new(
                "AESEncode",
                FilterErrorCode::RangeCheck("IV must be 16 bytes".into()),
            ));
        }
        let mut iv = [0u8; BLOCK_SIZE];
        iv.copy_from_slice(iv_bytes);
        let cipher = CbcEncryptor::new(&key, &iv)?;
        Ok(Built {
            kind: FilterKind::AesEncode(Box::new(AesEncodeState {
                cipher,
                carry: Vec::new(),
                iv_written: false,
                iv,
            })),
            direction: Direction::Output,
            extra_flags: Flags::empty(),
            buffer_size: config.aes_buffer_size,
        })
    }
}

impl FilterOps for AesEncodeState {
    fn decode(
        &mut self,
        _engine: &mut Engine,
        _this: FilterRef,
        _out: &mut [u8],
    ) -> FilterResult<DecodeOutcome> {
        Err(FilterError::new(
            "AESEncode",
            FilterErrorCode::InvalidAccess("output filter".into()),
        ))
    }

    fn encode(&mut self, engine: &mut Engine, this: FilterRef, input: &[u8]) -> FilterResult<()> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("AESEncode"))?;
        if !self.iv_written {
            engine.write(underlying, &self.iv)?;
            self.iv_written = true;
        }
        self.carry.extend_from_slice(input);
        while self.carry.len() >= BLOCK_SIZE {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(&self.carry[..BLOCK_SIZE]);
            self.cipher.encrypt_block(&mut block);
            engine.write(underlying, &block)?;
            self.carry.drain(..BLOCK_SIZE);
        }
        Ok(())
    }

    fn flush(&mut self, engine: &mut Engine, this: FilterRef) -> FilterResult<()> {
        let underlying = engine
            .core(this)
            .underlying
            .ok_or_else(|| FilterError::io("AESEncode"))?;
        // `self.carry` holds 0..BLOCK_SIZE leftover plaintext bytes (encode
        // drains every full block already); PKCS#7-pad it out to exactly
        // one final block.
        let mut buf = ::std::mem::take(&mut self.carry);
        let pad_len = BLOCK_SIZE - buf.len();
        buf.resize(BLOCK_SIZE, pad_len as u8);
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&buf);
        self.cipher.encrypt_block(&mut block);
        engine.write(underlying, &block)?;
        engine.flush(underlying)
    }

    fn dispose(&mut self) {
        self.carry.clear();
    }
}
