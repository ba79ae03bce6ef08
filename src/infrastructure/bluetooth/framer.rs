//! Secure Framer
//!
//! Every command leaves as `IV[16] ‖ AES-128-CBC/PKCS#7(payload)` with a
//! fresh random IV. There is no MAC: the relay firmware expects exactly this
//! layout, so the frames are confidential but not tamper-evident.
//!
//! The key is the raw bytes of a 16-byte passphrase, with no derivation
//! step. That is weak against guessing but required by the relay.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Key must be exactly {KEY_LEN} bytes, got {0}")]
    Length(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("No encryption key configured")]
    NoKey,
    #[error("Malformed frame")]
    Malformed,
}

/// The pre-shared 128-bit key
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    key: [u8; KEY_LEN],
}

impl EncryptionContext {
    /// Take the passphrase bytes verbatim as the AES key
    pub fn from_passphrase(passphrase: &str) -> Result<Self, KeyError> {
        let key: [u8; KEY_LEN] = passphrase
            .as_bytes()
            .try_into()
            .map_err(|_| KeyError::Length(passphrase.len()))?;
        Ok(Self { key })
    }

    /// Encrypt with a caller-chosen IV. Output is `iv ‖ ciphertext`.
    pub fn seal_with_iv(&self, iv: [u8; IV_LEN], payload: &[u8]) -> Vec<u8> {
        let ciphertext = Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(payload);

        let mut frame = Vec::with_capacity(IV_LEN + ciphertext.len());
        frame.extend_from_slice(&iv);
        frame.extend_from_slice(&ciphertext);
        frame
    }

    /// Relay-side inverse of [`seal_with_iv`](Self::seal_with_iv)
    pub fn open(&self, frame: &[u8]) -> Result<Vec<u8>, FrameError> {
        if frame.len() < IV_LEN * 2 || frame.len() % IV_LEN != 0 {
            return Err(FrameError::Malformed);
        }
        let (iv, ciphertext) = frame.split_at(IV_LEN);
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| FrameError::Malformed)?;
        Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| FrameError::Malformed)
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Shared slot holding the active key.
///
/// Swaps replace the whole context; readers clone the inner `Arc`, so a
/// frame is always sealed under exactly one key.
#[derive(Debug, Clone, Default)]
pub struct KeyHandle {
    slot: Arc<RwLock<Option<Arc<EncryptionContext>>>>,
}

impl KeyHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: EncryptionContext) -> Self {
        let handle = Self::new();
        handle.set(context);
        handle
    }

    pub fn set(&self, context: EncryptionContext) {
        let mut slot = match self.slot.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(Arc::new(context));
    }

    pub fn clear(&self) {
        let mut slot = match self.slot.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    pub fn current(&self) -> Option<Arc<EncryptionContext>> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecureFramer {
    keys: KeyHandle,
}

impl SecureFramer {
    pub fn new(keys: KeyHandle) -> Self {
        Self { keys }
    }

    /// Seal a payload under the active key with a fresh random IV
    pub fn seal(&self, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
        let context = self.keys.current().ok_or(FrameError::NoKey)?;
        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        Ok(context.seal_with_iv(iv, payload))
    }
}
