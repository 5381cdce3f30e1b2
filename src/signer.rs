//! Signing and verification for the three Substrate key types
//!
//! The signer is handed an explicit [`SignablePayload`] and never guesses
//! which representation was meant. Structured payloads are signed over
//! [`StructuredPayload::signing_bytes`](crate::payload::StructuredPayload::signing_bytes),
//! raw bytes as given.

use crate::address::{AccountId, Sender};
use crate::codec::{blake2_256, to_hex};
use crate::error::WasmPolyxError;
use crate::payload::SignablePayload;
use crate::types::KeyType;
use core::fmt;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey as EcdsaSigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use schnorrkel::{signing_context, ExpansionMode, MiniSecretKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Signing context used by Substrate runtimes for sr25519
const SIGNING_CTX: &[u8] = b"substrate";

/// A private key of one of the supported algorithms
pub enum KeyPair {
    Ed25519(ed25519_dalek::SigningKey),
    Sr25519(schnorrkel::Keypair),
    Ecdsa(EcdsaSigningKey),
}

impl KeyPair {
    /// Build a key from a 32-byte secret seed
    pub fn from_seed(key_type: KeyType, seed: &[u8; 32]) -> Result<Self, WasmPolyxError> {
        match key_type {
            KeyType::Ed25519 => Ok(KeyPair::Ed25519(ed25519_dalek::SigningKey::from_bytes(seed))),
            KeyType::Sr25519 => {
                let mini = MiniSecretKey::from_bytes(seed)
                    .map_err(|e| WasmPolyxError::InvalidInput(format!("Invalid seed: {}", e)))?;
                Ok(KeyPair::Sr25519(mini.expand_to_keypair(ExpansionMode::Ed25519)))
            }
            KeyType::Ecdsa => {
                let key = EcdsaSigningKey::from_slice(seed)
                    .map_err(|e| WasmPolyxError::InvalidInput(format!("Invalid seed: {}", e)))?;
                Ok(KeyPair::Ecdsa(key))
            }
        }
    }

    /// Generate a fresh random key
    pub fn generate(key_type: KeyType) -> Result<Self, WasmPolyxError> {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(key_type, &seed)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            KeyPair::Ed25519(_) => KeyType::Ed25519,
            KeyPair::Sr25519(_) => KeyType::Sr25519,
            KeyPair::Ecdsa(_) => KeyType::Ecdsa,
        }
    }

    /// Public key bytes: 32 bytes, or the 33-byte compressed point for ECDSA
    pub fn public_key(&self) -> Vec<u8> {
        match self {
            KeyPair::Ed25519(key) => key.verifying_key().to_bytes().to_vec(),
            KeyPair::Sr25519(pair) => pair.public.to_bytes().to_vec(),
            KeyPair::Ecdsa(key) => key
                .verifying_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        match self {
            KeyPair::Ed25519(key) => AccountId(key.verifying_key().to_bytes()),
            KeyPair::Sr25519(pair) => AccountId(pair.public.to_bytes()),
            KeyPair::Ecdsa(_) => AccountId(blake2_256(&self.public_key())),
        }
    }

    pub fn sender(&self) -> Sender {
        Sender::with_key_type(self.account_id(), self.key_type())
    }

    /// Sign a message with the key's native algorithm
    pub fn sign_bytes(&self, message: &[u8]) -> Result<Signature, WasmPolyxError> {
        let bytes = match self {
            KeyPair::Ed25519(key) => {
                use ed25519_dalek::Signer;
                key.sign(message).to_bytes().to_vec()
            }
            KeyPair::Sr25519(pair) => pair
                .sign(signing_context(SIGNING_CTX).bytes(message))
                .to_bytes()
                .to_vec(),
            KeyPair::Ecdsa(key) => {
                let (signature, recovery_id): (EcdsaSignature, RecoveryId) = key
                    .sign_prehash(&blake2_256(message))
                    .map_err(|e| WasmPolyxError::InvalidSignature(format!("Signing failed: {}", e)))?;
                let mut bytes = signature.to_bytes().to_vec();
                bytes.push(recovery_id.to_byte());
                bytes
            }
        };
        Signature::new(self.key_type(), bytes)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({}, {})", self.key_type(), self.account_id())
    }
}

/// Raw signature bytes tagged with the algorithm that produced them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub algorithm: KeyType,
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn new(algorithm: KeyType, bytes: Vec<u8>) -> Result<Self, WasmPolyxError> {
        if bytes.len() != algorithm.signature_len() {
            return Err(WasmPolyxError::InvalidSignature(format!(
                "{} signature must be {} bytes, got {}",
                algorithm,
                algorithm.signature_len(),
                bytes.len()
            )));
        }
        Ok(Signature { algorithm, bytes })
    }

    /// Discriminator byte followed by the raw signature
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.bytes.len());
        out.push(self.algorithm.discriminator());
        out.extend_from_slice(&self.bytes);
        out
    }

    pub fn from_wire(wire: &[u8]) -> Result<Self, WasmPolyxError> {
        let (&discriminator, raw) = wire
            .split_first()
            .ok_or_else(|| WasmPolyxError::InvalidSignature("Empty signature".to_string()))?;
        Signature::new(KeyType::from_discriminator(discriminator)?, raw.to_vec())
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.to_wire())
    }
}

/// Sign a payload with `key`
///
/// Fails with `KeyNotFound` when the key does not belong to the payload's
/// sender and with `UnknownKeyType` when the sender declares a different
/// algorithm than the key uses.
pub fn sign(payload: &SignablePayload, key: &KeyPair) -> Result<Signature, WasmPolyxError> {
    let sender = payload.sender();
    if key.account_id() != sender.account_id {
        return Err(WasmPolyxError::KeyNotFound(sender.account_id.to_string()));
    }
    if let Some(declared) = sender.key_type {
        if declared != key.key_type() {
            return Err(WasmPolyxError::UnknownKeyType(format!(
                "sender declares {} but key is {}",
                declared,
                key.key_type()
            )));
        }
    }
    key.sign_bytes(&payload.signing_bytes())
}

/// Check a signature against a payload and its sender's account id
pub fn verify(payload: &SignablePayload, signature: &Signature) -> bool {
    verify_message(
        &payload.sender().account_id,
        &payload.signing_bytes(),
        signature,
    )
}

/// Check a signature over `message` for `account`
///
/// ECDSA accounts are hashed public keys, so the key is recovered from the
/// signature and compared by hash.
pub fn verify_message(account: &AccountId, message: &[u8], signature: &Signature) -> bool {
    match signature.algorithm {
        KeyType::Ed25519 => {
            let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(account.as_bytes()) else {
                return false;
            };
            let Ok(sig) = ed25519_dalek::Signature::from_slice(&signature.bytes) else {
                return false;
            };
            key.verify_strict(message, &sig).is_ok()
        }
        KeyType::Sr25519 => {
            let Ok(key) = schnorrkel::PublicKey::from_bytes(account.as_bytes()) else {
                return false;
            };
            let Ok(sig) = schnorrkel::Signature::from_bytes(&signature.bytes) else {
                return false;
            };
            key.verify_simple(SIGNING_CTX, message, &sig).is_ok()
        }
        KeyType::Ecdsa => {
            if signature.bytes.len() != 65 {
                return false;
            }
            let Ok(sig) = EcdsaSignature::from_slice(&signature.bytes[..64]) else {
                return false;
            };
            let Some(recid) = RecoveryId::from_byte(signature.bytes[64]) else {
                return false;
            };
            let Ok(recovered) = VerifyingKey::recover_from_prehash(&blake2_256(message), &sig, recid)
            else {
                return false;
            };
            blake2_256(recovered.to_encoded_point(true).as_bytes()) == account.0
        }
    }
}

/// In-memory key store
///
/// Each key sits behind its own mutex, so concurrent signing with one key is
/// serialized while different keys sign in parallel.
#[derive(Debug, Default, Clone)]
pub struct Keyring {
    keys: HashMap<AccountId, Arc<Mutex<KeyPair>>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and return its account id
    pub fn add(&mut self, key: KeyPair) -> AccountId {
        let account = key.account_id();
        self.keys.insert(account, Arc::new(Mutex::new(key)));
        account
    }

    pub fn contains(&self, account: &AccountId) -> bool {
        self.keys.contains_key(account)
    }

    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<_> = self.keys.keys().copied().collect();
        accounts.sort();
        accounts
    }

    fn key(&self, account: &AccountId) -> Result<&Arc<Mutex<KeyPair>>, WasmPolyxError> {
        self.keys
            .get(account)
            .ok_or_else(|| WasmPolyxError::KeyNotFound(account.to_string()))
    }

    /// Sender for an account, with its key type filled in
    pub fn sender(&self, account: &AccountId) -> Result<Sender, WasmPolyxError> {
        let key = self.key(account)?;
        let key_type = key
            .lock()
            .map_err(|_| WasmPolyxError::StringError("Key lock poisoned".to_string()))?
            .key_type();
        Ok(Sender::with_key_type(*account, key_type))
    }

    /// Sign with the key registered for the payload's sender
    pub fn sign(&self, payload: &SignablePayload) -> Result<Signature, WasmPolyxError> {
        let key = self.key(&payload.sender().account_id)?;
        let guard = key
            .lock()
            .map_err(|_| WasmPolyxError::StringError("Key lock poisoned".to_string()))?;
        sign(payload, &guard)
    }
}
