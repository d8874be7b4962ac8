//! Signed and unsigned transactions on the wire
//!
//! ```text
//! compact-u16        -- signature count
//! <64 bytes> * n     -- signatures, in signer order
//! <message>          -- legacy or v0 message
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use coin_core::{Address, TxError, TxSignature};

use crate::message::Message;
use crate::shortvec::{encode_len, ByteReader};

/// Length of an ed25519 signature
pub const SIGNATURE_BYTES: usize = 64;

fn encode(signatures: &[[u8; SIGNATURE_BYTES]], message: &Message) -> Result<Vec<u8>, TxError> {
    let mut bytes = Vec::new();
    encode_len(&mut bytes, signatures.len())?;
    for sig in signatures {
        bytes.extend_from_slice(sig);
    }
    bytes.extend_from_slice(&message.serialize()?);
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<(Vec<[u8; SIGNATURE_BYTES]>, Message), TxError> {
    let mut reader = ByteReader::new(bytes);
    let count = reader.read_len()?;
    let mut signatures = Vec::with_capacity(count);
    for _ in 0..count {
        signatures.push(reader.read_array::<SIGNATURE_BYTES>()?);
    }
    let message = Message::read_from(&mut reader)?;
    if !reader.is_empty() {
        return Err(TxError::Malformed {
            message: "trailing bytes after transaction".to_string(),
        });
    }
    if signatures.len() != usize::from(message.header.num_required_signatures) {
        return Err(TxError::Malformed {
            message: format!(
                "{} signatures for {} required signers",
                signatures.len(),
                message.header.num_required_signatures
            ),
        });
    }
    Ok((signatures, message))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, TxError> {
    STANDARD.decode(encoded).map_err(|e| TxError::Base64 {
        message: e.to_string(),
    })
}

/// A transaction awaiting signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub message: Message,
}

impl UnsignedTransaction {
    pub fn new(message: Message) -> Self {
        Self { message }
    }

    /// Decode wire bytes, discarding whatever signature slots they carry
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let (_, message) = decode(bytes)?;
        Ok(Self { message })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TxError> {
        Self::from_bytes(&decode_base64(encoded)?)
    }

    /// Wire bytes with zeroed signature slots
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        let placeholders =
            vec![[0u8; SIGNATURE_BYTES]; usize::from(self.message.header.num_required_signatures)];
        encode(&placeholders, &self.message)
    }

    pub fn to_base64(&self) -> Result<String, TxError> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// Bytes every signer signs
    pub fn message_bytes(&self) -> Result<Vec<u8>, TxError> {
        self.message.serialize()
    }

    pub fn fee_payer(&self) -> Option<&Address> {
        self.message.fee_payer()
    }
}

/// A transaction with its signature slots filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub signatures: Vec<[u8; SIGNATURE_BYTES]>,
    pub message: Message,
}

impl SignedTransaction {
    pub fn new(signatures: Vec<[u8; SIGNATURE_BYTES]>, message: Message) -> Self {
        Self {
            signatures,
            message,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let (signatures, message) = decode(bytes)?;
        Ok(Self {
            signatures,
            message,
        })
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TxError> {
        Self::from_bytes(&decode_base64(encoded)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        encode(&self.signatures, &self.message)
    }

    pub fn to_base64(&self) -> Result<String, TxError> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// The fee payer's signature identifies the transaction
    pub fn signature(&self) -> Option<TxSignature> {
        self.signatures
            .first()
            .map(|sig| TxSignature::new(bs58::encode(sig).into_string()))
    }

    /// Every required slot holds a non-zero signature
    pub fn is_fully_signed(&self) -> bool {
        self.signatures.len() == usize::from(self.message.header.num_required_signatures)
            && self.signatures.iter().all(|sig| sig.iter().any(|&b| b != 0))
    }
}
