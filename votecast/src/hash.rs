use num_bigint::BigUint;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Canonical input to the recursive hash.
///
/// Every value that is hashed for cross-replica comparison or for signing
/// is first expressed as one of these four shapes. The hash of a value is
/// then fully determined by its shape, independent of how the value was
/// stored or iterated on any particular replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashInput {
    Bytes(Vec<u8>),
    Int(BigUint),
    Text(String),
    List(Vec<HashInput>),
}

impl HashInput {
    pub fn text<S: Into<String>>(value: S) -> Self {
        HashInput::Text(value.into())
    }

    pub fn uuid(value: &Uuid) -> Self {
        HashInput::Text(value.to_string())
    }
}

// Domain-separation prefixes. A byte string, an integer with the same
// big-endian encoding, and a list wrapping either must all hash apart.
const TAG_BYTES: u8 = 0x00;
const TAG_INT: u8 = 0x01;
const TAG_TEXT: u8 = 0x02;
const TAG_LIST: u8 = 0x03;

/// Recursive cryptographic hash over a canonical input.
///
/// Leaves are hashed as `SHA-256(tag || encoding)`; a list is hashed as
/// `SHA-256(tag || child-hash_1 || ... || child-hash_n)`.
pub fn recursive_hash(input: &HashInput) -> [u8; 32] {
    let mut hasher = Sha256::new();
    match input {
        HashInput::Bytes(bytes) => {
            hasher.update([TAG_BYTES]);
            hasher.update(bytes);
        }
        HashInput::Int(value) => {
            hasher.update([TAG_INT]);
            hasher.update(value.to_bytes_be());
        }
        HashInput::Text(value) => {
            hasher.update([TAG_TEXT]);
            hasher.update(value.as_bytes());
        }
        HashInput::List(items) => {
            hasher.update([TAG_LIST]);
            for item in items {
                hasher.update(recursive_hash(item));
            }
        }
    }
    hasher.finalize().into()
}

/// An entity with a canonical hashable form.
pub trait Hashable {
    fn to_hash_input(&self) -> HashInput;

    /// The recursive hash of this entity, base64-encoded (44 characters).
    fn base64_hash(&self) -> String {
        base64::encode(recursive_hash(&self.to_hash_input()))
    }
}
