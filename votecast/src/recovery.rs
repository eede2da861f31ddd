use crate::*;
use aes_gcm::aead::{generic_array::GenericArray, Aead, NewAead};
use aes_gcm::Aes256Gcm;
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// AES-GCM nonce length; the trailing bytes of every mapping-table value.
pub const VCC_NONCE_LENGTH: usize = 12;

const VCC_KEY_LENGTH: usize = 32;

/// Context for recovering one card's short vote-cast return code.
#[derive(Debug, Clone)]
pub struct ReturnCodeContext {
    pub encryption_group: EncryptionGroup,
    pub election_event_id: Uuid,
    pub verification_card_id: Uuid,
    pub vote_cast_return_code_length: usize,
}

/// Recover the voter-facing short vote-cast return code from the four
/// secret-shared long-code shares (ExtractVCC).
///
/// A confirmed vote must always yield a code: a missing mapping entry or
/// a decryption failure indicates corrupted setup data, not a retryable
/// condition.
pub fn extract_vote_cast_return_code<M: MappingTableAccessor>(
    context: &ReturnCodeContext,
    shares: &[GroupElement; NODE_COUNT],
    table: &M,
) -> Result<String, Error> {
    for share in shares.iter() {
        if !context.encryption_group.contains(share) {
            return Err(ValidationError::ShareOutsideGroup(context.verification_card_id).into());
        }
    }

    let digest = long_vote_cast_return_code_digest(
        &context.encryption_group,
        context.election_event_id,
        context.verification_card_id,
        shares,
    );

    let key = mapping_table_key(&digest);
    let value = table
        .get(&key)
        .ok_or(Error::MappingEntryMissing(context.verification_card_id))?;

    let raw = base64::decode(&value)
        .map_err(|_| Error::MappingEntryCorrupt(context.verification_card_id))?;
    if raw.len() <= VCC_NONCE_LENGTH {
        return Err(Error::MappingEntryCorrupt(context.verification_card_id));
    }
    let (ciphertext, nonce) = raw.split_at(raw.len() - VCC_NONCE_LENGTH);

    let code_key = derive_code_key(&digest);
    let aead = Aes256Gcm::new(GenericArray::from_slice(&code_key));
    let plaintext = aead
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| Error::ReturnCodeDecryptionFailed(context.verification_card_id))?;

    let code = String::from_utf8(plaintext)
        .map_err(|_| Error::MalformedReturnCode(context.verification_card_id))?;
    if code.len() != context.vote_cast_return_code_length
        || !code.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::MalformedReturnCode(context.verification_card_id));
    }
    Ok(code)
}

/// Combine the four shares by group multiplication and hash the combined
/// element with the card and election ids into the long-code digest.
pub fn long_vote_cast_return_code_digest(
    group: &EncryptionGroup,
    election_event_id: Uuid,
    verification_card_id: Uuid,
    shares: &[GroupElement; NODE_COUNT],
) -> [u8; 32] {
    let combined = shares
        .iter()
        .fold(group.identity(), |acc, share| group.multiply(&acc, share));

    recursive_hash(&HashInput::List(vec![
        combined.to_hash_input(),
        HashInput::uuid(&verification_card_id),
        HashInput::uuid(&election_event_id),
    ]))
}

/// The mapping-table lookup key: the long-code digest hashed once more,
/// base64-encoded.
pub fn mapping_table_key(long_code_digest: &[u8; 32]) -> String {
    base64::encode(Sha256::digest(long_code_digest))
}

/// Setup counterpart of the recovery path: encrypt a short code under the
/// key derived from its long-code digest, producing the base64
/// `ciphertext || nonce` value stored in the mapping table.
pub fn encrypt_short_vote_cast_return_code(
    long_code_digest: &[u8; 32],
    short_code: &str,
    nonce: &[u8; VCC_NONCE_LENGTH],
) -> String {
    let code_key = derive_code_key(long_code_digest);
    let aead = Aes256Gcm::new(GenericArray::from_slice(&code_key));
    let mut value = aead
        .encrypt(GenericArray::from_slice(nonce), short_code.as_bytes())
        .expect("votecast: AES-GCM encryption failure");
    value.extend_from_slice(nonce);
    base64::encode(value)
}

fn derive_code_key(long_code_digest: &[u8; 32]) -> [u8; VCC_KEY_LENGTH] {
    let hkdf = Hkdf::<Sha256>::new(None, long_code_digest);
    let mut key = [0u8; VCC_KEY_LENGTH];
    hkdf.expand(&[], &mut key)
        .expect("votecast: HKDF output length is valid");
    key
}
