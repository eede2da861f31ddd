use crate::*;
use num_bigint::BigUint;
use std::convert::TryFrom;
use uuid::Uuid;

/// Number of control-component nodes sharing trust.
pub const NODE_COUNT: usize = 4;

/// The fixed set of known node ids.
pub const KNOWN_NODE_IDS: [NodeId; NODE_COUNT] = [NodeId(1), NodeId(2), NodeId(3), NodeId(4)];

/// Length of a base64-encoded hashed long-code value (32 bytes, padded).
pub const LONG_CODE_SHARE_B64_LENGTH: usize = 44;

/// Identifier of a control-component node, restricted to the known set.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct NodeId(u8);

impl NodeId {
    pub fn new(id: u8) -> Result<Self, ValidationError> {
        if id >= 1 && id as usize <= NODE_COUNT {
            Ok(NodeId(id))
        } else {
            Err(ValidationError::UnknownNodeId(id))
        }
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for NodeId {
    type Error = ValidationError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        NodeId::new(id)
    }
}

impl From<NodeId> for u8 {
    fn from(id: NodeId) -> u8 {
        id.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Check that a value is fixed-length base64 of a 32-byte digest.
pub fn validate_share_b64(value: &str) -> Result<(), ValidationError> {
    let decoded = base64::decode(value).map_err(|_| ValidationError::BadBase64 {
        value: value.to_string(),
        expected: LONG_CODE_SHARE_B64_LENGTH,
    })?;
    if value.len() != LONG_CODE_SHARE_B64_LENGTH || decoded.len() != 32 {
        return Err(ValidationError::BadBase64 {
            value: value.to_string(),
            expected: LONG_CODE_SHARE_B64_LENGTH,
        });
    }
    Ok(())
}

pub fn parse_election_event_id(value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value).map_err(|_| ValidationError::InvalidUuid {
        value: value.to_string(),
    })
}

/// The immutable election event context read by the extractor.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ElectionEventContext {
    pub election_event_id: Uuid,
    pub encryption_group: EncryptionGroup,
    pub verification_card_set_contexts: Vec<VerificationCardSetContext>,
    pub finish_time: String,
}

/// Per-card-set configuration: key material, primes mapping table and the
/// two precomputed allow lists.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VerificationCardSetContext {
    pub verification_card_set_id: Uuid,
    pub primes_mapping_table: Vec<BigUint>,
    pub election_public_key: Vec<GroupElement>,
    pub choice_return_codes_public_key: Vec<GroupElement>,
    pub partial_choice_return_codes_allow_list: Vec<String>,
    pub long_vote_cast_return_code_allow_list: Vec<String>,
}

/// Bounds and lengths that the extractor and the return-code recovery
/// enforce. Explicit plain-struct configuration, no framework.
#[derive(Debug, Copy, Clone)]
pub struct ExtractorConfig {
    /// Maximum election public key length (number of write-ins plus one).
    pub max_write_ins_plus_one: usize,
    /// Maximum choice-return-codes public key length (number of selections).
    pub max_selections: usize,
    /// Length of the voter-facing short vote-cast return code.
    pub vote_cast_return_code_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            max_write_ins_plus_one: 1,
            max_selections: 120,
            vote_cast_return_code_length: 8,
        }
    }
}
