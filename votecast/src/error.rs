use crate::*;

use thiserror::Error;
use uuid::Uuid;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("votecast: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("votecast: signature for node {0} could not be evaluated")]
    SignatureEvaluation(NodeId),

    #[error("votecast: CBOR error serializing payload: {0}")]
    CBORSerialization(#[from] serde_cbor::Error),

    #[error("votecast: JSON error deserializing payload: {0}")]
    JSONDeserialization(#[from] serde_json::Error),

    #[error("votecast: election event context not found: {0}")]
    ElectionEventNotFound(Uuid),

    #[error("votecast: verification card {0} was never recorded as sent on this node")]
    CardNotSent(Uuid),

    #[error("votecast: no long-code allow list for verification card set {0}")]
    MissingAllowList(Uuid),

    #[error("votecast: vote confirmation agreement failed for verification card {0}")]
    AgreementFailed(Uuid),

    #[error("votecast: no return-codes mapping entry for verification card {0}")]
    MappingEntryMissing(Uuid),

    #[error("votecast: corrupt return-codes mapping entry for verification card {0}")]
    MappingEntryCorrupt(Uuid),

    #[error("votecast: vote-cast return code decryption failed for verification card {0}")]
    ReturnCodeDecryptionFailed(Uuid),

    #[error("votecast: recovered vote-cast return code has the wrong shape for verification card {0}")]
    MalformedReturnCode(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

/// Construction-time validation errors
///
/// All of these fail fast at the boundary, before any side effect, and are
/// recoverable by the caller correcting its input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("votecast validation: not a valid UUID: {value}")]
    InvalidUuid { value: String },

    #[error("votecast validation: unknown node id: {0}")]
    UnknownNodeId(u8),

    #[error("votecast validation: not {expected}-character base64: {value}")]
    BadBase64 { value: String, expected: usize },

    #[error("votecast validation: invalid encryption group: {0}")]
    InvalidEncryptionGroup(&'static str),

    #[error("votecast validation: {key} for verification card set {verification_card_set_id} has {len} elements, maximum is {max}")]
    PublicKeyTooLong {
        verification_card_set_id: Uuid,
        key: &'static str,
        len: usize,
        max: usize,
    },

    #[error("votecast validation: {key} element for verification card set {verification_card_set_id} is outside the encryption group")]
    KeyElementOutsideGroup {
        verification_card_set_id: Uuid,
        key: &'static str,
    },

    #[error("votecast validation: long-code share for verification card {0} is outside the encryption group")]
    ShareOutsideGroup(Uuid),

    #[error("votecast validation: duplicate verification card set id: {0}")]
    DuplicateVerificationCardSetId(Uuid),

    #[error("votecast validation: duplicate verification card id: {0}")]
    DuplicateVerificationCardId(Uuid),

    #[error("votecast validation: verification card {verification_card_id} carries {count} long-code shares, expected 0 or {expected}")]
    ShareCountMismatch {
        verification_card_id: Uuid,
        count: usize,
        expected: usize,
    },

    #[error("votecast validation: long-code allow list map is empty")]
    EmptyAllowListMap,

    #[error("votecast validation: quorum of {0} is not a majority of the known nodes")]
    InvalidQuorum(usize),

    #[error("votecast validation: no node id segment in filename: {filename}")]
    FilenameNodeId { filename: String },
}

/// Replica disagreement detected by the dispute resolver
///
/// Fatal for the current resolution run: the run aborts with no partial
/// output, and the disagreement must be surfaced to operators.
#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("votecast consistency: missing {kind} payload for node {node_id}")]
    MissingNodePayload { node_id: NodeId, kind: &'static str },

    #[error("votecast consistency: more than one {kind} payload for node {node_id}")]
    DuplicateNodePayload { node_id: NodeId, kind: &'static str },

    #[error("votecast consistency: payload signature for node {0} is invalid")]
    InvalidPayloadSignature(NodeId),

    #[error("votecast consistency: node {node_id} reports a different election event than node {reference_node_id}")]
    ElectionEventIdMismatch {
        node_id: NodeId,
        reference_node_id: NodeId,
    },

    #[error("votecast consistency: extracted election event of node {node_id} diverges from node {reference_node_id}")]
    ExtractedElectionEventMismatch {
        node_id: NodeId,
        reference_node_id: NodeId,
    },

    #[error("votecast consistency: encrypted vote for verification card {verification_card_id} differs on node {node_id}")]
    EncryptedVoteMismatch {
        verification_card_id: Uuid,
        node_id: NodeId,
    },

    #[error("votecast consistency: verification card set for verification card {verification_card_id} differs on node {node_id}")]
    VerificationCardSetMismatch {
        verification_card_id: Uuid,
        node_id: NodeId,
    },

    #[error("votecast consistency: conflicting confirmation share vectors for verification card {0}")]
    ConflictingConfirmations(Uuid),

    #[error("votecast consistency: resolved {resolved} confirmed votes but node {node_id} reported only {reported} verification cards")]
    ResolvedCountExceedsReported {
        node_id: NodeId,
        resolved: usize,
        reported: usize,
    },
}
