use crate::*;
use ed25519_dalek::ExpandedSecretKey;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use ed25519_dalek::Signature;
use ed25519_dalek::Verifier;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::AsRef;
use std::ops::Deref;
use uuid::Uuid;

pub const EXTRACTED_ELECTION_EVENT_FILE_PREFIX: &str = "controlComponentExtractedElectionEvent";
pub const EXTRACTED_VERIFICATION_CARDS_FILE_PREFIX: &str =
    "controlComponentExtractedVerificationCards";
pub const RESOLVED_CONFIRMED_VOTES_FILE_PREFIX: &str = "disputeResolverResolvedConfirmedVotes";

/// This trait should be considered sealed and should not be implemented outside this crate
#[doc(hidden)]
pub trait Signable: Serialize {
    /// Context data identifying (purpose, node id, election event id),
    /// bound into the signature alongside the canonical body bytes.
    fn signature_context(&self) -> Vec<String>;

    fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(&self).expect("votecast: Unexpected error serializing payload")
    }

    /// The message actually signed: the recursive hash over the canonical
    /// body bytes and the signature context.
    fn signed_message(&self) -> [u8; 32] {
        let mut parts = vec![HashInput::Bytes(self.as_bytes())];
        parts.extend(self.signature_context().into_iter().map(HashInput::Text));
        recursive_hash(&HashInput::List(parts))
    }
}

/// A payload with its detachable signature.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Signed<T: Signable + Serialize> {
    pub payload: T,

    #[serde(with = "EdSignatureHex")]
    pub sig: Signature,
}

impl<T: Signable + Serialize> Signed<T> {
    /// Sign a payload, producing a Signed<T>
    pub fn sign(secret: &SecretKey, payload: T) -> Self {
        let public_key = PublicKey::from(secret);
        let expanded: ExpandedSecretKey = secret.into();
        let sig = expanded.sign(&payload.signed_message(), &public_key);
        Signed { payload, sig }
    }

    /// Verify the signature against the given verifying key
    pub fn verify_signature(&self, public_key: &PublicKey) -> Result<(), Error> {
        Ok(public_key.verify(&self.payload.signed_message(), &self.sig)?)
    }

    /// Get the inner unsigned payload
    pub fn inner(&self) -> &T {
        &self.payload
    }
}

impl<T: Signable + Serialize> AsRef<T> for Signed<T> {
    fn as_ref(&self) -> &T {
        &self.payload
    }
}

impl<T: Signable + Serialize> Deref for Signed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.payload
    }
}

/// One node's signed extraction of its election event view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ControlComponentExtractedElectionEventPayload {
    pub node_id: NodeId,
    pub extracted_election_event: ExtractedElectionEvent,
}

impl Signable for ControlComponentExtractedElectionEventPayload {
    fn signature_context(&self) -> Vec<String> {
        vec![
            "extracted-election-event".to_string(),
            self.node_id.to_string(),
            self.extracted_election_event.election_event_id.to_string(),
        ]
    }
}

/// One node's signed extraction of its sent votes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ControlComponentExtractedVerificationCardsPayload {
    pub node_id: NodeId,
    pub election_event_id: Uuid,
    pub extracted_verification_cards: Vec<ExtractedVerificationCard>,
}

impl ControlComponentExtractedVerificationCardsPayload {
    pub fn new(
        node_id: NodeId,
        election_event_id: Uuid,
        mut extracted_verification_cards: Vec<ExtractedVerificationCard>,
    ) -> Result<Self, ValidationError> {
        extracted_verification_cards.sort_by_key(|card| card.verification_card_id);
        for window in extracted_verification_cards.windows(2) {
            if window[0].verification_card_id == window[1].verification_card_id {
                return Err(ValidationError::DuplicateVerificationCardId(
                    window[0].verification_card_id,
                ));
            }
        }
        Ok(ControlComponentExtractedVerificationCardsPayload {
            node_id,
            election_event_id,
            extracted_verification_cards,
        })
    }
}

impl Signable for ControlComponentExtractedVerificationCardsPayload {
    fn signature_context(&self) -> Vec<String> {
        vec![
            "extracted-verification-cards".to_string(),
            self.node_id.to_string(),
            self.election_event_id.to_string(),
        ]
    }
}

/// A signature keystore, as exposed by the node's key infrastructure.
///
/// `verify` distinguishes an invalid signature (`Ok(false)`) from an
/// inability to evaluate the signature at all (`Err`); the former is an
/// invalid-payload condition, the latter an infrastructure error.
pub trait SignatureKeystore {
    fn sign(&self, message: &[u8]) -> Result<Signature, Error>;
    fn verify(&self, node_id: NodeId, message: &[u8], sig: &Signature) -> Result<bool, Error>;
}

/// An in-memory keystore holding this party's signing key and the known
/// node verification keys.
pub struct MemKeystore {
    signing_secret: SecretKey,
    node_public_keys: HashMap<NodeId, PublicKey>,
}

impl MemKeystore {
    pub fn new(signing_secret: SecretKey, node_public_keys: HashMap<NodeId, PublicKey>) -> Self {
        MemKeystore {
            signing_secret,
            node_public_keys,
        }
    }
}

impl SignatureKeystore for MemKeystore {
    fn sign(&self, message: &[u8]) -> Result<Signature, Error> {
        let public_key = PublicKey::from(&self.signing_secret);
        let expanded: ExpandedSecretKey = (&self.signing_secret).into();
        Ok(expanded.sign(message, &public_key))
    }

    fn verify(&self, node_id: NodeId, message: &[u8], sig: &Signature) -> Result<bool, Error> {
        let public_key = self
            .node_public_keys
            .get(&node_id)
            .ok_or(Error::SignatureEvaluation(node_id))?;
        Ok(public_key.verify(message, sig).is_ok())
    }
}

/// Build the conventional filename for a per-node payload file.
pub fn payload_filename(prefix: &str, node_id: NodeId) -> String {
    format!("{}.{}.json", prefix, node_id)
}

/// Recover the node id from a `.`-delimited filename segment and validate
/// it against the known node ids.
pub fn node_id_from_filename(filename: &str) -> Result<NodeId, ValidationError> {
    let mut segments = filename.rsplit('.');
    segments.next(); // extension
    let raw = segments
        .next()
        .and_then(|segment| segment.parse::<u8>().ok())
        .ok_or_else(|| ValidationError::FilenameNodeId {
            filename: filename.to_string(),
        })?;
    NodeId::new(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_convention() {
        let node_id = NodeId::new(3).unwrap();
        let filename = payload_filename(EXTRACTED_ELECTION_EVENT_FILE_PREFIX, node_id);
        assert_eq!(filename, "controlComponentExtractedElectionEvent.3.json");
        assert_eq!(node_id_from_filename(&filename).unwrap(), node_id);

        assert!(node_id_from_filename("payload.json").is_err());
        assert!(node_id_from_filename("payload.9.json").is_err());
        assert!(node_id_from_filename("").is_err());
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let fixture = crate::tests::Fixture::new();
        let (secret, public) = generate_keypair();

        let payload = ControlComponentExtractedElectionEventPayload {
            node_id: NodeId::new(1).unwrap(),
            extracted_election_event: fixture.extracted_election_event(),
        };
        let signed = Signed::sign(&secret, payload);
        signed.verify_signature(&public).unwrap();

        // Any other key must reject
        let (_, other_public) = generate_keypair();
        assert!(signed.verify_signature(&other_public).is_err());

        // Tampering with the body must invalidate the signature
        let mut tampered = signed.clone();
        tampered.payload.extracted_election_event.context_hash = "tampered".to_string();
        assert!(tampered.verify_signature(&public).is_err());
    }

    #[test]
    fn duplicate_card_ids_rejected() {
        let fixture = crate::tests::Fixture::new();
        let card = fixture.extracted_card(uuid::Uuid::new_v4(), vec![]);
        let result = ControlComponentExtractedVerificationCardsPayload::new(
            NodeId::new(1).unwrap(),
            fixture.context.election_event_id,
            vec![card.clone(), card],
        );
        match result {
            Err(ValidationError::DuplicateVerificationCardId(_)) => {}
            other => panic!("expected duplicate card id rejection, got {:?}", other),
        }
    }

    #[test]
    fn serde_json_round_trip() {
        let fixture = crate::tests::Fixture::new();
        let (secret, public) = generate_keypair();
        let payload = ControlComponentExtractedElectionEventPayload {
            node_id: NodeId::new(2).unwrap(),
            extracted_election_event: fixture.extracted_election_event(),
        };
        let signed = Signed::sign(&secret, payload);

        let encoded = serde_json::to_vec(&signed).unwrap();
        let decoded: Signed<ControlComponentExtractedElectionEventPayload> =
            serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded.payload, signed.payload);
        decoded.verify_signature(&public).unwrap();
    }
}
