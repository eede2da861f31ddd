use crate::*;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Decision rule for stage 3 of the consistency pipeline.
///
/// `Unanimous` requires all four nodes to report the identical non-empty
/// share vector for a card. `Quorum(t)` accepts `t` identical reports,
/// but two *conflicting* non-empty vectors for one card always abort the
/// run: conflicting confirmations are a replica-integrity dispute, never
/// something to majority-vote away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfirmationPolicy {
    Unanimous,
    Quorum(usize),
}

impl ConfirmationPolicy {
    pub fn quorum(size: usize) -> Result<Self, ValidationError> {
        if size > NODE_COUNT / 2 && size <= NODE_COUNT {
            Ok(ConfirmationPolicy::Quorum(size))
        } else {
            Err(ValidationError::InvalidQuorum(size))
        }
    }

    fn threshold(&self) -> usize {
        match self {
            ConfirmationPolicy::Unanimous => NODE_COUNT,
            ConfirmationPolicy::Quorum(size) => *size,
        }
    }
}

/// A vote whose confirmation the resolver has settled: exactly one hashed
/// long-code share per node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfirmedVote {
    pub verification_card_id: Uuid,
    pub verification_card_set_id: Uuid,
    pub hashed_long_vote_cast_return_code_shares: Vec<String>,
}

impl ResolvedConfirmedVote {
    pub fn new(
        verification_card_id: Uuid,
        verification_card_set_id: Uuid,
        hashed_long_vote_cast_return_code_shares: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if hashed_long_vote_cast_return_code_shares.len() != NODE_COUNT {
            return Err(ValidationError::ShareCountMismatch {
                verification_card_id,
                count: hashed_long_vote_cast_return_code_shares.len(),
                expected: NODE_COUNT,
            });
        }
        for share in &hashed_long_vote_cast_return_code_shares {
            validate_share_b64(share)?;
        }
        Ok(ResolvedConfirmedVote {
            verification_card_id,
            verification_card_set_id,
            hashed_long_vote_cast_return_code_shares,
        })
    }
}

/// The resolver's signed output: the deduplicated, ordered list of
/// confirmed votes for one election event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DisputeResolverResolvedConfirmedVotesPayload {
    pub election_event_id: Uuid,
    pub resolved_confirmed_votes: Vec<ResolvedConfirmedVote>,
}

impl DisputeResolverResolvedConfirmedVotesPayload {
    pub fn new(
        election_event_id: Uuid,
        mut resolved_confirmed_votes: Vec<ResolvedConfirmedVote>,
    ) -> Result<Self, ValidationError> {
        resolved_confirmed_votes.sort_by_key(|vote| vote.verification_card_id);
        for window in resolved_confirmed_votes.windows(2) {
            if window[0].verification_card_id == window[1].verification_card_id {
                return Err(ValidationError::DuplicateVerificationCardId(
                    window[0].verification_card_id,
                ));
            }
        }
        Ok(DisputeResolverResolvedConfirmedVotesPayload {
            election_event_id,
            resolved_confirmed_votes,
        })
    }
}

impl Signable for DisputeResolverResolvedConfirmedVotesPayload {
    fn signature_context(&self) -> Vec<String> {
        vec![
            "resolved-confirmed-votes".to_string(),
            self.election_event_id.to_string(),
        ]
    }
}

/// The offline dispute resolver.
///
/// Ingests the four nodes' signed extraction payloads and runs the
/// three-stage consistency pipeline. Each stage is all-or-nothing: any
/// failure aborts the run with no partial resolved-vote output.
pub struct DisputeResolver<K: SignatureKeystore> {
    keystore: K,
    policy: ConfirmationPolicy,
}

impl<K: SignatureKeystore> DisputeResolver<K> {
    pub fn new(keystore: K, policy: ConfirmationPolicy) -> Self {
        DisputeResolver { keystore, policy }
    }

    pub fn resolve(
        &self,
        election_event_payloads: &[Signed<ControlComponentExtractedElectionEventPayload>],
        verification_card_payloads: &[Signed<ControlComponentExtractedVerificationCardsPayload>],
    ) -> Result<DisputeResolverResolvedConfirmedVotesPayload, Error> {
        let events = index_by_node(
            election_event_payloads,
            "extracted election event",
            |payload| payload.node_id,
        )?;
        let cards = index_by_node(
            verification_card_payloads,
            "extracted verification cards",
            |payload| payload.node_id,
        )?;

        // Signatures are verified before any content is trusted
        for (&node_id, signed) in election_event_payloads
            .iter()
            .map(|signed| (&signed.payload.node_id, signed))
        {
            self.verify_payload_signature(node_id, &signed.payload.signed_message(), &signed.sig)?;
        }
        for (&node_id, signed) in verification_card_payloads
            .iter()
            .map(|signed| (&signed.payload.node_id, signed))
        {
            self.verify_payload_signature(node_id, &signed.payload.signed_message(), &signed.sig)?;
        }

        let reference_node_id = KNOWN_NODE_IDS[0];
        let election_event_id = events[&reference_node_id]
            .extracted_election_event
            .election_event_id;

        // Every payload must be about the same election event
        for (&node_id, payload) in &events {
            if payload.extracted_election_event.election_event_id != election_event_id {
                return Err(ConsistencyError::ElectionEventIdMismatch {
                    node_id,
                    reference_node_id,
                }
                .into());
            }
        }
        for (&node_id, payload) in &cards {
            if payload.election_event_id != election_event_id {
                return Err(ConsistencyError::ElectionEventIdMismatch {
                    node_id,
                    reference_node_id,
                }
                .into());
            }
        }

        self.check_election_event_consistency(&events, reference_node_id)?;
        log::info!(
            "election event consistency for {}: all {} nodes agree",
            election_event_id,
            NODE_COUNT
        );

        self.check_vote_consistency(&cards)?;
        log::info!("vote consistency for {}: ciphertexts agree", election_event_id);

        let resolved = self.resolve_confirmed_votes(&cards)?;
        log::info!(
            "vote confirmation consistency for {}: {} confirmed votes resolved",
            election_event_id,
            resolved.len()
        );

        // Post-hoc invariant: never more resolved confirmed votes than any
        // one node reported verification cards.
        for (&node_id, payload) in &cards {
            let reported = payload.extracted_verification_cards.len();
            if resolved.len() > reported {
                return Err(ConsistencyError::ResolvedCountExceedsReported {
                    node_id,
                    resolved: resolved.len(),
                    reported,
                }
                .into());
            }
        }

        Ok(DisputeResolverResolvedConfirmedVotesPayload::new(
            election_event_id,
            resolved,
        )?)
    }

    fn verify_payload_signature(
        &self,
        node_id: NodeId,
        message: &[u8],
        sig: &ed25519_dalek::Signature,
    ) -> Result<(), Error> {
        if self.keystore.verify(node_id, message, sig)? {
            Ok(())
        } else {
            Err(ConsistencyError::InvalidPayloadSignature(node_id).into())
        }
    }

    /// Stage 1: all extracted election events must be value-identical.
    fn check_election_event_consistency(
        &self,
        events: &IndexMap<NodeId, &ControlComponentExtractedElectionEventPayload>,
        reference_node_id: NodeId,
    ) -> Result<(), ConsistencyError> {
        let reference = &events[&reference_node_id].extracted_election_event;
        let reference_digest = reference.base64_hash();

        for (&node_id, payload) in events {
            let event = &payload.extracted_election_event;
            if event.base64_hash() != reference_digest || event != reference {
                return Err(ConsistencyError::ExtractedElectionEventMismatch {
                    node_id,
                    reference_node_id,
                });
            }
        }
        Ok(())
    }

    /// Stage 2: for every card reported by more than one node, the
    /// ciphertext and card-set id must be identical everywhere.
    fn check_vote_consistency(
        &self,
        cards: &IndexMap<NodeId, &ControlComponentExtractedVerificationCardsPayload>,
    ) -> Result<(), ConsistencyError> {
        let mut seen: BTreeMap<Uuid, (NodeId, &ExtractedVerificationCard)> = BTreeMap::new();

        for (&node_id, payload) in cards {
            for card in &payload.extracted_verification_cards {
                match seen.get(&card.verification_card_id) {
                    None => {
                        seen.insert(card.verification_card_id, (node_id, card));
                    }
                    Some((_, reference)) => {
                        if reference.encrypted_vote != card.encrypted_vote {
                            return Err(ConsistencyError::EncryptedVoteMismatch {
                                verification_card_id: card.verification_card_id,
                                node_id,
                            });
                        }
                        if reference.verification_card_set_id != card.verification_card_set_id {
                            return Err(ConsistencyError::VerificationCardSetMismatch {
                                verification_card_id: card.verification_card_id,
                                node_id,
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Stage 3: decide the confirmation outcome per card under the policy.
    fn resolve_confirmed_votes(
        &self,
        cards: &IndexMap<NodeId, &ControlComponentExtractedVerificationCardsPayload>,
    ) -> Result<Vec<ResolvedConfirmedVote>, Error> {
        // Deterministic iteration: cards keyed by id, reports in node order.
        let mut reports: BTreeMap<Uuid, (Uuid, Vec<&Vec<String>>)> = BTreeMap::new();
        for (_, payload) in cards {
            for card in &payload.extracted_verification_cards {
                let entry = reports
                    .entry(card.verification_card_id)
                    .or_insert_with(|| (card.verification_card_set_id, Vec::new()));
                if !card.hashed_long_vote_cast_return_code_shares.is_empty() {
                    entry.1.push(&card.hashed_long_vote_cast_return_code_shares);
                }
            }
        }

        let threshold = self.policy.threshold();
        let mut resolved = Vec::new();

        for (verification_card_id, (verification_card_set_id, vectors)) in reports {
            if vectors.is_empty() {
                continue; // not confirmed anywhere
            }
            let reference = vectors[0];
            if vectors.iter().any(|vector| *vector != reference) {
                return Err(ConsistencyError::ConflictingConfirmations(verification_card_id).into());
            }
            if vectors.len() >= threshold {
                resolved.push(ResolvedConfirmedVote::new(
                    verification_card_id,
                    verification_card_set_id,
                    reference.clone(),
                )?);
            }
        }
        Ok(resolved)
    }
}

/// Exactly one payload per known node id, in node order.
fn index_by_node<'a, T, F: Fn(&T) -> NodeId>(
    payloads: &'a [Signed<T>],
    kind: &'static str,
    node_id_of: F,
) -> Result<IndexMap<NodeId, &'a T>, ConsistencyError>
where
    T: Signable + Serialize,
{
    let mut indexed: IndexMap<NodeId, &T> = IndexMap::new();
    for signed in payloads {
        let node_id = node_id_of(&signed.payload);
        if indexed.insert(node_id, &signed.payload).is_some() {
            return Err(ConsistencyError::DuplicateNodePayload { node_id, kind });
        }
    }
    for &node_id in KNOWN_NODE_IDS.iter() {
        if !indexed.contains_key(&node_id) {
            return Err(ConsistencyError::MissingNodePayload { node_id, kind });
        }
    }
    indexed.sort_keys();
    Ok(indexed)
}
