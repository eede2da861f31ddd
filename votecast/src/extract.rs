use crate::*;
use rayon::prelude::*;
use uuid::Uuid;

/// Canonical snapshot of one verification card set, hashable and
/// comparable byte-for-byte across replicas.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtractedVerificationCardSet {
    /// Recursive hash over (group, election id, card-set id, primes
    /// mapping table, election public key, choice-codes public key).
    pub hash: String,
    pub verification_card_set_id: Uuid,
    pub partial_choice_return_codes_allow_list: Vec<String>,
    pub long_vote_cast_return_code_allow_list: Vec<String>,
}

impl Hashable for ExtractedVerificationCardSet {
    fn to_hash_input(&self) -> HashInput {
        HashInput::List(vec![
            HashInput::text(self.hash.clone()),
            HashInput::uuid(&self.verification_card_set_id),
            HashInput::List(
                self.partial_choice_return_codes_allow_list
                    .iter()
                    .map(|entry| HashInput::text(entry.as_str()))
                    .collect(),
            ),
            HashInput::List(
                self.long_vote_cast_return_code_allow_list
                    .iter()
                    .map(|entry| HashInput::text(entry.as_str()))
                    .collect(),
            ),
        ])
    }
}

/// Canonical snapshot of a replica's view of one election event.
///
/// The card-set order (ascending by card-set id) is an invariant, not an
/// implementation detail: cross-replica comparison requires byte-identical
/// ordering. The constructor sorts and rejects duplicates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtractedElectionEvent {
    pub context_hash: String,
    pub encryption_group: EncryptionGroup,
    pub election_event_id: Uuid,
    pub verification_card_sets: Vec<ExtractedVerificationCardSet>,
}

impl ExtractedElectionEvent {
    pub fn new(
        context_hash: String,
        encryption_group: EncryptionGroup,
        election_event_id: Uuid,
        mut verification_card_sets: Vec<ExtractedVerificationCardSet>,
    ) -> Result<Self, ValidationError> {
        verification_card_sets.sort_by_key(|set| set.verification_card_set_id);
        for window in verification_card_sets.windows(2) {
            if window[0].verification_card_set_id == window[1].verification_card_set_id {
                return Err(ValidationError::DuplicateVerificationCardSetId(
                    window[0].verification_card_set_id,
                ));
            }
        }
        Ok(ExtractedElectionEvent {
            context_hash,
            encryption_group,
            election_event_id,
            verification_card_sets,
        })
    }
}

impl Hashable for ExtractedElectionEvent {
    fn to_hash_input(&self) -> HashInput {
        HashInput::List(vec![
            HashInput::text(self.context_hash.clone()),
            self.encryption_group.to_hash_input(),
            HashInput::uuid(&self.election_event_id),
            HashInput::List(
                self.verification_card_sets
                    .iter()
                    .map(Hashable::to_hash_input)
                    .collect(),
            ),
        ])
    }
}

/// Canonical snapshot of one sent vote.
///
/// The share vector is empty while the vote is unconfirmed, and carries
/// exactly one hashed long-code share per node once confirmed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExtractedVerificationCard {
    pub verification_card_id: Uuid,
    pub verification_card_set_id: Uuid,
    pub encrypted_vote: Ciphertext,
    pub hashed_long_vote_cast_return_code_shares: Vec<String>,
}

impl ExtractedVerificationCard {
    pub fn new(
        verification_card_id: Uuid,
        verification_card_set_id: Uuid,
        encrypted_vote: Ciphertext,
        hashed_long_vote_cast_return_code_shares: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let count = hashed_long_vote_cast_return_code_shares.len();
        if count != 0 && count != NODE_COUNT {
            return Err(ValidationError::ShareCountMismatch {
                verification_card_id,
                count,
                expected: NODE_COUNT,
            });
        }
        for share in &hashed_long_vote_cast_return_code_shares {
            validate_share_b64(share)?;
        }
        Ok(ExtractedVerificationCard {
            verification_card_id,
            verification_card_set_id,
            encrypted_vote,
            hashed_long_vote_cast_return_code_shares,
        })
    }
}

/// Turns locally stored election and vote state into ordered, hashable
/// snapshots. Pure reads; no side effects.
pub struct CanonicalExtractor<R> {
    repository: R,
    config: ExtractorConfig,
}

impl<R: ElectionEventRepository + Sync> CanonicalExtractor<R> {
    pub fn new(repository: R, config: ExtractorConfig) -> Self {
        CanonicalExtractor { repository, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract this replica's canonical view of an election event.
    pub fn extract_election_event(
        &self,
        election_event_id: &str,
    ) -> Result<ExtractedElectionEvent, Error> {
        let election_event_id = parse_election_event_id(election_event_id)?;
        let context = self
            .repository
            .get_election_event_context(election_event_id)
            .ok_or(Error::ElectionEventNotFound(election_event_id))?;

        let context_hash = context_hash(&context);

        // Card sets are independent; hash them in parallel.
        let card_sets = context
            .verification_card_set_contexts
            .par_iter()
            .map(|card_set| self.extract_card_set(&context, card_set))
            .collect::<Result<Vec<_>, Error>>()?;

        let extracted = ExtractedElectionEvent::new(
            context_hash,
            context.encryption_group.clone(),
            election_event_id,
            card_sets,
        )?;
        log::debug!(
            "extracted election event {} with {} card sets",
            election_event_id,
            extracted.verification_card_sets.len()
        );
        Ok(extracted)
    }

    fn extract_card_set(
        &self,
        context: &ElectionEventContext,
        card_set: &VerificationCardSetContext,
    ) -> Result<ExtractedVerificationCardSet, Error> {
        let group = &context.encryption_group;
        check_public_key(
            group,
            card_set.verification_card_set_id,
            "election public key",
            &card_set.election_public_key,
            self.config.max_write_ins_plus_one,
        )?;
        check_public_key(
            group,
            card_set.verification_card_set_id,
            "choice return codes public key",
            &card_set.choice_return_codes_public_key,
            self.config.max_selections,
        )?;

        let hash_input = HashInput::List(vec![
            group.to_hash_input(),
            HashInput::uuid(&context.election_event_id),
            HashInput::uuid(&card_set.verification_card_set_id),
            HashInput::List(
                card_set
                    .primes_mapping_table
                    .iter()
                    .cloned()
                    .map(HashInput::Int)
                    .collect(),
            ),
            HashInput::List(
                card_set
                    .election_public_key
                    .iter()
                    .map(Hashable::to_hash_input)
                    .collect(),
            ),
            HashInput::List(
                card_set
                    .choice_return_codes_public_key
                    .iter()
                    .map(Hashable::to_hash_input)
                    .collect(),
            ),
        ]);

        Ok(ExtractedVerificationCardSet {
            hash: base64::encode(recursive_hash(&hash_input)),
            verification_card_set_id: card_set.verification_card_set_id,
            partial_choice_return_codes_allow_list: card_set
                .partial_choice_return_codes_allow_list
                .clone(),
            long_vote_cast_return_code_allow_list: card_set
                .long_vote_cast_return_code_allow_list
                .clone(),
        })
    }

    /// Extract every sent vote, attaching the hashed long-code shares for
    /// votes this replica has marked confirmed. Sorted by card id.
    pub fn extract_verification_cards<V>(
        &self,
        election_event_id: &str,
        votes: &V,
    ) -> Result<Vec<ExtractedVerificationCard>, Error>
    where
        V: VoteRepository + ConfirmedVoteStore,
    {
        let election_event_id = parse_election_event_id(election_event_id)?;

        let mut cards = Vec::new();
        for vote in votes.get_sent_votes(election_event_id) {
            let shares = if votes.is_confirmed(election_event_id, vote.verification_card_id) {
                vote.hashed_long_vote_cast_return_code_shares.clone()
            } else {
                vec![]
            };
            cards.push(ExtractedVerificationCard::new(
                vote.verification_card_id,
                vote.verification_card_set_id,
                vote.encrypted_vote.clone(),
                shares,
            )?);
        }

        cards.sort_by_key(|card| card.verification_card_id);
        for window in cards.windows(2) {
            if window[0].verification_card_id == window[1].verification_card_id {
                return Err(ValidationError::DuplicateVerificationCardId(
                    window[0].verification_card_id,
                )
                .into());
            }
        }
        Ok(cards)
    }
}

/// Hash of the election event context proper, computed once per
/// extraction: group, election id, finish time and the ordered card-set
/// ids.
pub fn context_hash(context: &ElectionEventContext) -> String {
    let mut card_set_ids: Vec<Uuid> = context
        .verification_card_set_contexts
        .iter()
        .map(|c| c.verification_card_set_id)
        .collect();
    card_set_ids.sort();

    let input = HashInput::List(vec![
        context.encryption_group.to_hash_input(),
        HashInput::uuid(&context.election_event_id),
        HashInput::text(context.finish_time.clone()),
        HashInput::List(card_set_ids.iter().map(HashInput::uuid).collect()),
    ]);
    base64::encode(recursive_hash(&input))
}

fn check_public_key(
    group: &EncryptionGroup,
    verification_card_set_id: Uuid,
    key: &'static str,
    elements: &[GroupElement],
    max: usize,
) -> Result<(), ValidationError> {
    if elements.len() > max {
        return Err(ValidationError::PublicKeyTooLong {
            verification_card_set_id,
            key,
            len: elements.len(),
            max,
        });
    }
    for element in elements {
        if !group.contains(element) {
            return Err(ValidationError::KeyElementOutsideGroup {
                verification_card_set_id,
                key,
            });
        }
    }
    Ok(())
}
