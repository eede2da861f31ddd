use crate::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use uuid::Uuid;

/// Lookup of election event contexts.
pub trait ElectionEventRepository {
    fn get_election_event_context(&self, election_event_id: Uuid) -> Option<ElectionEventContext>;
}

/// A vote recorded as sent on this node, with the hashed long-code shares
/// exchanged at confirmation time (empty until the vote is confirmed).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SentVote {
    pub verification_card_id: Uuid,
    pub verification_card_set_id: Uuid,
    pub encrypted_vote: Ciphertext,
    pub hashed_long_vote_cast_return_code_shares: Vec<String>,
}

/// Lookup of sent votes.
pub trait VoteRepository {
    fn get_sent_votes(&self, election_event_id: Uuid) -> Vec<SentVote>;
}

/// The per-node confirmed-vote set. Append-only; mutated exclusively by
/// the vote confirmation agreement, batch commits atomic to readers.
pub trait ConfirmedVoteStore {
    fn is_sent(&self, election_event_id: Uuid, verification_card_id: Uuid) -> bool;
    fn is_confirmed(&self, election_event_id: Uuid, verification_card_id: Uuid) -> bool;
    fn confirm_all(&self, election_event_id: Uuid, verification_card_ids: &[Uuid]);
}

/// Return-codes mapping table: derived key to base64 authenticated
/// ciphertext of the short vote-cast return code. Write-once at setup.
pub trait MappingTableAccessor {
    fn get(&self, key: &str) -> Option<String>;
}

/// A simple repository that uses an in-memory BTreeMap
#[derive(Default)]
pub struct MemElectionEventRepository {
    inner: RwLock<BTreeMap<Uuid, ElectionEventContext>>,
}

impl MemElectionEventRepository {
    pub fn set(&self, context: ElectionEventContext) {
        let mut inner = self.inner.write().unwrap();
        inner.insert(context.election_event_id, context);
    }
}

impl ElectionEventRepository for MemElectionEventRepository {
    fn get_election_event_context(&self, election_event_id: Uuid) -> Option<ElectionEventContext> {
        self.inner.read().unwrap().get(&election_event_id).cloned()
    }
}

/// In-memory sent/confirmed vote state for one node.
#[derive(Default)]
pub struct MemVoteStore {
    sent: RwLock<BTreeMap<Uuid, Vec<SentVote>>>,
    confirmed: RwLock<BTreeMap<Uuid, BTreeSet<Uuid>>>,
}

impl MemVoteStore {
    pub fn record_sent_vote(&self, election_event_id: Uuid, vote: SentVote) {
        let mut sent = self.sent.write().unwrap();
        sent.entry(election_event_id).or_default().push(vote);
    }
}

impl VoteRepository for MemVoteStore {
    fn get_sent_votes(&self, election_event_id: Uuid) -> Vec<SentVote> {
        self.sent
            .read()
            .unwrap()
            .get(&election_event_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl ConfirmedVoteStore for MemVoteStore {
    fn is_sent(&self, election_event_id: Uuid, verification_card_id: Uuid) -> bool {
        self.sent
            .read()
            .unwrap()
            .get(&election_event_id)
            .map(|votes| votes.iter().any(|v| v.verification_card_id == verification_card_id))
            .unwrap_or(false)
    }

    fn is_confirmed(&self, election_event_id: Uuid, verification_card_id: Uuid) -> bool {
        self.confirmed
            .read()
            .unwrap()
            .get(&election_event_id)
            .map(|set| set.contains(&verification_card_id))
            .unwrap_or(false)
    }

    fn confirm_all(&self, election_event_id: Uuid, verification_card_ids: &[Uuid]) {
        // Single write lock for the whole batch: a reader never observes
        // a partially applied batch.
        let mut confirmed = self.confirmed.write().unwrap();
        let set = confirmed.entry(election_event_id).or_default();
        set.extend(verification_card_ids.iter().copied());
    }
}

/// In-memory return-codes mapping table.
#[derive(Default)]
pub struct MemMappingTable {
    inner: RwLock<BTreeMap<String, String>>,
}

impl MemMappingTable {
    pub fn put(&self, key: String, value: String) {
        self.inner.write().unwrap().insert(key, value);
    }
}

impl MappingTableAccessor for MemMappingTable {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.read().unwrap().get(key).cloned()
    }
}

impl<T: ElectionEventRepository> ElectionEventRepository for std::sync::Arc<T> {
    fn get_election_event_context(&self, election_event_id: Uuid) -> Option<ElectionEventContext> {
        (**self).get_election_event_context(election_event_id)
    }
}
