use crate::*;
use indexmap::IndexMap;
use uuid::Uuid;

/// Context for one replica's confirmation-agreement run: who we are,
/// which election event, and our own long-code allow list per card set.
#[derive(Debug, Clone)]
pub struct UpdateConfirmedVotingCardsContext {
    node_id: NodeId,
    election_event_id: Uuid,
    long_vote_cast_return_code_allow_lists: IndexMap<Uuid, Vec<String>>,
}

impl UpdateConfirmedVotingCardsContext {
    pub fn new(
        node_id: NodeId,
        election_event_id: Uuid,
        long_vote_cast_return_code_allow_lists: IndexMap<Uuid, Vec<String>>,
    ) -> Result<Self, ValidationError> {
        if long_vote_cast_return_code_allow_lists.is_empty() {
            return Err(ValidationError::EmptyAllowListMap);
        }
        for allow_list in long_vote_cast_return_code_allow_lists.values() {
            for entry in allow_list {
                validate_share_b64(entry)?;
            }
        }
        Ok(UpdateConfirmedVotingCardsContext {
            node_id,
            election_event_id,
            long_vote_cast_return_code_allow_lists,
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    pub fn election_event_id(&self) -> Uuid {
        self.election_event_id
    }
}

/// Per-card context handed to the agreement check.
pub struct AgreementContext<'a> {
    pub election_event_id: Uuid,
    pub verification_card_set_id: Uuid,
    pub verification_card_id: Uuid,
    pub long_vote_cast_return_code_allow_list: &'a [String],
}

/// Per-card input: the resolver-supplied share vector.
pub struct AgreementInput<'a> {
    pub hashed_long_vote_cast_return_code_shares: &'a [String],
}

/// The confirmation decision rule.
///
/// The exact rule belongs to the surrounding voting protocol; the
/// default implementation below checks allow-list membership of the
/// hashed share vector.
pub trait ConfirmVoteAgreement {
    fn agree(&self, context: &AgreementContext, input: &AgreementInput) -> bool;
}

/// Default rule: the recursive hash of the 4-share vector must be a
/// member of the replica's long-code allow list for the card set.
#[derive(Debug, Default, Copy, Clone)]
pub struct AllowListAgreement;

impl ConfirmVoteAgreement for AllowListAgreement {
    fn agree(&self, context: &AgreementContext, input: &AgreementInput) -> bool {
        let digest = base64::encode(recursive_hash(&HashInput::List(
            input
                .hashed_long_vote_cast_return_code_shares
                .iter()
                .map(|share| HashInput::text(share.as_str()))
                .collect(),
        )));
        context
            .long_vote_cast_return_code_allow_list
            .iter()
            .any(|entry| entry == &digest)
    }
}

/// Apply a resolved batch to this replica's confirmed-vote set.
///
/// Sequential with early exit: a card never recorded as sent, a card set
/// missing from the allow-list map, or a failed agreement aborts the
/// whole batch with no state mutated. Already-confirmed cards are
/// idempotent skips, so re-delivering a batch is always safe. Successful
/// entries are staged and committed in a single atomic `confirm_all`.
///
/// Returns the number of newly confirmed cards.
pub fn update_confirmed_voting_cards<S, A>(
    context: &UpdateConfirmedVotingCardsContext,
    agreement: &A,
    store: &S,
    resolved_votes: &[ResolvedConfirmedVote],
) -> Result<usize, Error>
where
    S: ConfirmedVoteStore,
    A: ConfirmVoteAgreement,
{
    let election_event_id = context.election_event_id;
    let mut to_confirm = Vec::new();

    for vote in resolved_votes {
        if !store.is_sent(election_event_id, vote.verification_card_id) {
            return Err(Error::CardNotSent(vote.verification_card_id));
        }
        if store.is_confirmed(election_event_id, vote.verification_card_id) {
            continue;
        }

        let allow_list = context
            .long_vote_cast_return_code_allow_lists
            .get(&vote.verification_card_set_id)
            .ok_or(Error::MissingAllowList(vote.verification_card_set_id))?;

        let agreement_context = AgreementContext {
            election_event_id,
            verification_card_set_id: vote.verification_card_set_id,
            verification_card_id: vote.verification_card_id,
            long_vote_cast_return_code_allow_list: allow_list,
        };
        let agreement_input = AgreementInput {
            hashed_long_vote_cast_return_code_shares: &vote
                .hashed_long_vote_cast_return_code_shares,
        };

        if !agreement.agree(&agreement_context, &agreement_input) {
            return Err(Error::AgreementFailed(vote.verification_card_id));
        }
        to_confirm.push(vote.verification_card_id);
    }

    store.confirm_all(election_event_id, &to_confirm);
    log::info!(
        "node {}: confirmed {} of {} resolved votes for election event {}",
        context.node_id,
        to_confirm.len(),
        resolved_votes.len(),
        election_event_id
    );
    Ok(to_confirm.len())
}
