//! Field consistency rules
//!
//! Applied after a transaction has been verified and its event decoded, and
//! before anything is written. Each rule maps to one distinct rejection:
//!
//! | Rule | Rejection |
//! |------|-----------|
//! | sender signed the tx as the decoded actor | `FieldMismatch` |
//! | caller's linked wallet is the decoded actor | `FieldMismatch` / `NotAuthenticated` |
//! | submitted text/number equals the decoded one | `FieldMismatch` |
//! | entity is in the required status | `StatePrecondition` |
//! | actor has not voted yet | `StatePrecondition` |
//! | actor is not the item's creator | `StatePrecondition` |

use alloy_primitives::Address;
use std::fmt::Display;

use crate::error::{DaoError, DaoResult, Precondition};
use crate::types::CanonicalAddress;

/// `receipt.from` must be the actor named in the event
pub fn ensure_sender_is_actor(sender: &Address, actor: &Address, role: &str) -> DaoResult<()> {
    if sender != actor {
        return Err(DaoError::FieldMismatch {
            field: role.to_string(),
            detail: format!(
                "transaction sent by {} but event names {} as {}",
                sender.canonical(),
                actor.canonical(),
                role
            ),
        });
    }
    Ok(())
}

/// The caller's linked wallet must be the actor named in the event
pub fn ensure_caller_is_actor(
    caller_wallet: Option<&Address>,
    actor: &Address,
    role: &str,
) -> DaoResult<()> {
    let wallet = caller_wallet
        .ok_or_else(|| DaoError::NotAuthenticated("no wallet linked to this account".to_string()))?;
    if wallet != actor {
        return Err(DaoError::FieldMismatch {
            field: role.to_string(),
            detail: format!(
                "event names {} as {} but caller's wallet is {}",
                actor.canonical(),
                role,
                wallet.canonical()
            ),
        });
    }
    Ok(())
}

/// Submitted text must equal the on-chain string exactly
pub fn ensure_text_matches(field: &str, submitted: &str, on_chain: &str) -> DaoResult<()> {
    if submitted != on_chain {
        return Err(DaoError::field_mismatch(field, on_chain, submitted));
    }
    Ok(())
}

/// Submitted value must equal the decoded one
pub fn ensure_value_matches<T>(field: &str, submitted: &T, on_chain: &T) -> DaoResult<()>
where
    T: PartialEq + Display,
{
    if submitted != on_chain {
        return Err(DaoError::field_mismatch(field, on_chain, submitted));
    }
    Ok(())
}

/// Entity must currently be in `expected`
pub fn ensure_status(entity: &str, actual: &str, expected: &str) -> DaoResult<()> {
    if actual != expected {
        return Err(Precondition::UnexpectedStatus {
            entity: entity.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Voter must not already appear in the voter set
pub fn ensure_not_voted(entity: &str, voters: &[String], voter: &Address) -> DaoResult<()> {
    let key = voter.canonical();
    if voters.iter().any(|v| v == &key) {
        return Err(Precondition::AlreadyVoted {
            entity: entity.to_string(),
            voter: key,
        }
        .into());
    }
    Ok(())
}

/// Creator may not vote on their own item
pub fn ensure_not_creator(entity: &str, creator: &Address, voter: &Address) -> DaoResult<()> {
    if creator == voter {
        return Err(Precondition::SelfVote {
            entity: entity.to_string(),
            actor: voter.canonical(),
        }
        .into());
    }
    Ok(())
}

/// Persisted state of a votable item, as read before applying a vote
#[derive(Debug, Clone)]
pub struct VoteTarget<'a> {
    /// Human label, e.g. `proposal 7`
    pub label: &'a str,
    pub status: &'a str,
    pub creator: &'a Address,
    pub voters: &'a [String],
}

/// Status, self-vote and duplicate-vote gates in one pass
pub fn check_vote_preconditions(target: &VoteTarget<'_>, voter: &Address) -> DaoResult<()> {
    ensure_status(target.label, target.status, "pending")?;
    ensure_not_creator(target.label, target.creator, voter)?;
    ensure_not_voted(target.label, target.voters, voter)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    #[test]
    fn test_sender_must_be_actor() {
        assert!(ensure_sender_is_actor(&ALICE, &ALICE, "voter").is_ok());
        let err = ensure_sender_is_actor(&BOB, &ALICE, "voter").unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { ref field, .. } if field == "voter"));
    }

    #[test]
    fn test_caller_without_wallet_is_unauthenticated() {
        let err = ensure_caller_is_actor(None, &ALICE, "voter").unwrap_err();
        assert!(matches!(err, DaoError::NotAuthenticated(_)));

        let err = ensure_caller_is_actor(Some(&BOB), &ALICE, "voter").unwrap_err();
        assert!(matches!(err, DaoError::FieldMismatch { .. }));
    }

    #[test]
    fn test_text_is_exact() {
        assert!(ensure_text_matches("title", "Budget", "Budget").is_ok());
        assert!(ensure_text_matches("title", "Budget!!", "Budget").is_err());
        assert!(ensure_text_matches("title", "budget", "Budget").is_err());
    }

    #[test]
    fn test_vote_preconditions_are_distinct() {
        let voters = vec![BOB.canonical()];
        let target = VoteTarget {
            label: "proposal 7",
            status: "pending",
            creator: &ALICE,
            voters: &voters,
        };

        let self_vote = check_vote_preconditions(&target, &ALICE).unwrap_err();
        assert!(matches!(
            self_vote,
            DaoError::StatePrecondition(Precondition::SelfVote { .. })
        ));

        let duplicate = check_vote_preconditions(&target, &BOB).unwrap_err();
        assert!(matches!(
            duplicate,
            DaoError::StatePrecondition(Precondition::AlreadyVoted { .. })
        ));

        let closed = VoteTarget {
            status: "approved",
            ..target.clone()
        };
        let not_pending = check_vote_preconditions(&closed, &BOB).unwrap_err();
        assert!(matches!(
            not_pending,
            DaoError::StatePrecondition(Precondition::UnexpectedStatus { .. })
        ));
    }

    #[test]
    fn test_fresh_voter_passes() {
        let voters: Vec<String> = Vec::new();
        let target = VoteTarget {
            label: "claim 3",
            status: "pending",
            creator: &ALICE,
            voters: &voters,
        };
        assert!(check_vote_preconditions(&target, &BOB).is_ok());
    }
}
