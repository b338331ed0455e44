//! Quorum rules.
//!
//! Pure functions over a vote's tally. A vote passes once enough ballots are
//! in favor, and fails as soon as passing is arithmetically out of reach, so
//! nobody waits on stragglers when the outcome is already settled.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabletop_core::error::DomainError;

use super::aggregates::AbsenteeVote;
use super::events::{VoteStatus, VoteTally};

/// What the ballots say about a vote right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumOutcome {
    /// Neither side has settled the vote.
    StillActive,
    /// Enough ballots are in favor.
    Pass,
    /// Passing can no longer happen.
    Fail,
}

/// How a tie on cast ballots is settled at the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The vote expires and nothing happens.
    #[default]
    Expire,
    /// The vote passes.
    Pass,
}

/// How a vote still undecided at its deadline is settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum ExpiryPolicy {
    /// Only a met quorum passes. Undecided votes expire.
    #[default]
    Strict,
    /// The side with more cast ballots wins; a tie is settled by `tie`.
    Plurality {
        /// Settlement for equal counts.
        tie: TieBreak,
    },
}

impl FromStr for ExpiryPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "plurality" => Ok(Self::Plurality {
                tie: TieBreak::Expire,
            }),
            "plurality-pass-ties" => Ok(Self::Plurality {
                tie: TieBreak::Pass,
            }),
            other => Err(DomainError::Validation(format!(
                "unknown expiry policy '{other}' (expected strict, plurality or plurality-pass-ties)"
            ))),
        }
    }
}

/// Ballots in favor needed to pass: `threshold` percent of `eligible`,
/// rounded up, never below one and never above `eligible`.
#[must_use]
pub fn required_votes(eligible: usize, threshold: u8) -> usize {
    if eligible == 0 {
        return 0;
    }
    let scaled = eligible * usize::from(threshold);
    scaled.div_ceil(100).clamp(1, eligible)
}

/// Evaluates `vote` against its quorum.
#[must_use]
pub fn evaluate(vote: &AbsenteeVote) -> QuorumOutcome {
    evaluate_tally(&vote.tally())
}

/// Evaluates a tally against its quorum.
#[must_use]
pub fn evaluate_tally(tally: &VoteTally) -> QuorumOutcome {
    if tally.votes_for >= tally.required_votes {
        return QuorumOutcome::Pass;
    }
    // Once this many are against, the remaining voters cannot reach quorum.
    let blocking = tally.eligible - tally.required_votes + 1;
    if tally.votes_against >= blocking {
        QuorumOutcome::Fail
    } else {
        QuorumOutcome::StillActive
    }
}

/// Terminal status for `vote` once its deadline has passed.
#[must_use]
pub fn evaluate_at_expiry(vote: &AbsenteeVote, policy: ExpiryPolicy) -> VoteStatus {
    expiry_status(&vote.tally(), policy)
}

/// Terminal status for a tally once its deadline has passed.
#[must_use]
pub fn expiry_status(tally: &VoteTally, policy: ExpiryPolicy) -> VoteStatus {
    match evaluate_tally(tally) {
        QuorumOutcome::Pass => return VoteStatus::Passed,
        QuorumOutcome::Fail => return VoteStatus::Failed,
        QuorumOutcome::StillActive => {}
    }
    if tally.votes_for + tally.votes_against == 0 {
        return VoteStatus::Expired;
    }
    match policy {
        ExpiryPolicy::Strict => VoteStatus::Expired,
        ExpiryPolicy::Plurality { tie } => match tally.votes_for.cmp(&tally.votes_against) {
            std::cmp::Ordering::Greater => VoteStatus::Passed,
            std::cmp::Ordering::Less => VoteStatus::Failed,
            std::cmp::Ordering::Equal => match tie {
                TieBreak::Expire => VoteStatus::Expired,
                TieBreak::Pass => VoteStatus::Passed,
            },
        },
    }
}
