//! Review consensus evaluation
//!
//! Every vote triggers a full recompute of the city's review status from
//! the current vote set and the recognized reviewer roster. There is no
//! incremental bookkeeping to drift out of sync; the vote rows are the
//! only source of truth.
//!
//! Priority moves only on an actual status transition, so re-clicking a
//! vote link or re-sending an unchanged vote never double-applies a
//! priority delta.

use dinemap_common::db::models::{Reviewer, ReviewStatus, ReviewVote, VoteChoice};

/// Priority for cities that have not been through any review yet
pub const DEFAULT_PRIORITY: i64 = 5;

/// Result of one consensus evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOutcome {
    pub status: ReviewStatus,
    /// Signed priority adjustment; already zeroed when the status did not
    /// change
    pub priority_delta: i64,
}

/// Classify the review state from the roster and the current vote set
///
/// Only votes from roster members count. The roster is the full
/// recognized reviewer list, not just those who have voted; "everyone
/// agrees" means every roster member, so an empty roster can never reach
/// consensus.
pub fn classify(roster: &[Reviewer], votes: &[ReviewVote]) -> ReviewStatus {
    let roster_votes: Vec<VoteChoice> = roster
        .iter()
        .filter_map(|reviewer| {
            votes
                .iter()
                .find(|v| v.reviewer_email == reviewer.email)
                .and_then(|v| v.choice())
        })
        .collect();

    if roster_votes.is_empty() {
        return ReviewStatus::NoVotes;
    }

    if roster_votes.len() < roster.len() {
        return ReviewStatus::Pending;
    }

    let first = roster_votes[0];
    if roster_votes.iter().all(|choice| *choice == first) {
        match first {
            VoteChoice::Interested => ReviewStatus::ConsensusInterested,
            VoteChoice::NotNow => ReviewStatus::ConsensusNotNow,
            VoteChoice::Reject => ReviewStatus::ConsensusReject,
        }
    } else {
        ReviewStatus::SplitDecision
    }
}

/// Priority delta a status carries when first entered
pub fn priority_delta(status: ReviewStatus) -> i64 {
    match status {
        ReviewStatus::ConsensusInterested => 3,
        ReviewStatus::ConsensusNotNow => -2,
        ReviewStatus::ConsensusReject => -5,
        ReviewStatus::NoVotes | ReviewStatus::Pending | ReviewStatus::SplitDecision => 0,
    }
}

/// Evaluate consensus after a vote change
///
/// The delta is the new status's delta only when the status actually
/// transitioned; evaluating an unchanged state yields 0 so application
/// stays idempotent.
pub fn evaluate(
    roster: &[Reviewer],
    votes: &[ReviewVote],
    previous_status: ReviewStatus,
) -> ConsensusOutcome {
    let status = classify(roster, votes);
    let priority_delta = if status != previous_status {
        priority_delta(status)
    } else {
        0
    };

    ConsensusOutcome {
        status,
        priority_delta,
    }
}

/// Apply a delta to a priority, flooring at 0
pub fn clamp_priority(priority: i64) -> i64 {
    priority.max(0)
}

// ============================================================================
// Tests
// ============================================================================
