//! Database models shared across DineMap services

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A reviewer's decision on an expansion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Interested,
    NotNow,
    Reject,
}

impl VoteChoice {
    pub const ALL: [VoteChoice; 3] = [
        VoteChoice::Interested,
        VoteChoice::NotNow,
        VoteChoice::Reject,
    ];

    /// Database and URL representation
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Interested => "interested",
            VoteChoice::NotNow => "not_now",
            VoteChoice::Reject => "reject",
        }
    }

    /// Human-facing label used on confirmation pages
    pub fn label(&self) -> &'static str {
        match self {
            VoteChoice::Interested => "Interested",
            VoteChoice::NotNow => "Not Now",
            VoteChoice::Reject => "Reject",
        }
    }

    pub fn parse(s: &str) -> Option<VoteChoice> {
        match s {
            "interested" => Some(VoteChoice::Interested),
            "not_now" => Some(VoteChoice::NotNow),
            "reject" => Some(VoteChoice::Reject),
            _ => None,
        }
    }
}

impl std::fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review workflow state stored on the expansion city
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    NoVotes,
    Pending,
    ConsensusInterested,
    ConsensusNotNow,
    ConsensusReject,
    SplitDecision,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::NoVotes => "no_votes",
            ReviewStatus::Pending => "pending",
            ReviewStatus::ConsensusInterested => "consensus_interested",
            ReviewStatus::ConsensusNotNow => "consensus_not_now",
            ReviewStatus::ConsensusReject => "consensus_reject",
            ReviewStatus::SplitDecision => "split_decision",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewStatus> {
        match s {
            "no_votes" => Some(ReviewStatus::NoVotes),
            "pending" => Some(ReviewStatus::Pending),
            "consensus_interested" => Some(ReviewStatus::ConsensusInterested),
            "consensus_not_now" => Some(ReviewStatus::ConsensusNotNow),
            "consensus_reject" => Some(ReviewStatus::ConsensusReject),
            "split_decision" => Some(ReviewStatus::SplitDecision),
            _ => None,
        }
    }

    /// True for the three unanimous outcomes
    pub fn is_consensus(&self) -> bool {
        matches!(
            self,
            ReviewStatus::ConsensusInterested
                | ReviewStatus::ConsensusNotNow
                | ReviewStatus::ConsensusReject
        )
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roster entry: a person entitled to vote on expansion candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub email: String,
    pub name: String,
}

/// A candidate market under research and review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionCity {
    pub guid: Uuid,
    pub name: String,
    pub state: String,
    /// JSON object mapping scoring category to 0-100 sub-score
    pub sub_scores: Option<String>,
    pub market_potential_score: i64,
    pub restaurant_estimate: Option<i64>,
    pub restaurant_validated: Option<i64>,
    pub bar_estimate: Option<i64>,
    pub bar_validated: Option<i64>,
    pub priority: i64,
    pub review_status: String,
    pub research_summary: Option<String>,
    pub research_notes: Option<String>,
    pub researched_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// Guids are stored as hyphenated TEXT, so the row mapping parses rather
// than letting sqlx decode the column as a blob.
#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for ExpansionCity {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;

        let guid_str: String = row.try_get("guid")?;
        let guid = Uuid::parse_str(&guid_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "guid".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            guid,
            name: row.try_get("name")?,
            state: row.try_get("state")?,
            sub_scores: row.try_get("sub_scores")?,
            market_potential_score: row.try_get("market_potential_score")?,
            restaurant_estimate: row.try_get("restaurant_estimate")?,
            restaurant_validated: row.try_get("restaurant_validated")?,
            bar_estimate: row.try_get("bar_estimate")?,
            bar_validated: row.try_get("bar_validated")?,
            priority: row.try_get("priority")?,
            review_status: row.try_get("review_status")?,
            research_summary: row.try_get("research_summary")?,
            research_notes: row.try_get("research_notes")?,
            researched_at: row.try_get("researched_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl ExpansionCity {
    /// Parsed sub-score map; empty until research has run
    pub fn sub_score_map(&self) -> BTreeMap<String, i64> {
        self.sub_scores
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Typed review status. The schema CHECK keeps the column inside the
    /// enumerated set, so the fallback is unreachable in practice.
    pub fn status(&self) -> ReviewStatus {
        ReviewStatus::parse(&self.review_status).unwrap_or(ReviewStatus::NoVotes)
    }

    /// "Hershey, PA" style display name
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.name, self.state)
    }
}

/// One reviewer's current vote on one city. At most one row exists per
/// (city, reviewer) pair; a repeat vote overwrites in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReviewVote {
    pub city_id: String,
    pub reviewer_email: String,
    pub reviewer_name: Option<String>,
    pub vote: String,
    pub voted_at: String,
}

impl ReviewVote {
    /// Typed vote choice; schema CHECK keeps the column in range
    pub fn choice(&self) -> Option<VoteChoice> {
        VoteChoice::parse(&self.vote)
    }
}
