//! Entity status and classification enums
//!
//! On-chain modules encode enums as `uint8` indexes; the document store keeps
//! the symbolic names. Conversions live here so both sides agree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of entity mirrored from the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Dao,
    Proposal,
    Claim,
    Task,
    Event,
    Document,
    Announcement,
}

impl EntityKind {
    /// Name of the collection holding this kind under its DAO
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Dao => "daos",
            Self::Proposal => "proposals",
            Self::Claim => "claims",
            Self::Task => "tasks",
            Self::Event => "events",
            Self::Document => "documents",
            Self::Announcement => "announcements",
        }
    }

    /// Document field carrying the numeric chain id
    pub fn id_field(&self) -> &'static str {
        match self {
            Self::Dao => "daoAddress",
            Self::Proposal => "proposalId",
            Self::Claim => "claimId",
            Self::Task => "taskId",
            Self::Event => "eventId",
            Self::Document => "documentId",
            Self::Announcement => "announcementId",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dao => "dao",
            Self::Proposal => "proposal",
            Self::Claim => "claim",
            Self::Task => "task",
            Self::Event => "event",
            Self::Document => "document",
            Self::Announcement => "announcement",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Voting status of proposals and claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Pending,
    Approved,
    Rejected,
}

impl VoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Status reached when a finalization event reports the outcome
    pub fn finalized(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Rejected
        }
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Submitted vote direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Approve,
    Reject,
}

impl VoteChoice {
    pub fn is_approve(&self) -> bool {
        matches!(self, Self::Approve)
    }

    pub fn from_bool(approve: bool) -> Self {
        if approve {
            Self::Approve
        } else {
            Self::Reject
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task workflow status (`uint8` on chain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Backlog),
            1 => Some(Self::Todo),
            2 => Some(Self::InProgress),
            3 => Some(Self::Completed),
            4 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "BACKLOG",
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Task priority (`uint8` on chain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Urgent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

/// Announcement category (`uint8` on chain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnouncementType {
    General,
    Urgent,
    Info,
}

impl AnnouncementType {
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(Self::General),
            1 => Some(Self::Urgent),
            2 => Some(Self::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Urgent => "URGENT",
            Self::Info => "INFO",
        }
    }
}

/// Role of a DAO member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Member => "Member",
        }
    }
}

/// Join request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Redirect-flow session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFlowStatus {
    Started,
    Completed,
}

impl PaymentFlowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_mappings() {
        assert_eq!(TaskStatus::from_index(2), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::from_index(5), None);
        assert_eq!(TaskPriority::from_index(3).map(|p| p.as_str()), Some("URGENT"));
        assert_eq!(AnnouncementType::from_index(1), Some(AnnouncementType::Urgent));
        assert_eq!(AnnouncementType::from_index(3), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::InProgress).unwrap(),
            serde_json::json!("IN_PROGRESS")
        );
        assert_eq!(
            serde_json::to_value(MemberRole::Admin).unwrap(),
            serde_json::json!("Admin")
        );
        let choice: VoteChoice = serde_json::from_str("\"reject\"").unwrap();
        assert!(!choice.is_approve());
    }

    #[test]
    fn test_finalized_status() {
        assert_eq!(VoteStatus::finalized(true), VoteStatus::Approved);
        assert_eq!(VoteStatus::finalized(false).as_str(), "rejected");
    }
}
