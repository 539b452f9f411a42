//! Data Transfer Objects for API requests and responses
//!
//! Request bodies arrive with loosely typed fields (hex strings, decimal
//! strings). Each `into_*` method validates the shape and produces the typed
//! payload the services take; shape errors become `Validation` (400).

use alloy_primitives::{B256, U256};
use dao_core::{parse_amount, parse_tx_hash, AnnouncementType, DaoError, DaoResult, TaskPriority, VoteChoice};
use dao_db::services::{
    AnnouncementUpdate, EventUpdate, NewAnnouncement, NewCalendarEvent, NewClaim, NewDao,
    NewDocument, NewProposal, NewTask, TaskUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn required(field: &str, value: &str) -> DaoResult<String> {
    if value.trim().is_empty() {
        return Err(DaoError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Amount given as a decimal string or a JSON integer
fn amount_from(value: &Value) -> DaoResult<U256> {
    match value {
        Value::String(s) => parse_amount("amount", s),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| DaoError::validation(format!("amount must be a non-negative integer: {}", n))),
        other => Err(DaoError::validation(format!("amount must be a decimal string: {}", other))),
    }
}

// ============ Common DTOs ============

/// Body of actions that carry nothing but the transaction
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub tx_hash: String,
}

impl TxRequest {
    pub fn tx_hash(&self) -> DaoResult<B256> {
        parse_tx_hash(&self.tx_hash)
    }
}

/// Wraps a response body with `success: true`
#[derive(Debug, Serialize)]
pub struct Ack<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Ack<T> {
    pub fn new(body: T) -> Self {
        Self { success: true, body }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ============ DAO DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDaoRequest {
    pub tx_hash: String,
    pub metadata: Value,
    #[serde(default)]
    pub modules: Value,
}

impl CreateDaoRequest {
    pub fn into_new_dao(self) -> DaoResult<(B256, NewDao)> {
        if !self.metadata.is_object() {
            return Err(DaoError::validation("metadata must be an object"));
        }
        let modules = match self.modules {
            Value::Null => Value::Object(Default::default()),
            Value::Object(map) => Value::Object(map),
            _ => return Err(DaoError::validation("modules must be an object")),
        };
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewDao {
                metadata: self.metadata,
                modules,
            },
        ))
    }
}

// ============ Proposal / Claim DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub tx_hash: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl CreateProposalRequest {
    pub fn into_new_proposal(self) -> DaoResult<(B256, NewProposal)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewProposal {
                title: required("title", &self.title)?,
                description: self.description,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClaimRequest {
    pub tx_hash: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: Value,
}

impl CreateClaimRequest {
    pub fn into_new_claim(self) -> DaoResult<(B256, NewClaim)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewClaim {
                title: required("title", &self.title)?,
                description: self.description,
                amount: amount_from(&self.amount)?,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub tx_hash: String,
    pub vote_type: VoteChoice,
}

// ============ Task DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub tx_hash: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<TaskPriority>,
    /// Unix seconds
    pub due_date: Option<u64>,
}

impl CreateTaskRequest {
    pub fn into_new_task(self) -> DaoResult<(B256, NewTask)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewTask {
                title: required("title", &self.title)?,
                description: self.description,
                priority: self.priority.unwrap_or(TaskPriority::Medium),
                due_date: self.due_date,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskStatusRequest {
    pub tx_hash: String,
    /// On-chain status index, 0 (backlog) through 4 (cancelled)
    pub new_status: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub tx_hash: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<u64>,
}

impl UpdateTaskRequest {
    pub fn into_update(self) -> DaoResult<(B256, TaskUpdate)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            TaskUpdate {
                title: required("title", &self.title)?,
                description: self.description,
                priority: self.priority,
                due_date: self.due_date,
            },
        ))
    }
}

// ============ Calendar DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub tx_hash: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub location: Option<String>,
}

impl CreateEventRequest {
    pub fn into_new_event(self) -> DaoResult<(B256, NewCalendarEvent)> {
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(DaoError::validation("endTime must not precede startTime"));
            }
        }
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewCalendarEvent {
                title: required("title", &self.title)?,
                description: self.description,
                start_time: self.start_time,
                end_time: self.end_time,
                location: self.location,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub tx_hash: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub location: Option<String>,
}

impl UpdateEventRequest {
    pub fn into_update(self) -> DaoResult<(B256, EventUpdate)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            EventUpdate {
                title: required("title", &self.title)?,
                description: self.description,
                start_time: self.start_time,
                end_time: self.end_time,
                location: self.location,
            },
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<usize>,
}

// ============ Document DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub tx_hash: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ipfs_hash: String,
    pub required_signers: u64,
}

impl CreateDocumentRequest {
    pub fn into_new_document(self) -> DaoResult<(B256, NewDocument)> {
        if self.required_signers == 0 {
            return Err(DaoError::validation("requiredSigners must be at least 1"));
        }
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewDocument {
                title: required("title", &self.title)?,
                description: self.description,
                ipfs_hash: required("ipfsHash", &self.ipfs_hash)?,
                required_signers: self.required_signers,
            },
        ))
    }
}

// ============ Announcement DTOs ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnouncementRequest {
    pub tx_hash: String,
    pub title: String,
    pub content: String,
    pub announcement_type: Option<AnnouncementType>,
    /// Unix seconds
    pub expires_at: Option<u64>,
}

impl CreateAnnouncementRequest {
    pub fn into_new_announcement(self) -> DaoResult<(B256, NewAnnouncement)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            NewAnnouncement {
                title: required("title", &self.title)?,
                content: self.content,
                announcement_type: self.announcement_type,
                expires_at: self.expires_at,
            },
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnnouncementRequest {
    pub tx_hash: String,
    pub title: String,
    pub content: Option<String>,
    pub expires_at: Option<u64>,
}

impl UpdateAnnouncementRequest {
    pub fn into_update(self) -> DaoResult<(B256, AnnouncementUpdate)> {
        Ok((
            parse_tx_hash(&self.tx_hash)?,
            AnnouncementUpdate {
                title: required("title", &self.title)?,
                content: self.content,
                expires_at: self.expires_at,
            },
        ))
    }
}

// ============ Member DTOs ============

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequestsQuery {
    pub status: Option<String>,
}

// ============ User DTOs ============

#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    pub address: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub address: String,
}

// ============ Payment DTOs ============

/// Field names follow the provider's snake_case convention
#[derive(Debug, Deserialize)]
pub struct ConfirmFlowRequest {
    pub redirect_flow_id: String,
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TX: &str = "0xabababababababababababababababababababababababababababababababab";

    #[test]
    fn test_claim_amount_accepts_string_and_number() {
        let request: CreateClaimRequest = serde_json::from_value(json!({
            "txHash": TX,
            "title": "Reimburse venue",
            "amount": "1000000000000000000000000000000"
        }))
        .unwrap();
        let (_, claim) = request.into_new_claim().unwrap();
        assert_eq!(claim.amount.to_string(), "1000000000000000000000000000000");

        let request: CreateClaimRequest = serde_json::from_value(json!({
            "txHash": TX, "title": "Snacks", "amount": 42
        }))
        .unwrap();
        assert_eq!(request.into_new_claim().unwrap().1.amount, U256::from(42));

        let request: CreateClaimRequest = serde_json::from_value(json!({
            "txHash": TX, "title": "Snacks", "amount": -1
        }))
        .unwrap();
        assert!(matches!(request.into_new_claim(), Err(DaoError::Validation(_))));
    }

    #[test]
    fn test_blank_title_and_bad_hash_rejected() {
        let request = CreateProposalRequest {
            tx_hash: TX.to_string(),
            title: "  ".to_string(),
            description: String::new(),
        };
        assert!(matches!(request.into_new_proposal(), Err(DaoError::Validation(_))));

        let request = TxRequest { tx_hash: "0x1234".to_string() };
        assert!(request.tx_hash().is_err());
    }

    #[test]
    fn test_task_priority_defaults_to_medium() {
        let request: CreateTaskRequest = serde_json::from_value(json!({
            "txHash": TX, "title": "Paint fence"
        }))
        .unwrap();
        assert_eq!(request.into_new_task().unwrap().1.priority, TaskPriority::Medium);
    }

    #[test]
    fn test_ack_flattens_body() {
        let body = serde_json::to_value(Ack::new(json!({ "entityId": "3" }))).unwrap();
        assert_eq!(body, json!({ "success": true, "entityId": "3" }));
    }

    #[test]
    fn test_event_window_checked() {
        let request = CreateEventRequest {
            tx_hash: TX.to_string(),
            title: "Cleanup".to_string(),
            description: String::new(),
            start_time: 200,
            end_time: Some(100),
            location: None,
        };
        assert!(request.into_new_event().is_err());
    }
}
