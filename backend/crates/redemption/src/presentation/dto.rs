//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{QrAction, QrCode};
use crate::domain::value_objects::UsagePolicy;

/// Query for GET /api/qr/redeem
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemQuery {
    pub qr_code_id: String,
}

/// Query for management list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    pub count: usize,
}

// ============================================================================
// Actions
// ============================================================================

/// Request for POST /api/qr/actions
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActionRequest {
    /// Serialized JSON document
    pub payload: String,
}

/// Response for POST /api/qr/actions
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActionResponse {
    pub qr_action_id: String,
}

/// One action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub qr_action_id: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl From<QrAction> for ActionResponse {
    fn from(action: QrAction) -> Self {
        Self {
            qr_action_id: action.id.to_string(),
            payload: action.payload.into_string(),
            created_at: action.created_at,
        }
    }
}

// ============================================================================
// Codes
// ============================================================================

/// Request for POST /api/qr/codes
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeRequest {
    pub action_id: String,
    pub usage_policy: UsagePolicy,
    /// 0 means unlimited
    pub max_usages: i64,
    pub expires_in_minutes: i64,
}

/// Response for POST /api/qr/codes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeResponse {
    pub qr_code_id: String,
}

/// One code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeResponse {
    pub qr_code_id: String,
    pub action_id: String,
    pub usage_policy: UsagePolicy,
    pub max_usages: i64,
    pub redemptions: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<QrCode> for CodeResponse {
    fn from(code: QrCode) -> Self {
        Self {
            qr_code_id: code.id.to_string(),
            action_id: code.action_id.to_string(),
            usage_policy: code.policy,
            max_usages: code.max_usages,
            redemptions: code.redemptions,
            expires_at: code.expires_at,
            created_at: code.created_at,
        }
    }
}
