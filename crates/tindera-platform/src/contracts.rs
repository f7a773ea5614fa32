use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatchRequest {
    pub status: Option<String>,
    pub payment_proof: Option<String>,
    pub qr_code_sent: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorMessageRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub active_orders: i64,
    pub pending_payments: i64,
    pub completed_today: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub slots: Vec<String>,
}
