//! Domain records exchanged with the management backend
//!
//! These are the single decode boundary for API responses. The backend has
//! shipped both snake_case and camelCase spellings over time, so the known
//! aliases are accepted here; anything else fails the decode instead of
//! being silently defaulted.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "pending_approval", alias = "pending")]
    PendingApproval,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "rejected")]
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(alias = "userId", alias = "user_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(alias = "phoneNumber", default)]
    pub phone_number: String,
    /// Opaque to the client; only ever produced by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub status: AccountStatus,
    #[serde(alias = "isRootAdmin", default)]
    pub is_root_admin: bool,
    #[serde(alias = "registeredAt")]
    pub registered_at: DateTime<Utc>,
}

// =============================================================================
// Vulnerable individuals
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[default]
    #[serde(rename = "O")]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(alias = "road_name", alias = "roadName", default)]
    pub address1: String,
    #[serde(alias = "detail", default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
}

impl Address {
    /// Short display form used in table rows
    pub fn summary(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.state.is_empty() {
            parts.push(&self.state);
        }
        if !self.city.is_empty() {
            parts.push(&self.city);
        }
        parts.join(" ")
    }
}

/// One risk or desire observation with its type codes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityDetail {
    #[serde(rename = "type", default)]
    pub types: Vec<u8>,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vulnerabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(alias = "riskList", default)]
    pub risk_list: Vec<VulnerabilityDetail>,
    #[serde(alias = "desireList", default)]
    pub desire_list: Vec<VulnerabilityDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerableIndividual {
    #[serde(alias = "userId")]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(alias = "birthDate")]
    pub birth_date: NaiveDate,
    #[serde(alias = "phoneNumber", default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vulnerabilities>,
    #[serde(
        alias = "lastConsultationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_consultation_id: Option<String>,
}

/// Row shape returned by the list endpoint (a lighter projection than the
/// full record; counts may come precomputed or not at all)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerableSummary {
    #[serde(alias = "userId")]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(alias = "birthDate", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(alias = "phoneNumber", default)]
    pub phone_number: String,
    #[serde(default)]
    pub address: Address,
    #[serde(alias = "memo", default)]
    pub summary: Option<String>,
    #[serde(alias = "riskListSize", default)]
    pub risk_list_size: u32,
    #[serde(alias = "desireListSize", default)]
    pub desire_list_size: u32,
}

impl VulnerableSummary {
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.birth_date.map(|b| age_on(b, today))
    }
}

/// The list endpoint has shipped both a bare array and a wrapped object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VulnerableListResponse {
    Wrapped { vulnerables: Vec<VulnerableSummary> },
    Bare(Vec<VulnerableSummary>),
}

impl VulnerableListResponse {
    pub fn into_rows(self) -> Vec<VulnerableSummary> {
        match self {
            Self::Wrapped { vulnerables } => vulnerables,
            Self::Bare(rows) => rows,
        }
    }
}

/// Whole years elapsed between a birth date and `today`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

// =============================================================================
// Question sets
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResponseCategory {
    Exception,
    Risk,
    Desire,
    DeepDive,
}

impl TryFrom<u8> for ResponseCategory {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Exception),
            1 => Ok(Self::Risk),
            2 => Ok(Self::Desire),
            3 => Ok(Self::DeepDive),
            other => Err(format!("unknown response category: {}", other)),
        }
    }
}

impl From<ResponseCategory> for u8 {
    fn from(value: ResponseCategory) -> Self {
        match value {
            ResponseCategory::Exception => 0,
            ResponseCategory::Risk => 1,
            ResponseCategory::Desire => 2,
            ResponseCategory::DeepDive => 3,
        }
    }
}

/// Classification tag attached to an expected response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTag {
    #[serde(alias = "responseType")]
    pub response_type: ResponseCategory,
    #[serde(alias = "responseIndex")]
    pub response_index: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpectedResponse {
    pub text: String,
    #[serde(
        alias = "responseTypeList",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub response_type_list: Option<Vec<ResponseTag>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionStep {
    pub text: String,
    #[serde(alias = "expectedResponse", default)]
    pub expected_response: Vec<ExpectedResponse>,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    #[serde(alias = "questionsId", alias = "id")]
    pub questions_id: String,
    pub title: String,
    #[serde(
        alias = "createdAt",
        alias = "created_at",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub flow: Vec<QuestionStep>,
}

impl QuestionSet {
    pub fn question_count(&self) -> usize {
        self.flow.len()
    }
}

// =============================================================================
// Call logs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CallResult {
    NotPossible,
    NoActionNeeded,
    DeepDiveNeeded,
}

impl TryFrom<u8> for CallResult {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotPossible),
            1 => Ok(Self::NoActionNeeded),
            2 => Ok(Self::DeepDiveNeeded),
            other => Err(format!("unknown call result code: {}", other)),
        }
    }
}

impl From<CallResult> for u8 {
    fn from(value: CallResult) -> Self {
        match value {
            CallResult::NotPossible => 0,
            CallResult::NoActionNeeded => 1,
            CallResult::DeepDiveNeeded => 2,
        }
    }
}

impl CallResult {
    /// Consultations that actually happened (anything but not-possible)
    pub fn is_success(self) -> bool {
        !matches!(self, Self::NotPossible)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotPossible => "not possible",
            Self::NoActionNeeded => "no action needed",
            Self::DeepDiveNeeded => "deep dive needed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NeedHuman {
    None,
    Requested,
    Critical,
}

impl TryFrom<u8> for NeedHuman {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Requested),
            2 => Ok(Self::Critical),
            other => Err(format!("unknown need-human code: {}", other)),
        }
    }
}

impl From<NeedHuman> for u8 {
    fn from(value: NeedHuman) -> Self {
        match value {
            NeedHuman::None => 0,
            NeedHuman::Requested => 1,
            NeedHuman::Critical => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFinding {
    #[serde(alias = "riskIndexList", default)]
    pub risk_index_list: Vec<u8>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesireFinding {
    #[serde(alias = "desireIndexList", default)]
    pub desire_index_list: Vec<u8>,
    pub content: String,
}

/// Vulnerability findings of one call, with per-type occurrence counts.
/// Count keys are stringified type indices, as the backend sends them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnerabilityDelta {
    #[serde(alias = "riskList", default)]
    pub risk_list: Vec<RiskFinding>,
    #[serde(alias = "desireList", default)]
    pub desire_list: Vec<DesireFinding>,
    #[serde(alias = "riskIndexCount", default)]
    pub risk_index_count: BTreeMap<String, u32>,
    #[serde(alias = "desireIndexCount", default)]
    pub desire_index_count: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLog {
    pub id: String,
    #[serde(alias = "accountId", default)]
    pub account_id: String,
    /// Outreach round the call belonged to
    #[serde(alias = "sIndex", default)]
    pub s_index: u32,
    #[serde(alias = "vulnerableId", default)]
    pub v_id: String,
    #[serde(alias = "questionSetId", default)]
    pub q_id: String,
    pub time: DateTime<Utc>,
    /// Call duration in seconds
    #[serde(default)]
    pub runtime: u32,
    #[serde(alias = "overallScript", default)]
    pub overall_script: String,
    #[serde(default)]
    pub summary: String,
    pub result: CallResult,
    #[serde(alias = "failCode", default)]
    pub fail_code: u32,
    #[serde(alias = "needHuman")]
    pub need_human: NeedHuman,
    #[serde(
        alias = "resultVulnerabilities",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub result_vulnerabilities: Option<VulnerabilityDelta>,
    #[serde(
        alias = "deleteVulnerabilities",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delete_vulnerabilities: Option<VulnerabilityDelta>,
    #[serde(
        alias = "newVulnerabilities",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub new_vulnerabilities: Option<VulnerabilityDelta>,
}

/// Row shape of the paged history list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallHistoryRow {
    pub id: String,
    #[serde(alias = "vName", alias = "vulnerableName", default)]
    pub v_name: String,
    #[serde(alias = "qTitle", alias = "questionSetTitle", default)]
    pub q_title: String,
    #[serde(alias = "startTime", alias = "start_time", default)]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<CallResult>,
    #[serde(alias = "sIndex", default)]
    pub s_index: u32,
    #[serde(alias = "riskCount", default)]
    pub risk_count: u32,
    #[serde(alias = "desireCount", default)]
    pub desire_count: u32,
}

/// Spring-style page envelope used by the history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PageEnvelope<T> {
    pub content: Vec<T>,
    #[serde(alias = "totalPages", default)]
    pub total_pages: u32,
    #[serde(alias = "totalElements", default)]
    pub total_elements: u64,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

// =============================================================================
// Request bodies
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: String,
    pub password: String,
    pub email: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDecisionRequest {
    pub user_id: String,
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    pub vulnerable_ids: Vec<String>,
    pub question_set_id: String,
    pub admin_id: String,
}

/// The login endpoint has shipped two shapes: a token pair, and an older
/// token-plus-account object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Tokens {
        #[serde(alias = "accessToken")]
        access_token: String,
        #[serde(alias = "refreshToken", default)]
        refresh_token: Option<String>,
        #[serde(alias = "isRoot", default)]
        is_root: bool,
    },
    Legacy {
        token: String,
        account: Account,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_camel_case_call_log() {
        let raw = serde_json::json!({
            "id": "log-1",
            "accountId": "admin",
            "sIndex": 2,
            "vulnerableId": "v-1",
            "questionSetId": "q-1",
            "time": "2025-05-01T09:30:00Z",
            "runtime": 95,
            "overallScript": "...",
            "summary": "ok",
            "result": 1,
            "failCode": 0,
            "needHuman": 0,
            "resultVulnerabilities": {
                "riskList": [{"riskIndexList": [1, 3], "content": "rent overdue"}],
                "desireList": [],
                "riskIndexCount": {"1": 1, "3": 1},
                "desireIndexCount": {}
            }
        });
        let log: CallLog = serde_json::from_value(raw).unwrap();
        assert_eq!(log.account_id, "admin");
        assert_eq!(log.s_index, 2);
        assert_eq!(log.result, CallResult::NoActionNeeded);
        let rv = log.result_vulnerabilities.unwrap();
        assert_eq!(rv.risk_list[0].risk_index_list, vec![1, 3]);
        assert_eq!(rv.risk_index_count.get("1"), Some(&1));
    }

    #[test]
    fn test_decodes_snake_case_call_log() {
        let raw = serde_json::json!({
            "id": "log-2",
            "account_id": "admin",
            "v_id": "v-9",
            "q_id": "q-2",
            "time": "2025-05-02T10:00:00Z",
            "result": 2,
            "need_human": 1
        });
        let log: CallLog = serde_json::from_value(raw).unwrap();
        assert_eq!(log.v_id, "v-9");
        assert_eq!(log.result, CallResult::DeepDiveNeeded);
        assert_eq!(log.need_human, NeedHuman::Requested);
        assert_eq!(log.runtime, 0);
    }

    #[test]
    fn test_unknown_result_code_fails_loudly() {
        let raw = serde_json::json!({
            "id": "log-3",
            "time": "2025-05-02T10:00:00Z",
            "result": 7,
            "need_human": 0
        });
        assert!(serde_json::from_value::<CallLog>(raw).is_err());
    }

    #[test]
    fn test_vulnerable_list_both_envelopes() {
        let wrapped = serde_json::json!({
            "vulnerables": [{"userId": "v-1", "name": "Kim"}]
        });
        let bare = serde_json::json!([{"user_id": "v-2", "name": "Lee", "gender": "F"}]);

        let a: VulnerableListResponse = serde_json::from_value(wrapped).unwrap();
        let b: VulnerableListResponse = serde_json::from_value(bare).unwrap();
        assert_eq!(a.into_rows()[0].user_id, "v-1");
        let rows = b.into_rows();
        assert_eq!(rows[0].user_id, "v-2");
        assert_eq!(rows[0].gender, Gender::Female);
    }

    #[test]
    fn test_login_response_shapes() {
        let tokens = serde_json::json!({"accessToken": "a", "isRoot": true});
        let legacy = serde_json::json!({
            "token": "t",
            "account": {
                "id": "admin",
                "email": "a@b.c",
                "status": "approved",
                "registered_at": "2025-01-01T00:00:00Z"
            }
        });
        assert!(matches!(
            serde_json::from_value::<LoginResponse>(tokens).unwrap(),
            LoginResponse::Tokens { is_root: true, .. }
        ));
        assert!(matches!(
            serde_json::from_value::<LoginResponse>(legacy).unwrap(),
            LoginResponse::Legacy { .. }
        ));
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let body = StartCallRequest {
            vulnerable_ids: vec!["v-1".to_string()],
            question_set_id: "q-1".to_string(),
            admin_id: "admin".to_string(),
        };
        let value = serde_json::to_value(body).unwrap();
        assert!(value.get("vulnerableIds").is_some());
        assert!(value.get("questionSetId").is_some());
        assert!(value.get("adminId").is_some());
    }

    #[test]
    fn test_age_on() {
        let birth = NaiveDate::from_ymd_opt(1953, 5, 1).unwrap();
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()), 72);
        assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap()), 71);
    }

    #[test]
    fn test_address_summary() {
        let addr = Address {
            state: "Seoul".to_string(),
            city: "Gangnam".to_string(),
            address1: String::new(),
            address2: None,
        };
        assert_eq!(addr.summary(), "Seoul Gangnam");
    }
}
