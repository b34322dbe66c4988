use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::artifact::ResultRef;
use crate::entitlement::Entitlement;
use crate::identity::UserId;
use crate::ticket::RequestId;

// ---------------------------------------------------------------------------
// EndpointKind
// ---------------------------------------------------------------------------

/// Which extraction operation a request was submitted through.
///
/// Serialized as the route path of the operation so stored history matches
/// what callers actually hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    #[serde(rename = "/api/data/region", alias = "region")]
    Region,
    #[serde(rename = "/api/data/path", alias = "path")]
    Path,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RequestParams
// ---------------------------------------------------------------------------

/// Caller-supplied parameters, kept exactly as submitted.
///
/// The ledger never interprets these; the gateway only peeks at `dataType`
/// to pick an artifact format.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestParams(Value);

impl RequestParams {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The `dataType` field, if present and a string.
    pub fn data_type(&self) -> Option<&str> {
        self.0.get("dataType").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// RequestEntry / RequestRecord
// ---------------------------------------------------------------------------

/// A request accepted by the gateway but not yet in the ledger.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestEntry {
    pub request_id: RequestId,
    pub endpoint: EndpointKind,
    pub params: RequestParams,
    pub result_ref: ResultRef,
    /// Wall-clock time the gateway accepted the request.
    pub submitted_at: DateTime<Utc>,
}

/// Immutable ledger entry for one accepted request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    pub request_id: RequestId,
    pub timestamp: DateTime<Utc>,
    pub endpoint: EndpointKind,
    #[serde(rename = "requestParams")]
    pub params: RequestParams,
    #[serde(rename = "resultUrl")]
    pub result_ref: ResultRef,
}

impl RequestRecord {
    /// Seal an entry with the timestamp assigned by the ledger.
    pub fn seal(entry: RequestEntry, timestamp: DateTime<Utc>) -> Self {
        Self {
            request_id: entry.request_id,
            timestamp,
            endpoint: entry.endpoint,
            params: entry.params,
            result_ref: entry.result_ref,
        }
    }
}

// ---------------------------------------------------------------------------
// UserAccount
// ---------------------------------------------------------------------------

/// Per-user aggregate: identity, contact, entitlement and request history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub user_id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub payment_status: Entitlement,
    #[serde(default)]
    pub request_history: Vec<RequestRecord>,
}

impl UserAccount {
    pub fn new(user_id: UserId, email: Option<String>, payment_status: Entitlement) -> Self {
        Self {
            user_id,
            email,
            payment_status,
            request_history: Vec::new(),
        }
    }

    /// Account created implicitly by a first append.
    pub fn implicit(user_id: UserId) -> Self {
        Self::new(user_id, None, Entitlement::default())
    }

    pub fn find_request(&self, request_id: &RequestId) -> Option<&RequestRecord> {
        self.request_history
            .iter()
            .find(|r| &r.request_id == request_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::artifact::ArtifactFormat;

    fn entry(user: &UserId) -> RequestEntry {
        let request_id = RequestId::mint();
        RequestEntry {
            result_ref: ResultRef::build(
                "https://storage.cloud.com/results",
                user,
                &request_id,
                ArtifactFormat::GeoJson,
            ),
            request_id,
            endpoint: EndpointKind::Region,
            params: RequestParams::new(json!({
                "center": [1, 2],
                "radius_km": 5,
                "dataType": "potholes"
            })),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn endpoint_serializes_as_route() {
        assert_eq!(
            serde_json::to_string(&EndpointKind::Region).unwrap(),
            "\"/api/data/region\""
        );
        let parsed: EndpointKind = serde_json::from_str("\"path\"").unwrap();
        assert_eq!(parsed, EndpointKind::Path);
    }

    #[test]
    fn endpoint_display_is_short_name() {
        assert_eq!(EndpointKind::Region.to_string(), "region");
        assert_eq!(EndpointKind::Path.to_string(), "path");
        assert!(serde_json::from_str::<EndpointKind>("\"polygon\"").is_err());
    }

    #[test]
    fn params_data_type_lookup() {
        let p = RequestParams::new(json!({"dataType": "potholes"}));
        assert_eq!(p.data_type(), Some("potholes"));

        let numeric = RequestParams::new(json!({"dataType": 7}));
        assert_eq!(numeric.data_type(), None);

        let not_object = RequestParams::new(json!([1, 2, 3]));
        assert_eq!(not_object.data_type(), None);
    }

    #[test]
    fn record_wire_shape_is_camel_case() {
        let user = UserId::new("u1").unwrap();
        let record = RequestRecord::seal(entry(&user), Utc::now());
        let value = serde_json::to_value(&record).unwrap();
        for key in ["requestId", "timestamp", "endpoint", "requestParams", "resultUrl"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["requestParams"]["radius_km"], 5);
    }

    #[test]
    fn seal_keeps_entry_fields() {
        let user = UserId::new("u1").unwrap();
        let e = entry(&user);
        let ts = Utc::now();
        let record = RequestRecord::seal(e.clone(), ts);
        assert_eq!(record.request_id, e.request_id);
        assert_eq!(record.result_ref, e.result_ref);
        assert_eq!(record.params, e.params);
        assert_eq!(record.timestamp, ts);
    }

    #[test]
    fn account_defaults_when_fields_missing() {
        let account: UserAccount = serde_json::from_value(json!({"userId": "u9"})).unwrap();
        assert_eq!(account.payment_status, Entitlement::Unpaid);
        assert!(account.email.is_none());
        assert!(account.request_history.is_empty());
    }

    #[test]
    fn find_request_by_id() {
        let user = UserId::new("u1").unwrap();
        let mut account = UserAccount::implicit(user.clone());
        let record = RequestRecord::seal(entry(&user), Utc::now());
        let id = record.request_id.clone();
        account.request_history.push(record);
        assert!(account.find_request(&id).is_some());
        assert!(account.find_request(&RequestId::mint()).is_none());
    }
}
