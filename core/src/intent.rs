use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::error::IntentError;

pub const ICM_NAMESPACE: &str = "http://www.models.tmforum.org/tio/v1.0/IntentCommonModel#";
pub const CAT_NAMESPACE: &str = "http://www.operator.com/Catalog#";
pub const IDAN_NAMESPACE: &str =
    "http://www.idan-tmforum-catalyst.org/IntentDrivenAutonomousNetworks#";
pub const GEO_NAMESPACE: &str = "https://tmforum.org/2020/07/geographicPoint#";

const SERVICE_TARGET: &str = "_:service";
const INTENT_OWNER: &str = "idan:ABCEvents";

/// Intent families the pipeline accepts. Only `EventLiveBroadcast` carries a
/// JSON-LD expression; the others share the common payload shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum IntentType {
    #[default]
    EventLiveBroadcast,
    VideoConference,
    DataTransfer,
}

impl IntentType {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentType::EventLiveBroadcast => "EventLiveBroadcast",
            IntentType::VideoConference => "VideoConference",
            IntentType::DataTransfer => "DataTransfer",
        }
    }
}

/// A `{target, params}` pair, used for both delivery and property expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Expectation {
    pub target: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: Map<String, Value>,
}

impl Expectation {
    fn to_value(&self) -> Value {
        json!({
            "target": self.target,
            "params": self.params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidFor {
    pub start_date_time: String,
    pub end_date_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Normalized caller input for intent creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub intent_type: IntentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_expectations: Option<Vec<Expectation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_for: Option<ValidFor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_expectations: Option<Vec<Expectation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_area: Option<Vec<GeoPoint>>,
}

impl IntentRequest {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            intent_type: IntentType::default(),
            delivery_expectations: None,
            valid_for: None,
            property_expectations: None,
            service_area: None,
        }
    }

    /// Parse tool arguments into a request and validate it.
    pub fn from_arguments(args: Value) -> Result<Self, IntentError> {
        let request: Self = serde_json::from_value(args)
            .map_err(|e| IntentError::validation(format!("invalid intent arguments: {e}")))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), IntentError> {
        if self.name.trim().is_empty() {
            return Err(IntentError::validation("'name' must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(IntentError::validation("'description' must not be empty"));
        }
        Ok(())
    }
}

/// The wireless-access expectation used when a request names none.
pub fn default_delivery_expectations() -> Vec<Expectation> {
    let mut params = Map::new();
    params.insert(
        "targetDescription".to_string(),
        Value::String("cat:EventWirelessAccess".to_string()),
    );
    vec![Expectation {
        target: SERVICE_TARGET.to_string(),
        params,
    }]
}

/// Build the TMF921 request body for `request`.
///
/// Pure: the same request always yields the same document. `validFor` and
/// `propertyExpectations` are only emitted when they carry data, and a
/// non-empty service area is appended to `propertyExpectations` as an
/// `elb:areaOfService` entry for every intent type, not only
/// `EventLiveBroadcast`.
pub fn build_intent_payload(request: &IntentRequest) -> Value {
    let delivery = match &request.delivery_expectations {
        Some(list) if !list.is_empty() => list.clone(),
        _ => default_delivery_expectations(),
    };

    let mut payload = Map::new();
    payload.insert("name".to_string(), Value::String(request.name.clone()));
    payload.insert(
        "description".to_string(),
        Value::String(request.description.clone()),
    );
    payload.insert("type".to_string(), Value::String("Intent".to_string()));
    payload.insert(
        "deliveryExpectations".to_string(),
        Value::Array(delivery.iter().map(Expectation::to_value).collect()),
    );

    if let Some(valid_for) = &request.valid_for {
        payload.insert(
            "validFor".to_string(),
            json!({
                "startDateTime": valid_for.start_date_time,
                "endDateTime": valid_for.end_date_time,
            }),
        );
    }

    let mut properties: Vec<Value> = request
        .property_expectations
        .iter()
        .flatten()
        .map(Expectation::to_value)
        .collect();
    if let Some(area) = request.service_area.as_deref().filter(|a| !a.is_empty()) {
        properties.push(service_area_expectation(area));
    }
    if !properties.is_empty() {
        payload.insert(
            "propertyExpectations".to_string(),
            Value::Array(properties),
        );
    }

    if request.intent_type == IntentType::EventLiveBroadcast {
        payload.insert("expression".to_string(), event_live_broadcast_expression());
    }

    Value::Object(payload)
}

fn service_area_expectation(area: &[GeoPoint]) -> Value {
    let points: Vec<Value> = area
        .iter()
        .map(|p| {
            json!({
                "geo:longitude": p.longitude,
                "geo:latitude": p.latitude,
            })
        })
        .collect();
    json!({
        "target": SERVICE_TARGET,
        "params": { "elb:areaOfService": points },
    })
}

fn event_live_broadcast_expression() -> Value {
    json!({
        "@context": {
            "icm": ICM_NAMESPACE,
            "cat": CAT_NAMESPACE,
            "idan": IDAN_NAMESPACE,
            "geo": GEO_NAMESPACE,
        },
        "idan:EventLiveBroadcast": {
            "@type": "icm:Intent",
            "icm:intentOwner": INTENT_OWNER,
            "icm:hasExpectation": [],
        }
    })
}

// ──────────────────────────────────────────────
// Backend-side shapes (POST /intent/)
// ──────────────────────────────────────────────

fn default_intent_kind() -> String {
    "Intent".to_string()
}

/// Body accepted by the intent endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentSubmission {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", default = "default_intent_kind")]
    pub kind: String,
    pub delivery_expectations: Vec<Expectation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_for: Option<ValidFor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_expectations: Option<Vec<Expectation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub expression: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Link {
    pub href: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntentLinks {
    #[serde(rename = "self")]
    pub self_link: Link,
}

/// Intent resource as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub delivery_expectations: Vec<Expectation>,
    #[serde(rename = "_links")]
    pub links: IntentLinks,
}

impl IntentRecord {
    pub fn self_href(base_url: &str, id: &str) -> String {
        format!("{}/intent/{id}", base_url.trim_end_matches('/'))
    }
}
