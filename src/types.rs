use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity token correlating a user's interactions across events.
pub type UserToken = String;

/// Application credentials taken from the search client once, at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub api_key: String,
}

/// Search parameters held by the search session.
///
/// Only `userToken` and `clickAnalytics` are touched by the insights
/// middleware. Everything else is carried through `other` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<UserToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_analytics: Option<bool>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

impl SearchParameters {
    /// True when a non-empty user token is set.
    pub fn has_user_token(&self) -> bool {
        self.user_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// The parameters the middleware owns while it is active, as they were
/// before it first wrote to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParametersSnapshot {
    pub user_token: Option<UserToken>,
    pub click_analytics: Option<bool>,
}

impl SessionParametersSnapshot {
    pub fn capture(params: &SearchParameters) -> Self {
        Self {
            user_token: params.user_token.clone(),
            click_analytics: params.click_analytics,
        }
    }

    /// Write both captured fields back, absent values included.
    pub fn restore_onto(&self, params: &mut SearchParameters) {
        params.user_token = self.user_token.clone();
        params.click_analytics = self.click_analytics;
    }
}

/// An analytics-worthy interaction reported by a widget (view, click,
/// conversion). Field names follow the Algolia InstantSearch wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights_method: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub widget_type: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl InsightsEvent {
    pub fn new(widget_type: impl Into<String>, event_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, insights_method: impl Into<String>) -> Self {
        self.insights_method = Some(insights_method.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_hits(mut self, hits: Vec<Value>) -> Self {
        self.hits = Some(hits);
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// The insights method, if set and non-empty.
    pub fn method(&self) -> Option<&str> {
        self.insights_method.as_deref().filter(|m| !m.is_empty())
    }
}
