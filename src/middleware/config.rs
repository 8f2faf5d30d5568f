use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::anonymous::{AnonymousTokenStore, NoAnonymousToken};
use super::gateway::InsightsEventHandler;
use crate::client::InsightsClient;
use crate::error::{InsightsError, Result};
use crate::types::{Credentials, InsightsEvent};

pub const SUPPORTED_REGIONS: &[&str] = &["us", "de"];

/// Which insights client the middleware talks to.
#[derive(Clone)]
pub enum InsightsClientConfig {
    Client(Arc<dyn InsightsClient>),
    /// Token features off; a no-op client is substituted.
    Disabled,
}

/// Options forwarded to the insights client's `init` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsInitParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_has_opted_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cookie: Option<bool>,
    /// Cookie lifetime in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl InsightsInitParams {
    /// Load init params from `FLAPJACK_INSIGHTS_*` environment variables.
    /// Unset or unparseable variables leave the field unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| {
            lookup(name).and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            })
        };

        Self {
            user_has_opted_out: flag("FLAPJACK_INSIGHTS_OPT_OUT"),
            use_cookie: flag("FLAPJACK_INSIGHTS_USE_COOKIE"),
            cookie_duration: lookup("FLAPJACK_INSIGHTS_COOKIE_DURATION")
                .and_then(|v| v.trim().parse().ok()),
            region: lookup("FLAPJACK_INSIGHTS_REGION")
                .map(|v| v.trim().to_ascii_lowercase())
                .filter(|v| !v.is_empty()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ref region) = self.region {
            if !SUPPORTED_REGIONS.contains(&region.as_str()) {
                return Err(InsightsError::Config(format!(
                    "unsupported insights region '{}' (expected one of: {})",
                    region,
                    SUPPORTED_REGIONS.join(", ")
                )));
            }
        }
        if self.cookie_duration == Some(0) {
            return Err(InsightsError::Config(
                "cookieDuration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// `{appId, apiKey, ...params}` for the `init` call.
    pub fn init_payload(&self, credentials: &Credentials) -> Result<Value> {
        let mut payload = serde_json::Map::new();
        payload.insert("appId".to_string(), Value::String(credentials.app_id.clone()));
        payload.insert(
            "apiKey".to_string(),
            Value::String(credentials.api_key.clone()),
        );
        if let Value::Object(params) = serde_json::to_value(self)? {
            payload.extend(params);
        }
        Ok(Value::Object(payload))
    }
}

/// Everything needed to build an insights middleware.
#[derive(Clone)]
pub struct InsightsMiddlewareConfig {
    /// `None` is a configuration error; use [`InsightsClientConfig::Disabled`]
    /// to run without a client.
    pub insights_client: Option<InsightsClientConfig>,
    pub insights_init_params: Option<InsightsInitParams>,
    pub on_event: Option<InsightsEventHandler>,
    pub anonymous_tokens: Arc<dyn AnonymousTokenStore>,
}

impl Default for InsightsMiddlewareConfig {
    fn default() -> Self {
        Self {
            insights_client: None,
            insights_init_params: None,
            on_event: None,
            anonymous_tokens: Arc::new(NoAnonymousToken),
        }
    }
}

impl InsightsMiddlewareConfig {
    pub fn new(client: Arc<dyn InsightsClient>) -> Self {
        Self {
            insights_client: Some(InsightsClientConfig::Client(client)),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            insights_client: Some(InsightsClientConfig::Disabled),
            ..Default::default()
        }
    }

    pub fn with_init_params(mut self, params: InsightsInitParams) -> Self {
        self.insights_init_params = Some(params);
        self
    }

    pub fn with_on_event<F>(mut self, handler: F) -> Self
    where
        F: Fn(&InsightsEvent, &dyn InsightsClient) + Send + Sync + 'static,
    {
        self.on_event = Some(Arc::new(handler));
        self
    }

    pub fn with_anonymous_tokens(mut self, store: Arc<dyn AnonymousTokenStore>) -> Self {
        self.anonymous_tokens = store;
        self
    }
}

impl std::fmt::Debug for InsightsMiddlewareConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let client = match self.insights_client {
            None => "missing",
            Some(InsightsClientConfig::Disabled) => "disabled",
            Some(InsightsClientConfig::Client(_)) => "client",
        };
        f.debug_struct("InsightsMiddlewareConfig")
            .field("insights_client", &client)
            .field("insights_init_params", &self.insights_init_params)
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_parses_known_vars() {
        let params = InsightsInitParams::from_lookup(lookup(&[
            ("FLAPJACK_INSIGHTS_OPT_OUT", "0"),
            ("FLAPJACK_INSIGHTS_USE_COOKIE", "TRUE"),
            ("FLAPJACK_INSIGHTS_COOKIE_DURATION", "86400000"),
            ("FLAPJACK_INSIGHTS_REGION", " DE "),
        ]));
        assert_eq!(params.user_has_opted_out, Some(false));
        assert_eq!(params.use_cookie, Some(true));
        assert_eq!(params.cookie_duration, Some(86_400_000));
        assert_eq!(params.region.as_deref(), Some("de"));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let params = InsightsInitParams::from_lookup(lookup(&[
            ("FLAPJACK_INSIGHTS_USE_COOKIE", "maybe"),
            ("FLAPJACK_INSIGHTS_COOKIE_DURATION", "soon"),
        ]));
        assert_eq!(params, InsightsInitParams::default());
    }

    #[test]
    fn test_validate_rejects_unknown_region() {
        let params = InsightsInitParams {
            region: Some("eu".to_string()),
            ..Default::default()
        };
        assert!(matches!(params.validate(), Err(InsightsError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_cookie_duration() {
        let params = InsightsInitParams {
            cookie_duration: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_init_payload_merges_params_after_credentials() {
        let creds = Credentials {
            app_id: "APP".to_string(),
            api_key: "KEY".to_string(),
        };
        let params = InsightsInitParams {
            use_cookie: Some(false),
            region: Some("us".to_string()),
            ..Default::default()
        };
        assert_eq!(
            params.init_payload(&creds).unwrap(),
            json!({"appId": "APP", "apiKey": "KEY", "useCookie": false, "region": "us"})
        );
    }
}
