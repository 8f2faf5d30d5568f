use std::collections::HashMap;

use crate::error::{InsightsError, Result};
use crate::host::SearchClient;
use crate::types::Credentials;

pub const APP_ID_HEADER: &str = "x-algolia-application-id";
pub const API_KEY_HEADER: &str = "x-algolia-api-key";

/// Pull `(appId, apiKey)` out of the search client.
///
/// Direct accessors win over transport headers. Empty values count as
/// missing. Failing here is fatal: events sent without credentials cannot be
/// attributed to an application.
pub fn extract_credentials(client: &dyn SearchClient) -> Result<Credentials> {
    let headers = client.transport_headers();

    let app_id = non_empty(client.application_id())
        .or_else(|| non_empty(header(headers.as_ref(), APP_ID_HEADER)));
    let api_key =
        non_empty(client.api_key()).or_else(|| non_empty(header(headers.as_ref(), API_KEY_HEADER)));

    match (app_id, api_key) {
        (Some(app_id), Some(api_key)) => Ok(Credentials { app_id, api_key }),
        (None, _) => Err(InsightsError::MissingCredentials(
            "search client exposes no application ID".to_string(),
        )),
        (_, None) => Err(InsightsError::MissingCredentials(
            "search client exposes no API key".to_string(),
        )),
    }
}

fn header(headers: Option<&HashMap<String, String>>, name: &str) -> Option<String> {
    headers?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.clone())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Direct;

    impl SearchClient for Direct {
        fn application_id(&self) -> Option<String> {
            Some("APP".to_string())
        }
        fn api_key(&self) -> Option<String> {
            Some("KEY".to_string())
        }
        fn transport_headers(&self) -> Option<HashMap<String, String>> {
            Some(HashMap::from([(
                APP_ID_HEADER.to_string(),
                "HEADER_APP".to_string(),
            )]))
        }
    }

    struct HeadersOnly;

    impl SearchClient for HeadersOnly {
        fn transport_headers(&self) -> Option<HashMap<String, String>> {
            Some(HashMap::from([
                ("X-Algolia-Application-Id".to_string(), "APP".to_string()),
                ("X-Algolia-API-Key".to_string(), "KEY".to_string()),
            ]))
        }
    }

    struct Blank;

    impl SearchClient for Blank {
        fn application_id(&self) -> Option<String> {
            Some("  ".to_string())
        }
        fn api_key(&self) -> Option<String> {
            Some("KEY".to_string())
        }
    }

    #[test]
    fn test_direct_accessors_win() {
        let creds = extract_credentials(&Direct).unwrap();
        assert_eq!(creds.app_id, "APP");
        assert_eq!(creds.api_key, "KEY");
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let creds = extract_credentials(&HeadersOnly).unwrap();
        assert_eq!(
            creds,
            Credentials {
                app_id: "APP".to_string(),
                api_key: "KEY".to_string()
            }
        );
    }

    #[test]
    fn test_blank_app_id_is_fatal() {
        let err = extract_credentials(&Blank).unwrap_err();
        assert!(matches!(err, InsightsError::MissingCredentials(_)));
        assert!(err.is_fatal());
    }
}
