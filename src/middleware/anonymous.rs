use std::sync::{PoisonError, RwLock};

use crate::types::UserToken;

/// Cookie the insights client persists its anonymous token under.
pub const ANONYMOUS_TOKEN_COOKIE: &str = "_ALGOLIA";
pub const ANONYMOUS_TOKEN_PREFIX: &str = "anonymous-";

/// Read-only lookup of the anonymous token the insights client persisted
/// locally.
pub trait AnonymousTokenStore: Send + Sync {
    fn anonymous_user_token(&self) -> Option<UserToken>;
}

/// No persisted state at all (server-side rendering, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnonymousToken;

impl AnonymousTokenStore for NoAnonymousToken {
    fn anonymous_user_token(&self) -> Option<UserToken> {
        None
    }
}

/// Looks the anonymous token up in a `Cookie` header.
///
/// The header can be replaced after construction, because the insights
/// client writes its cookie only once it has loaded.
#[derive(Debug, Default)]
pub struct CookieTokenStore {
    header: RwLock<String>,
}

impl CookieTokenStore {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: RwLock::new(header.into()),
        }
    }

    pub fn set_cookie_header(&self, header: impl Into<String>) {
        *self.header.write().unwrap_or_else(PoisonError::into_inner) = header.into();
    }
}

impl AnonymousTokenStore for CookieTokenStore {
    fn anonymous_user_token(&self) -> Option<UserToken> {
        let header = self.header.read().unwrap_or_else(PoisonError::into_inner);
        cookie_value(&header, ANONYMOUS_TOKEN_COOKIE)
            .filter(|token| token.starts_with(ANONYMOUS_TOKEN_PREFIX))
    }
}

/// First value of cookie `name` in a `name=value; other=value` header.
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim_start().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_end().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_value_lookup() {
        let header = "theme=dark; _ALGOLIA=anonymous-42; lang=en";
        assert_eq!(
            cookie_value(header, "_ALGOLIA").as_deref(),
            Some("anonymous-42")
        );
        assert_eq!(cookie_value(header, "lang").as_deref(), Some("en"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn test_cookie_name_must_match_exactly() {
        assert_eq!(cookie_value("x_ALGOLIA=anonymous-1", "_ALGOLIA"), None);
    }

    #[test]
    fn test_store_ignores_non_anonymous_values() {
        let store = CookieTokenStore::new("_ALGOLIA=user-7");
        assert_eq!(store.anonymous_user_token(), None);

        store.set_cookie_header("_ALGOLIA=anonymous-abc");
        assert_eq!(
            store.anonymous_user_token().as_deref(),
            Some("anonymous-abc")
        );
    }

    #[test]
    fn test_empty_header_has_no_token() {
        assert_eq!(CookieTokenStore::default().anonymous_user_token(), None);
        assert_eq!(NoAnonymousToken.anonymous_user_token(), None);
    }
}
