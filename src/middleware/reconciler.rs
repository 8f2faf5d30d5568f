//! Merges the competing sources of the user token into one value.
//!
//! Three sources race each other: a `setUserToken` call sitting in the
//! client's pre-load queue, the answer to `getUserToken` (which may arrive
//! before or after startup), and the anonymous token the client persisted.
//! They are folded together once, at startup, by [`resolve`]. Later explicit
//! `setUserToken` calls reach the session through the runtime listener
//! instead.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::client::{InsightsClient, InsightsMethod, QueuedCall, UserTokenCallback};
use crate::types::UserToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    InitCallback,
    Queue,
    Anonymous,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::InitCallback => "init_callback",
            TokenSource::Queue => "queue",
            TokenSource::Anonymous => "anonymous",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: UserToken,
    pub source: TokenSource,
}

/// Everything known about the token so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSources {
    pub queued: Option<UserToken>,
    pub from_init: Option<UserToken>,
    pub resolved: Option<ResolvedToken>,
}

/// Payload of the most recent `setUserToken` entry in a pre-load queue.
///
/// Only that entry counts: if it carries no usable token the user token was
/// cleared, and older entries must not come back.
pub fn latest_queued_token(queue: &[QueuedCall]) -> Option<UserToken> {
    queue
        .iter()
        .rev()
        .find(|call| call.method == InsightsMethod::SetUserToken.as_str())
        .and_then(|call| call.args.first().and_then(token_from_value))
}

/// Precedence: init callback, then queue, then anonymous. Empty strings are
/// treated as absent. Pass `anonymous = None` when no insights client is
/// configured.
pub fn resolve(
    from_init: Option<&str>,
    queued: Option<&str>,
    anonymous: Option<&str>,
) -> Option<ResolvedToken> {
    [
        (from_init, TokenSource::InitCallback),
        (queued, TokenSource::Queue),
        (anonymous, TokenSource::Anonymous),
    ]
    .into_iter()
    .find_map(|(token, source)| {
        token.filter(|t| !t.is_empty()).map(|t| ResolvedToken {
            token: t.to_string(),
            source,
        })
    })
}

fn token_from_value(value: &Value) -> Option<UserToken> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Holds the token sources for one bound middleware.
///
/// The `getUserToken` callback writes into shared state, so it stays valid
/// whenever the client decides to fire it.
#[derive(Debug, Clone, Default)]
pub struct TokenReconciler {
    sources: Arc<Mutex<TokenSources>>,
}

impl TokenReconciler {
    /// Scan the client's pre-load queue and ask it for its current token.
    pub fn new(client: &dyn InsightsClient) -> Self {
        let reconciler = Self::default();

        if let Some(queue) = client.queue() {
            let queued = latest_queued_token(&queue);
            tracing::debug!(
                queue_len = queue.len(),
                found = queued.is_some(),
                "[insights] Scanned pre-load queue for setUserToken"
            );
            reconciler.lock().queued = queued;
        }

        client.call(
            &InsightsMethod::GetUserToken,
            Value::Null,
            Some(reconciler.init_callback()),
        );
        reconciler
    }

    /// Callback recording the `getUserToken` answer. Later answers overwrite
    /// earlier ones.
    pub fn init_callback(&self) -> UserTokenCallback {
        let sources = Arc::clone(&self.sources);
        Arc::new(move |token: Option<UserToken>| {
            let mut guard = sources.lock().unwrap_or_else(PoisonError::into_inner);
            guard.from_init = token.filter(|t| !t.is_empty());
            if guard.resolved.is_some() {
                tracing::debug!(
                    "[insights] getUserToken answered after startup; kept for next activation"
                );
            }
        })
    }

    /// Fold all sources into the authoritative token and remember it.
    pub fn reconcile(&self, anonymous: Option<UserToken>) -> Option<ResolvedToken> {
        let mut guard = self.lock();
        let resolved = resolve(
            guard.from_init.as_deref(),
            guard.queued.as_deref(),
            anonymous.as_deref(),
        );
        guard.resolved = resolved.clone();
        resolved
    }

    /// Forget the previous resolution so the next activation starts fresh.
    pub fn reset(&self) {
        self.lock().resolved = None;
    }

    pub fn sources(&self) -> TokenSources {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, TokenSources> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
