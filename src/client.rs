//! Contract with the external analytics (Insights) client.
//!
//! The client is an opaque function-style collaborator: it is invoked as
//! `(method, payload, callback?)` and may expose a log of calls made before
//! its real implementation finished loading. Queuing and transport are the
//! client's business; the middleware only holds a reference.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::types::UserToken;

/// Receives a user token from `getUserToken` or `onUserTokenChange`.
pub type UserTokenCallback = Arc<dyn Fn(Option<UserToken>) + Send + Sync>;

/// Methods the middleware knows by name. Anything else is an event method
/// (`clickedObjectIDsAfterSearch`, `viewedObjectIDs`, ...) forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InsightsMethod {
    Init,
    GetUserToken,
    SetUserToken,
    OnUserTokenChange,
    AddAlgoliaAgent,
    Event(String),
}

impl InsightsMethod {
    pub fn as_str(&self) -> &str {
        match self {
            InsightsMethod::Init => "init",
            InsightsMethod::GetUserToken => "getUserToken",
            InsightsMethod::SetUserToken => "setUserToken",
            InsightsMethod::OnUserTokenChange => "onUserTokenChange",
            InsightsMethod::AddAlgoliaAgent => "addAlgoliaAgent",
            InsightsMethod::Event(name) => name,
        }
    }
}

impl From<&str> for InsightsMethod {
    fn from(name: &str) -> Self {
        match name {
            "init" => InsightsMethod::Init,
            "getUserToken" => InsightsMethod::GetUserToken,
            "setUserToken" => InsightsMethod::SetUserToken,
            "onUserTokenChange" => InsightsMethod::OnUserTokenChange,
            "addAlgoliaAgent" => InsightsMethod::AddAlgoliaAgent,
            other => InsightsMethod::Event(other.to_string()),
        }
    }
}

impl fmt::Display for InsightsMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a pre-load queue: `[method, ...args]`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCall {
    pub method: String,
    pub args: Vec<Value>,
}

impl QueuedCall {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

pub trait InsightsClient: Send + Sync {
    /// Invoke `method` with `payload`. The callback, when given, receives a
    /// user token; it may fire synchronously, later, or never.
    ///
    /// `onUserTokenChange` with no callback removes the registered listener.
    fn call(&self, method: &InsightsMethod, payload: Value, callback: Option<UserTokenCallback>);

    /// Calls recorded before the client finished loading, oldest first.
    /// `None` means the client keeps no such log (or has already drained it).
    fn queue(&self) -> Option<Vec<QueuedCall>> {
        None
    }
}

/// Stand-in used when the insights client is explicitly disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInsightsClient;

impl InsightsClient for NoopInsightsClient {
    fn call(&self, _method: &InsightsMethod, _payload: Value, _callback: Option<UserTokenCallback>) {}
}
