use serde_json::{json, Value};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use flapjack_insights::{InsightsClient, InsightsMethod, QueuedCall, UserTokenCallback};

/// Insights client that prints every call as a JSON line on stdout.
///
/// It behaves like a loaded client for token purposes: it answers
/// `getUserToken`, remembers `setUserToken`, adopts the cookie's anonymous
/// token on `init` when it has none, and notifies the change listener.
pub struct StdoutInsightsClient {
    queue: Option<Vec<QueuedCall>>,
    anonymous_token: Option<String>,
    inner: Mutex<ClientState>,
}

#[derive(Default)]
struct ClientState {
    token: Option<String>,
    listener: Option<UserTokenCallback>,
}

impl StdoutInsightsClient {
    pub fn new(
        current_token: Option<String>,
        queued_token: Option<String>,
        anonymous_token: Option<String>,
    ) -> Self {
        let queue = queued_token
            .map(|token| vec![QueuedCall::new("setUserToken", vec![json!(token)])]);
        Self {
            queue,
            anonymous_token,
            inner: Mutex::new(ClientState {
                token: current_token,
                listener: None,
            }),
        }
    }

    fn print(&self, method: &InsightsMethod, payload: &Value) {
        let line = json!({ "method": method.as_str(), "payload": payload });
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line) {
            tracing::error!("Failed to write insights call: {}", e);
        }
    }
}

impl InsightsClient for StdoutInsightsClient {
    fn call(&self, method: &InsightsMethod, payload: Value, callback: Option<UserTokenCallback>) {
        self.print(method, &payload);

        // Callbacks run after the lock is released; they write back into the
        // search session and may call into this client again.
        let notify = {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            match method {
                InsightsMethod::GetUserToken => callback.map(|cb| (cb, state.token.clone())),
                InsightsMethod::Init => {
                    if state.token.is_none() {
                        state.token = self.anonymous_token.clone();
                    }
                    None
                }
                InsightsMethod::SetUserToken => {
                    state.token = payload.as_str().map(str::to_string);
                    state.listener.clone().map(|cb| (cb, state.token.clone()))
                }
                InsightsMethod::OnUserTokenChange => {
                    state.listener = callback.clone();
                    let immediate = payload["immediate"].as_bool().unwrap_or(false);
                    callback
                        .filter(|_| immediate)
                        .map(|cb| (cb, state.token.clone()))
                }
                _ => None,
            }
        };

        if let Some((callback, token)) = notify {
            callback(token);
        }
    }

    fn queue(&self) -> Option<Vec<QueuedCall>> {
        self.queue.clone()
    }
}
