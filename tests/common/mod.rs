#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use flapjack_insights::memory::{InMemorySearchClient, InMemorySearchInstance};
use flapjack_insights::{InsightsClient, InsightsMethod, QueuedCall, SearchParameters, UserTokenCallback};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub payload: Value,
    pub has_callback: bool,
}

#[derive(Default)]
struct StubState {
    loaded: bool,
    token: Option<String>,
    listener: Option<UserTokenCallback>,
    last_listener: Option<UserTokenCallback>,
    pending_get_user_token: Vec<UserTokenCallback>,
}

/// Insights client double.
///
/// Records every call. While "not loaded" it holds `getUserToken` callbacks
/// back until [`RecordingInsightsClient::finish_loading`] runs, the way the
/// real client's snippet does before its script arrives.
#[derive(Default)]
pub struct RecordingInsightsClient {
    calls: Mutex<Vec<RecordedCall>>,
    queue: Option<Vec<QueuedCall>>,
    state: Mutex<StubState>,
}

impl RecordingInsightsClient {
    /// Loaded client currently holding `token`.
    pub fn loaded(token: Option<&str>) -> Arc<Self> {
        let client = Self::default();
        {
            let mut state = client.state.lock().unwrap();
            state.loaded = true;
            state.token = token.map(str::to_string);
        }
        Arc::new(client)
    }

    /// Client still loading, with `queue` recorded by its snippet.
    pub fn loading(queue: Option<Vec<QueuedCall>>) -> Arc<Self> {
        Arc::new(Self {
            queue,
            ..Default::default()
        })
    }

    /// Finish loading with `token` and answer held-back `getUserToken` calls.
    pub fn finish_loading(&self, token: Option<&str>) {
        let pending = {
            let mut state = self.state.lock().unwrap();
            state.loaded = true;
            state.token = token.map(str::to_string);
            std::mem::take(&mut state.pending_get_user_token)
        };
        for callback in pending {
            callback(token.map(str::to_string));
        }
    }

    /// Simulate an application calling `setUserToken` on the client directly.
    pub fn change_user_token(&self, token: Option<&str>) {
        let listener = {
            let mut state = self.state.lock().unwrap();
            state.token = token.map(str::to_string);
            state.listener.clone()
        };
        if let Some(listener) = listener {
            listener(token.map(str::to_string));
        }
    }

    /// Most recent listener ever registered, even if since removed.
    pub fn last_listener(&self) -> Option<UserTokenCallback> {
        self.state.lock().unwrap().last_listener.clone()
    }

    pub fn has_listener(&self) -> bool {
        self.state.lock().unwrap().listener.is_some()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.method).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl InsightsClient for RecordingInsightsClient {
    fn call(&self, method: &InsightsMethod, payload: Value, callback: Option<UserTokenCallback>) {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.as_str().to_string(),
            payload: payload.clone(),
            has_callback: callback.is_some(),
        });

        let notify = {
            let mut state = self.state.lock().unwrap();
            match method {
                InsightsMethod::GetUserToken => match callback {
                    Some(cb) if state.loaded => Some((cb, state.token.clone())),
                    Some(cb) => {
                        state.pending_get_user_token.push(cb);
                        None
                    }
                    None => None,
                },
                InsightsMethod::SetUserToken => {
                    state.token = payload.as_str().map(str::to_string);
                    state.listener.clone().map(|cb| (cb, state.token.clone()))
                }
                InsightsMethod::OnUserTokenChange => {
                    state.listener = callback.clone();
                    if callback.is_some() {
                        state.last_listener = callback.clone();
                    }
                    let immediate = payload["immediate"].as_bool().unwrap_or(false);
                    match callback {
                        Some(cb) if immediate && state.loaded => Some((cb, state.token.clone())),
                        _ => None,
                    }
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

pub fn set_user_token_call(token: &str) -> QueuedCall {
    QueuedCall::new("setUserToken", vec![json!(token)])
}

pub fn search_client() -> Arc<InMemorySearchClient> {
    Arc::new(InMemorySearchClient::new("APP_ID", "SEARCH_KEY"))
}

/// Instance with a running session holding `userToken` / `clickAnalytics`.
pub fn instance_with(user_token: Option<&str>, click_analytics: Option<bool>) -> Arc<InMemorySearchInstance> {
    let mut params = SearchParameters {
        user_token: user_token.map(str::to_string),
        click_analytics,
        ..Default::default()
    };
    params.other.insert("query".to_string(), json!("laptop"));
    Arc::new(InMemorySearchInstance::with_session(search_client(), params))
}

pub fn session_params(instance: &InMemorySearchInstance) -> SearchParameters {
    use flapjack_insights::SearchHelper;
    instance.session().expect("session started").state()
}

/// Counts `WARN` events seen while it is the active subscriber.
#[derive(Clone, Default)]
pub struct WarningCounter(Arc<AtomicUsize>);

impl WarningCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` and report how many warnings it emitted.
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let counter = WarningCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter.count())
}
