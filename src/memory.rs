//! In-process search instance for embedding, replay tooling and tests.
//!
//! Nothing here executes queries; it only keeps the session parameters and
//! counts what the middleware asked for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::host::{DispatchOutcome, InsightsEventSlot, SearchClient, SearchHelper, SearchInstance};
use crate::types::{InsightsEvent, SearchParameters};

/// Search client with fixed credentials.
#[derive(Debug, Clone, Default)]
pub struct InMemorySearchClient {
    pub app_id: Option<String>,
    pub api_key: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

impl InMemorySearchClient {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            api_key: Some(api_key.into()),
            headers: None,
        }
    }

    /// A client that only carries credentials as transport headers.
    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        Self {
            headers: Some(headers),
            ..Default::default()
        }
    }
}

impl SearchClient for InMemorySearchClient {
    fn application_id(&self) -> Option<String> {
        self.app_id.clone()
    }

    fn api_key(&self) -> Option<String> {
        self.api_key.clone()
    }

    fn transport_headers(&self) -> Option<HashMap<String, String>> {
        self.headers.clone()
    }
}

/// Search session holding parameters in memory.
#[derive(Debug, Default)]
pub struct InMemoryHelper {
    state: Mutex<SearchParameters>,
    change_events: AtomicUsize,
    silent_writes: AtomicUsize,
}

impl InMemoryHelper {
    pub fn new(state: SearchParameters) -> Self {
        Self {
            state: Mutex::new(state),
            ..Default::default()
        }
    }

    /// Writes that notified change subscribers.
    pub fn change_events(&self) -> usize {
        self.change_events.load(Ordering::SeqCst)
    }

    /// Writes that bypassed change notification.
    pub fn silent_writes(&self) -> usize {
        self.silent_writes.load(Ordering::SeqCst)
    }

    fn replace(&self, state: SearchParameters) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl SearchHelper for InMemoryHelper {
    fn state(&self) -> SearchParameters {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn override_state_without_triggering_change_event(&self, state: SearchParameters) {
        self.replace(state);
        self.silent_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn set_state(&self, state: SearchParameters) {
        self.replace(state);
        self.change_events.fetch_add(1, Ordering::SeqCst);
    }
}

/// Search instance whose main session can be started after construction.
pub struct InMemorySearchInstance {
    client: Arc<dyn SearchClient>,
    helper: RwLock<Option<Arc<InMemoryHelper>>>,
    scheduled_searches: AtomicUsize,
    slot: InsightsEventSlot,
}

impl InMemorySearchInstance {
    /// Instance with no session yet.
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self {
            client,
            helper: RwLock::new(None),
            scheduled_searches: AtomicUsize::new(0),
            slot: InsightsEventSlot::new(),
        }
    }

    /// Instance whose session already holds `params`.
    pub fn with_session(client: Arc<dyn SearchClient>, params: SearchParameters) -> Self {
        let instance = Self::new(client);
        instance.start_session(params);
        instance
    }

    pub fn start_session(&self, params: SearchParameters) -> Arc<InMemoryHelper> {
        let helper = Arc::new(InMemoryHelper::new(params));
        *self.helper.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&helper));
        helper
    }

    /// The concrete session, for inspection.
    pub fn session(&self) -> Option<Arc<InMemoryHelper>> {
        self.helper
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn scheduled_searches(&self) -> usize {
        self.scheduled_searches.load(Ordering::SeqCst)
    }

    /// What a widget does to report an interaction.
    pub fn send_event_to_insights(&self, event: &InsightsEvent) -> DispatchOutcome {
        self.slot.send_event_to_insights(event)
    }
}

impl SearchInstance for InMemorySearchInstance {
    fn client(&self) -> Arc<dyn SearchClient> {
        Arc::clone(&self.client)
    }

    fn helper(&self) -> Option<Arc<dyn SearchHelper>> {
        self.session().map(|h| h as Arc<dyn SearchHelper>)
    }

    fn schedule_search(&self) {
        self.scheduled_searches.fetch_add(1, Ordering::SeqCst);
    }

    fn event_slot(&self) -> &InsightsEventSlot {
        &self.slot
    }
}
