//! Collaborators owned by the hosting search instance.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::{InsightsEvent, SearchParameters};

/// The search API client configured on the search instance.
///
/// Clients expose credentials either directly or through the headers their
/// transport attaches to every request; implement whichever applies.
pub trait SearchClient: Send + Sync {
    fn application_id(&self) -> Option<String> {
        None
    }

    fn api_key(&self) -> Option<String> {
        None
    }

    fn transport_headers(&self) -> Option<HashMap<String, String>> {
        None
    }
}

/// The live search session ("helper").
pub trait SearchHelper: Send + Sync {
    fn state(&self) -> SearchParameters;

    /// Replace the parameters without notifying change subscribers.
    fn override_state_without_triggering_change_event(&self, state: SearchParameters);

    /// Replace the parameters and notify change subscribers.
    fn set_state(&self, state: SearchParameters);
}

/// The search instance the middleware is attached to.
pub trait SearchInstance: Send + Sync {
    fn client(&self) -> Arc<dyn SearchClient>;

    /// `None` until the instance has started its main session.
    fn helper(&self) -> Option<Arc<dyn SearchHelper>>;

    /// Request a search. Implementations debounce repeated requests.
    fn schedule_search(&self);

    fn event_slot(&self) -> &InsightsEventSlot;
}

/// What happened to an event handed to the insights slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Sent to the insights client.
    Forwarded,
    /// Handed to the user-supplied `on_event` handler.
    Delegated,
    /// Dropped: the event carries no insights method.
    MissingInsightsMethod,
    /// Dropped: the session has no user token.
    MissingUserToken,
    /// Dropped: no middleware is listening.
    Inactive,
}

impl DispatchOutcome {
    pub fn is_dropped(&self) -> bool {
        !matches!(self, DispatchOutcome::Forwarded | DispatchOutcome::Delegated)
    }
}

/// Receiver of widget events.
pub trait InsightsEventSink: Send + Sync {
    fn send_event(&self, event: &InsightsEvent) -> DispatchOutcome;
}

/// The single place widgets report insights events to.
///
/// Empty by default; sending into an empty slot is a no-op. The middleware
/// registers its gateway when it starts and unregisters it on teardown.
#[derive(Default)]
pub struct InsightsEventSlot {
    sink: RwLock<Option<Arc<dyn InsightsEventSink>>>,
}

impl InsightsEventSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn InsightsEventSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn unregister(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_registered(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn send_event_to_insights(&self, event: &InsightsEvent) -> DispatchOutcome {
        // Release the lock before dispatching so the sink may touch the slot.
        let sink = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sink {
            Some(sink) => sink.send_event(event),
            None => DispatchOutcome::Inactive,
        }
    }
}

impl std::fmt::Debug for InsightsEventSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightsEventSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(DispatchOutcome);

    impl InsightsEventSink for Always {
        fn send_event(&self, _event: &InsightsEvent) -> DispatchOutcome {
            self.0
        }
    }

    #[test]
    fn test_empty_slot_is_inactive() {
        let slot = InsightsEventSlot::new();
        let outcome = slot.send_event_to_insights(&InsightsEvent::new("ais.hits", "view"));
        assert_eq!(outcome, DispatchOutcome::Inactive);
        assert!(outcome.is_dropped());
    }

    #[test]
    fn test_register_then_unregister() {
        let slot = InsightsEventSlot::new();
        slot.register(Arc::new(Always(DispatchOutcome::Forwarded)));
        assert!(slot.is_registered());

        let event = InsightsEvent::new("ais.hits", "click");
        assert_eq!(slot.send_event_to_insights(&event), DispatchOutcome::Forwarded);

        slot.unregister();
        assert_eq!(slot.send_event_to_insights(&event), DispatchOutcome::Inactive);
    }
}
