use std::sync::Arc;

use crate::client::{InsightsClient, InsightsMethod};
use crate::host::{DispatchOutcome, InsightsEventSink, SearchHelper};
use crate::types::InsightsEvent;

/// User-supplied replacement for the default dispatch. Receives the event and
/// the raw insights client.
pub type InsightsEventHandler = Arc<dyn Fn(&InsightsEvent, &dyn InsightsClient) + Send + Sync>;

/// Forwards widget events to the insights client.
///
/// With a custom handler configured every event goes to the handler as is.
/// Otherwise an event is sent only if it names an insights method and the
/// session has a user token; anything else is dropped with a warning rather
/// than sent half-formed or unattributed.
pub struct EventDispatchGateway {
    client: Arc<dyn InsightsClient>,
    helper: Arc<dyn SearchHelper>,
    on_event: Option<InsightsEventHandler>,
}

impl EventDispatchGateway {
    pub fn new(
        client: Arc<dyn InsightsClient>,
        helper: Arc<dyn SearchHelper>,
        on_event: Option<InsightsEventHandler>,
    ) -> Self {
        Self {
            client,
            helper,
            on_event,
        }
    }
}

impl InsightsEventSink for EventDispatchGateway {
    fn send_event(&self, event: &InsightsEvent) -> DispatchOutcome {
        if let Some(ref on_event) = self.on_event {
            on_event(event, self.client.as_ref());
            return DispatchOutcome::Delegated;
        }

        let Some(method) = event.method() else {
            tracing::warn!(
                widget_type = %event.widget_type,
                event_type = %event.event_type,
                "[insights] Cannot send event to Algolia Insights because `insightsMethod` option is missing"
            );
            return DispatchOutcome::MissingInsightsMethod;
        };

        if !self.helper.state().has_user_token() {
            tracing::warn!(
                insights_method = method,
                widget_type = %event.widget_type,
                "[insights] Cannot send event to Algolia Insights because `userToken` is not set"
            );
            return DispatchOutcome::MissingUserToken;
        }

        tracing::trace!(insights_method = method, "[insights] Forwarding event");
        self.client
            .call(&InsightsMethod::from(method), event.payload.clone(), None);
        DispatchOutcome::Forwarded
    }
}
