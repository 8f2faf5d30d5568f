use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::anonymous::AnonymousTokenStore;
use super::config::{InsightsClientConfig, InsightsMiddlewareConfig};
use super::credentials::extract_credentials;
use super::gateway::{EventDispatchGateway, InsightsEventHandler};
use super::reconciler::{TokenReconciler, TokenSource, TokenSources};
use super::synchronizer::StateSynchronizer;
use crate::client::{InsightsClient, InsightsMethod, NoopInsightsClient, UserTokenCallback};
use crate::error::{InsightsError, Result};
use crate::host::SearchInstance;
use crate::types::{Credentials, UserToken};

/// Agent string registered with the insights client on startup.
pub const INSIGHTS_MIDDLEWARE_AGENT: &str = "insights-middleware";

/// Hooks a search instance drives on each of its middlewares.
pub trait Middleware {
    /// Called after every search state change.
    fn on_state_change(&mut self) {}

    /// Called when the middleware is added to the instance.
    fn subscribe(&mut self) {}

    /// Called once the instance has started its main search session.
    fn started(&mut self) -> Result<()>;

    /// Called when the middleware is removed or the instance is disposed.
    fn unsubscribe(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Started,
    Unsubscribed,
}

/// Keeps an Insights client and a search instance in agreement about the
/// user token, and routes widget events to the client.
///
/// Binding (`new`) extracts credentials, scans the client's pre-load queue,
/// asks for the current token and calls `init`. `started` resolves the token,
/// turns on `clickAnalytics` and installs the event gateway; `unsubscribe`
/// undoes all of it. The pair may be repeated.
pub struct InsightsMiddleware {
    instance: Arc<dyn SearchInstance>,
    client: Arc<dyn InsightsClient>,
    has_insights_client: bool,
    credentials: Credentials,
    reconciler: TokenReconciler,
    anonymous_tokens: Arc<dyn AnonymousTokenStore>,
    on_event: Option<InsightsEventHandler>,
    state: LifecycleState,
    /// Bumped on every start and teardown; listeners from an older
    /// activation compare against it and stay silent.
    generation: Arc<AtomicU64>,
    synchronizer: Option<Arc<StateSynchronizer>>,
}

impl InsightsMiddleware {
    pub fn new(config: InsightsMiddlewareConfig, instance: Arc<dyn SearchInstance>) -> Result<Self> {
        let (client, has_insights_client): (Arc<dyn InsightsClient>, bool) =
            match config.insights_client {
                None => return Err(InsightsError::MissingInsightsClient),
                Some(InsightsClientConfig::Disabled) => (Arc::new(NoopInsightsClient), false),
                Some(InsightsClientConfig::Client(client)) => (client, true),
            };

        let init_params = config.insights_init_params.unwrap_or_default();
        init_params.validate()?;

        let credentials = extract_credentials(instance.client().as_ref())?;
        let reconciler = TokenReconciler::new(client.as_ref());
        client.call(
            &InsightsMethod::Init,
            init_params.init_payload(&credentials)?,
            None,
        );

        tracing::debug!(
            app_id = %credentials.app_id,
            has_insights_client,
            "[insights] Middleware bound to search instance"
        );

        Ok(Self {
            instance,
            client,
            has_insights_client,
            credentials,
            reconciler,
            anonymous_tokens: config.anonymous_tokens,
            on_event: config.on_event,
            state: LifecycleState::Constructed,
            generation: Arc::new(AtomicU64::new(0)),
            synchronizer: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token_sources(&self) -> TokenSources {
        self.reconciler.sources()
    }

    pub fn has_insights_client(&self) -> bool {
        self.has_insights_client
    }

    fn user_token_listener(
        &self,
        synchronizer: &Arc<StateSynchronizer>,
        activation: u64,
    ) -> UserTokenCallback {
        let generation = Arc::clone(&self.generation);
        let synchronizer = Arc::clone(synchronizer);
        Arc::new(move |token: Option<UserToken>| {
            if generation.load(Ordering::SeqCst) != activation {
                tracing::debug!("[insights] Ignoring user token change from a stale activation");
                return;
            }
            // An absent token never clears the one the session already has.
            if let Some(token) = token.filter(|t| !t.is_empty()) {
                synchronizer.set_user_token(Some(token));
            }
        })
    }
}

impl Middleware for InsightsMiddleware {
    fn started(&mut self) -> Result<()> {
        if self.state == LifecycleState::Started {
            tracing::warn!("[insights] started() called twice without unsubscribe(); ignoring");
            return Ok(());
        }
        let helper = self.instance.helper().ok_or(InsightsError::HelperNotReady)?;

        self.client.call(
            &InsightsMethod::AddAlgoliaAgent,
            json!(INSIGHTS_MIDDLEWARE_AGENT),
            None,
        );

        let synchronizer = Arc::new(StateSynchronizer::new(
            Arc::clone(&helper),
            Arc::clone(&self.instance),
        ));
        synchronizer.capture_snapshot();
        synchronizer.set_click_analytics(true);

        let anonymous = if self.has_insights_client {
            self.anonymous_tokens.anonymous_user_token()
        } else {
            None
        };
        match self.reconciler.reconcile(anonymous) {
            Some(resolved) => {
                tracing::debug!(
                    source = resolved.source.as_str(),
                    "[insights] Resolved user token"
                );
                if resolved.source != TokenSource::Anonymous {
                    self.client.call(
                        &InsightsMethod::SetUserToken,
                        json!(resolved.token),
                        None,
                    );
                }
                synchronizer.set_user_token(Some(resolved.token));
            }
            None => tracing::debug!("[insights] No user token to apply; session token untouched"),
        }

        let activation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.client.call(
            &InsightsMethod::OnUserTokenChange,
            json!({ "immediate": true }),
            Some(self.user_token_listener(&synchronizer, activation)),
        );

        self.instance
            .event_slot()
            .register(Arc::new(EventDispatchGateway::new(
                Arc::clone(&self.client),
                helper,
                self.on_event.clone(),
            )));

        self.synchronizer = Some(synchronizer);
        self.state = LifecycleState::Started;
        tracing::debug!(activation, "[insights] Middleware started");
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if self.state != LifecycleState::Started {
            tracing::debug!(state = ?self.state, "[insights] unsubscribe() while not started");
            return;
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.client
            .call(&InsightsMethod::OnUserTokenChange, Value::Null, None);
        self.instance.event_slot().unregister();

        if let Some(synchronizer) = self.synchronizer.take() {
            synchronizer.restore();
        }
        self.reconciler.reset();

        self.state = LifecycleState::Unsubscribed;
        tracing::debug!("[insights] Middleware unsubscribed");
    }
}
