//! # Flapjack Insights
//!
//! Connects a search instance to an Algolia-compatible Insights client.
//! The [`InsightsMiddleware`] resolves which user token the search session
//! should carry, turns on `clickAnalytics`, and gives widgets a single slot
//! to report views, clicks and conversions through.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use flapjack_insights::memory::{InMemorySearchClient, InMemorySearchInstance};
//! use flapjack_insights::{InsightsEvent, InsightsMiddleware, InsightsMiddlewareConfig, Middleware};
//! use flapjack_insights::{InsightsClient, InsightsMethod, UserTokenCallback};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl InsightsClient for Printer {
//!     fn call(&self, method: &InsightsMethod, payload: Value, _cb: Option<UserTokenCallback>) {
//!         println!("{} {}", method, payload);
//!     }
//! }
//!
//! # fn main() -> flapjack_insights::Result<()> {
//! let instance = Arc::new(InMemorySearchInstance::with_session(
//!     Arc::new(InMemorySearchClient::new("APP_ID", "SEARCH_KEY")),
//!     Default::default(),
//! ));
//!
//! let mut middleware =
//!     InsightsMiddleware::new(InsightsMiddlewareConfig::new(Arc::new(Printer)), instance.clone())?;
//! middleware.started()?;
//!
//! instance.send_event_to_insights(
//!     &InsightsEvent::new("ais.hits", "click")
//!         .with_method("clickedObjectIDsAfterSearch")
//!         .with_payload(json!({"eventName": "Hit Clicked", "objectIDs": ["1"]})),
//! );
//!
//! middleware.unsubscribe();
//! # Ok(())
//! # }
//! ```
//!
//! Without a user token (explicit, queued or anonymous) the event above is
//! dropped with a warning instead of being sent unattributed.

pub mod client;
pub mod error;
pub mod host;
pub mod memory;
pub mod middleware;
pub mod types;

pub use client::{InsightsClient, InsightsMethod, NoopInsightsClient, QueuedCall, UserTokenCallback};
pub use error::{InsightsError, Result};
pub use host::{
    DispatchOutcome, InsightsEventSink, InsightsEventSlot, SearchClient, SearchHelper,
    SearchInstance,
};
pub use middleware::{
    InsightsClientConfig, InsightsInitParams, InsightsMiddleware, InsightsMiddlewareConfig,
    LifecycleState, Middleware,
};
pub use types::*;
