//! Insights middleware: keeps a search instance and an Algolia Insights
//! client in agreement about the user token and routes widget events to
//! the client.
//!
//! Token sources are reconciled in [`reconciler`], session writes go
//! through [`synchronizer`], widget events pass [`gateway`], and
//! [`lifecycle`] ties them to the search instance's start/teardown hooks.

pub mod anonymous;
pub mod config;
pub mod credentials;
pub mod gateway;
pub mod lifecycle;
pub mod reconciler;
pub mod synchronizer;

pub use anonymous::{AnonymousTokenStore, CookieTokenStore, NoAnonymousToken};
pub use config::{InsightsClientConfig, InsightsInitParams, InsightsMiddlewareConfig};
pub use credentials::extract_credentials;
pub use gateway::{EventDispatchGateway, InsightsEventHandler};
pub use lifecycle::{InsightsMiddleware, LifecycleState, Middleware, INSIGHTS_MIDDLEWARE_AGENT};
pub use reconciler::{ResolvedToken, TokenReconciler, TokenSource, TokenSources};
pub use synchronizer::StateSynchronizer;
