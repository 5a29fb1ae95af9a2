//! Model routing.
//!
//! A priority-ordered decision table maps `(task type, complexity, options)`
//! to a concrete provider+model; `route_and_track` then invokes the chosen
//! provider and records usage telemetry for the call.

pub mod router;
pub mod rules;
pub mod types;

pub use router::ModelRouter;
pub use rules::{DEFAULT_RULES, RouteSignals, RoutingRule, catalog};
pub use types::{
    CallContext, CallMetadata, CallUsage, Intent, PrivacyLevel, RetryPolicy, RouteOptions,
    RoutingDecision, TrackedResponse,
};
