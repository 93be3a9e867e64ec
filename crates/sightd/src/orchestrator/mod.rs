//! Backend orchestration.
//!
//! Flow:
//! 1. Probe local service and network concurrently
//! 2. Policy picks the primary backend and the eligible fallback
//! 3. Primary attempt, then at most one fallback attempt
//! 4. Sanitized text or a typed error

pub mod engine;
pub mod policy;

pub use engine::{OrchestrationReport, Orchestrator};
pub use policy::{OfflineImagePolicy, RouteConditions, RoutePlan, RoutingPolicy};
