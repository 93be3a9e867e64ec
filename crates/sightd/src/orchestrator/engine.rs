//! Routing engine.
//!
//! ```text
//! SelectPrimary → AttemptPrimary → Success
//!                       ↓
//!                 AttemptFallback → Success
//!                       ↓
//!                   Exhausted
//! ```
//!
//! ## Invariants
//!
//! 1. Probes run once per request, concurrently, before any adapter call
//! 2. At most one fallback hop; adapter calls never overlap
//! 3. A backend is only attempted if its precondition held at probe time
//! 4. Every attempt is recorded, successful or not

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use sight_common::{
    sanitize, AnalysisRequest, AttemptOutcome, AttemptRecord, AttemptRole, BackendError,
    BackendErrorKind, BackendKind, BackendUsed, CanonicalResult, SightError,
};

use super::policy::{OfflineImagePolicy, RouteConditions, RoutePlan, RoutingPolicy};
use crate::backends::InferenceBackend;
use crate::probes::{Reachability, ReachabilityProbe};

/// Routing states. Fallback can only move to a terminal state.
#[derive(Debug)]
enum Stage {
    SelectPrimary,
    AttemptPrimary(RoutePlan),
    AttemptFallback {
        backend: BackendKind,
        primary_error: BackendError,
    },
    Success(CanonicalResult),
    Exhausted(SightError),
}

/// Everything that happened while serving one request
#[derive(Debug)]
pub struct OrchestrationReport {
    pub reachability: Reachability,
    pub attempts: Vec<AttemptRecord>,
    pub outcome: Result<CanonicalResult, SightError>,
}

impl OrchestrationReport {
    /// Number of adapter calls made
    pub fn attempt_count(&self) -> usize {
        self.attempts.len()
    }

    pub fn into_result(self) -> Result<CanonicalResult, SightError> {
        self.outcome
    }
}

pub struct Orchestrator {
    local: Arc<dyn InferenceBackend>,
    remote: Arc<dyn InferenceBackend>,
    probe: Arc<dyn ReachabilityProbe>,
    policy: RoutingPolicy,
    offline_image: OfflineImagePolicy,
}

impl Orchestrator {
    pub fn new(
        local: Arc<dyn InferenceBackend>,
        remote: Arc<dyn InferenceBackend>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        Self {
            local,
            remote,
            probe,
            policy: RoutingPolicy::default(),
            offline_image: OfflineImagePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_offline_image(mut self, offline_image: OfflineImagePolicy) -> Self {
        self.offline_image = offline_image;
        self
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    pub fn offline_image(&self) -> OfflineImagePolicy {
        self.offline_image
    }

    pub fn probe(&self) -> &Arc<dyn ReachabilityProbe> {
        &self.probe
    }

    pub fn backend(&self, kind: BackendKind) -> &Arc<dyn InferenceBackend> {
        match kind {
            BackendKind::Local => &self.local,
            BackendKind::Remote => &self.remote,
        }
    }

    /// Whether the remote backend holds a credential
    pub fn remote_credential(&self) -> bool {
        self.remote.is_configured()
    }

    /// Probe, then route
    pub async fn run(&self, request: &AnalysisRequest) -> OrchestrationReport {
        let reachability = self.probe.probe_all().await;
        self.run_with(reachability, request).await
    }

    /// Route with probe results already in hand
    pub async fn run_with(
        &self,
        reachability: Reachability,
        request: &AnalysisRequest,
    ) -> OrchestrationReport {
        let start = Instant::now();
        let conditions = RouteConditions {
            reachability,
            remote_credential: self.remote_credential(),
            has_image: request.has_image(),
        };
        info!(
            "[P]  local={} network={} credential={} image={} audio={}",
            reachability.local,
            reachability.network,
            conditions.remote_credential,
            request.has_image(),
            request.has_audio()
        );

        let mut attempts = Vec::new();
        let mut stage = Stage::SelectPrimary;

        let outcome = loop {
            stage = match stage {
                Stage::SelectPrimary => match self.policy.plan(self.offline_image, &conditions) {
                    Ok(plan) => {
                        debug!("Route plan: {:?} ({})", plan, self.policy);
                        Stage::AttemptPrimary(plan)
                    }
                    Err(e) => Stage::Exhausted(e),
                },
                Stage::AttemptPrimary(plan) => {
                    match self
                        .attempt(plan.primary, AttemptRole::Primary, request, &mut attempts)
                        .await
                    {
                        Ok(result) => Stage::Success(result),
                        Err(err) => match plan.fallback {
                            Some(backend) => Stage::AttemptFallback {
                                backend,
                                primary_error: err,
                            },
                            None => Stage::Exhausted(SightError::AllBackendsFailed {
                                attempts: vec![err],
                            }),
                        },
                    }
                }
                Stage::AttemptFallback {
                    backend,
                    primary_error,
                } => {
                    match self
                        .attempt(backend, AttemptRole::Fallback, request, &mut attempts)
                        .await
                    {
                        Ok(result) => Stage::Success(result),
                        Err(err) => Stage::Exhausted(SightError::AllBackendsFailed {
                            attempts: vec![primary_error, err],
                        }),
                    }
                }
                Stage::Success(result) => break Ok(result),
                Stage::Exhausted(e) => break Err(e),
            };
        };

        let elapsed_ms = start.elapsed().as_millis();
        match &outcome {
            Ok(result) => info!(
                "[+]  Answered by {} model={} in {}ms",
                result.backend_used(),
                result.model(),
                elapsed_ms
            ),
            Err(e) => warn!("[!]  No answer after {}ms: {}", elapsed_ms, e),
        }

        OrchestrationReport {
            reachability,
            attempts,
            outcome,
        }
    }

    /// Convenience wrapper returning only the result
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<CanonicalResult, SightError> {
        self.run(request).await.into_result()
    }

    async fn attempt(
        &self,
        kind: BackendKind,
        role: AttemptRole,
        request: &AnalysisRequest,
        attempts: &mut Vec<AttemptRecord>,
    ) -> Result<CanonicalResult, BackendError> {
        let backend = self.backend(kind);
        let model = backend.model_for(request);
        info!("[{}] Trying {} backend ({})", role_tag(role), kind, model);

        let reply = backend.analyze(request).await.and_then(|text| {
            let text = sanitize(&text);
            if text.is_empty() {
                Err(BackendError::new(
                    kind,
                    BackendErrorKind::Malformed,
                    "reply was empty after sanitizing",
                ))
            } else {
                Ok(text)
            }
        });

        match reply {
            Ok(text) => {
                attempts.push(AttemptRecord {
                    backend: kind,
                    role,
                    model: model.clone(),
                    outcome: AttemptOutcome::Succeeded,
                });
                Ok(CanonicalResult::new(
                    text,
                    BackendUsed::new(kind, role),
                    model,
                ))
            }
            Err(e) => {
                warn!("[!]  {} attempt on {} ({}) failed: {}", role, kind, model, e);
                attempts.push(AttemptRecord {
                    backend: kind,
                    role,
                    model,
                    outcome: AttemptOutcome::Failed(e.clone()),
                });
                Err(e)
            }
        }
    }
}

fn role_tag(role: AttemptRole) -> &'static str {
    match role {
        AttemptRole::Primary => "1",
        AttemptRole::Fallback => "2",
    }
}
