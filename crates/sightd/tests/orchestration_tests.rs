//! Routing behavior of the orchestrator, driven with fake backends and probes.

use std::sync::Arc;

use sight_common::{
    normalize, AnalysisRequest, AnalyzeRequest, AttemptRole, BackendError, BackendErrorKind,
    BackendKind, BackendUsed, SightError,
};
use sightd::backends::FakeBackend;
use sightd::orchestrator::{OfflineImagePolicy, Orchestrator, RoutingPolicy};
use sightd::probes::{FakeReachabilityProbe, Reachability};

const IMAGE: &str = "aGVsbG8=";
const AUDIO: &str = "d29ybGQ=";

struct Harness {
    local: Arc<FakeBackend>,
    remote: Arc<FakeBackend>,
    probe: Arc<FakeReachabilityProbe>,
}

impl Harness {
    fn new(local: FakeBackend, remote: FakeBackend, probe: FakeReachabilityProbe) -> Self {
        Self {
            local: Arc::new(local),
            remote: Arc::new(remote),
            probe: Arc::new(probe),
        }
    }

    fn healthy(probe: FakeReachabilityProbe) -> Self {
        Self::new(
            FakeBackend::replying(BackendKind::Local, "local answer"),
            FakeBackend::replying(BackendKind::Remote, "remote answer"),
            probe,
        )
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(self.local.clone(), self.remote.clone(), self.probe.clone())
    }

    fn adapter_calls(&self) -> usize {
        self.local.call_count() + self.remote.call_count()
    }
}

fn request(raw: AnalyzeRequest) -> AnalysisRequest {
    normalize(&raw).unwrap()
}

/// Representative request shapes, each with at least one input
fn request_shapes() -> Vec<AnalysisRequest> {
    let mut out = Vec::new();
    for prompt in [None, Some("What is this?")] {
        for image in [None, Some(IMAGE)] {
            for audio in [None, Some(AUDIO)] {
                for initial in [false, true] {
                    if prompt.is_none() && image.is_none() && audio.is_none() {
                        continue;
                    }
                    out.push(request(AnalyzeRequest {
                        prompt: prompt.map(str::to_string),
                        image: image.map(str::to_string),
                        audio: audio.map(str::to_string),
                        is_initial_analysis: Some(initial),
                        llava_description: Some("a red bicycle".to_string()),
                        ..Default::default()
                    }));
                }
            }
        }
    }
    out
}

fn transport(kind: BackendKind) -> BackendError {
    BackendError::new(kind, BackendErrorKind::Transport, "connection refused")
}

// ============================================================================
// Primary selection
// ============================================================================

#[tokio::test]
async fn test_remote_attempted_first_for_every_shape() {
    for req in request_shapes() {
        let h = Harness::healthy(FakeReachabilityProbe::online());
        let report = h.orchestrator().run(&req).await;

        let result = report.outcome.unwrap();
        assert_eq!(result.backend_used(), BackendUsed::RemotePrimary);
        assert_eq!(report.attempts[0].backend, BackendKind::Remote);
        assert_eq!(h.remote.call_count(), 1);
        assert_eq!(h.local.call_count(), 0);
    }
}

#[tokio::test]
async fn test_no_credential_routes_to_local() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "local answer"),
        FakeBackend::replying(BackendKind::Remote, "remote answer").unconfigured(),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let report = h.orchestrator().run(&req).await;
    assert_eq!(
        report.outcome.unwrap().backend_used(),
        BackendUsed::LocalPrimary
    );
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_local_first_policy() {
    let h = Harness::healthy(FakeReachabilityProbe::online());
    let orch = h.orchestrator().with_policy(RoutingPolicy::LocalFirst);
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let result = orch.analyze(&req).await.unwrap();
    assert_eq!(result.backend_used(), BackendUsed::LocalPrimary);
    assert_eq!(result.text(), "local answer");
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_nothing_reachable_makes_no_calls() {
    let h = Harness::healthy(FakeReachabilityProbe::offline());
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let report = h.orchestrator().run(&req).await;
    assert!(matches!(report.outcome, Err(SightError::NoBackendAvailable)));
    assert!(report.attempts.is_empty());
    assert_eq!(h.adapter_calls(), 0);
}

// ============================================================================
// Offline images
// ============================================================================

#[tokio::test]
async fn test_offline_image_with_nothing_reachable_makes_no_calls() {
    let req = request(AnalyzeRequest {
        image: Some(IMAGE.to_string()),
        is_initial_analysis: Some(true),
        ..Default::default()
    });

    for policy in [OfflineImagePolicy::UseLocal, OfflineImagePolicy::Reject] {
        let h = Harness::healthy(FakeReachabilityProbe::offline());
        let report = h.orchestrator().with_offline_image(policy).run(&req).await;
        match report.outcome {
            Err(SightError::NoBackendAvailable) | Err(SightError::OfflineImageUnavailable) => {}
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(h.adapter_calls(), 0);
    }
}

#[tokio::test]
async fn test_offline_initial_image_uses_local_vision_model() {
    let h = Harness::healthy(FakeReachabilityProbe::new(true, false));
    let req = request(AnalyzeRequest {
        image: Some(IMAGE.to_string()),
        is_initial_analysis: Some(true),
        ..Default::default()
    });

    let report = h.orchestrator().run(&req).await;
    let result = report.outcome.unwrap();
    assert_eq!(result.backend_used(), BackendUsed::LocalPrimary);
    assert_eq!(result.model(), "llava");

    let calls = h.local.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, "llava");
    assert!(calls[0].has_image);
    assert_eq!(h.remote.call_count(), 0);
}

#[tokio::test]
async fn test_offline_image_reject_policy() {
    let h = Harness::healthy(FakeReachabilityProbe::new(true, false));
    let req = request(AnalyzeRequest {
        image: Some(IMAGE.to_string()),
        ..Default::default()
    });

    let err = h
        .orchestrator()
        .with_offline_image(OfflineImagePolicy::Reject)
        .analyze(&req)
        .await
        .unwrap_err();
    assert!(matches!(err, SightError::OfflineImageUnavailable));
    assert_eq!(err.status_code(), 400);
    assert_eq!(h.adapter_calls(), 0);
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn test_single_fallback_hop_on_primary_failure() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "local answer"),
        FakeBackend::failing(BackendKind::Remote, transport(BackendKind::Remote)),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let report = h.orchestrator().run(&req).await;
    assert_eq!(report.attempt_count(), 2);
    assert_eq!(report.attempts[1].role, AttemptRole::Fallback);
    let result = report.outcome.unwrap();
    assert_eq!(result.backend_used(), BackendUsed::LocalFallback);
    assert_eq!(result.text(), "local answer");
}

#[tokio::test]
async fn test_markup_only_reply_falls_back() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "real answer"),
        FakeBackend::replying(BackendKind::Remote, "## **\n__"),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let report = h.orchestrator().run(&req).await;
    assert_eq!(report.attempt_count(), 2);
    assert!(!report.attempts[0].succeeded());
    assert_eq!(h.local.call_count(), 1);
    let result = report.outcome.unwrap();
    assert_eq!(result.backend_used(), BackendUsed::LocalFallback);
    assert_eq!(result.text(), "real answer");
}

#[tokio::test]
async fn test_markup_only_from_both_is_all_failed() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "***"),
        FakeBackend::replying(BackendKind::Remote, "# \n"),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    match h.orchestrator().run(&req).await.outcome {
        Err(SightError::AllBackendsFailed { attempts }) => {
            assert_eq!(attempts.len(), 2);
            assert!(attempts
                .iter()
                .all(|e| e.kind == BackendErrorKind::Malformed));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_both_failing_never_makes_a_third_attempt() {
    for policy in [RoutingPolicy::RemoteFirst, RoutingPolicy::LocalFirst] {
        let h = Harness::new(
            FakeBackend::failing(BackendKind::Local, transport(BackendKind::Local)),
            FakeBackend::failing(
                BackendKind::Remote,
                BackendError::remote(BackendErrorKind::Timeout, "deadline"),
            ),
            FakeReachabilityProbe::online(),
        );
        let req = request(AnalyzeRequest {
            prompt: Some("hello".to_string()),
            ..Default::default()
        });

        let report = h.orchestrator().with_policy(policy).run(&req).await;
        assert_eq!(h.adapter_calls(), 2);
        assert_eq!(h.local.call_count(), 1);
        assert_eq!(h.remote.call_count(), 1);
        match report.outcome {
            Err(SightError::AllBackendsFailed { attempts }) => assert_eq!(attempts.len(), 2),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_ineligible_fallback_is_not_attempted() {
    // Network is up but the local service is not: remote failure is terminal
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "local answer"),
        FakeBackend::failing(
            BackendKind::Remote,
            BackendError::remote(BackendErrorKind::Quota, "quota exceeded"),
        ),
        FakeReachabilityProbe::new(false, true),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let err = h.orchestrator().analyze(&req).await.unwrap_err();
    match &err {
        SightError::AllBackendsFailed { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].kind, BackendErrorKind::Quota);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.status_code(), 500);
    assert_eq!(h.local.call_count(), 0);
}

#[tokio::test]
async fn test_fallback_sees_the_same_prompt() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "local answer"),
        FakeBackend::failing(BackendKind::Remote, transport(BackendKind::Remote)),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("What color is it?".to_string()),
        llava_description: Some("a red bicycle".to_string()),
        is_initial_analysis: Some(false),
        ..Default::default()
    });

    h.orchestrator().analyze(&req).await.unwrap();
    assert_eq!(h.remote.calls()[0].prompt, h.local.calls()[0].prompt);
    assert_eq!(h.local.calls()[0].prompt, req.effective_prompt());
}

// ============================================================================
// End to end scenarios
// ============================================================================

#[tokio::test]
async fn test_follow_up_question_goes_to_remote_with_context() {
    let h = Harness::new(
        FakeBackend::replying(BackendKind::Local, "local answer"),
        FakeBackend::replying(
            BackendKind::Remote,
            "## Color\n\nThe bicycle is **red**, with a _wicker_ basket.",
        ),
        FakeReachabilityProbe::online(),
    );
    let req = request(AnalyzeRequest {
        prompt: Some("What color is it?".to_string()),
        llava_description: Some("a red bicycle".to_string()),
        is_initial_analysis: Some(false),
        ..Default::default()
    });

    let result = h.orchestrator().analyze(&req).await.unwrap();

    let calls = h.remote.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("a red bicycle"));
    assert!(calls[0].prompt.contains("What color is it?"));

    assert_eq!(
        result.text(),
        "Color The bicycle is red , with a wicker basket."
    );
    for marker in ['#', '*', '_', '\n'] {
        assert!(!result.text().contains(marker));
    }
}

#[tokio::test]
async fn test_run_with_skips_probing() {
    let h = Harness::healthy(FakeReachabilityProbe::online());
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    let report = h
        .orchestrator()
        .run_with(Reachability::new(true, false), &req)
        .await;
    assert_eq!(
        report.outcome.unwrap().backend_used(),
        BackendUsed::LocalPrimary
    );
    assert_eq!(h.probe.local_calls(), 0);
    assert_eq!(h.probe.remote_calls(), 0);
}

#[tokio::test]
async fn test_probes_run_once_per_request() {
    let h = Harness::healthy(FakeReachabilityProbe::online());
    let orch = h.orchestrator();
    let req = request(AnalyzeRequest {
        prompt: Some("hello".to_string()),
        ..Default::default()
    });

    orch.analyze(&req).await.unwrap();
    orch.analyze(&req).await.unwrap();
    assert_eq!(h.probe.local_calls(), 2);
    assert_eq!(h.probe.remote_calls(), 2);
}
