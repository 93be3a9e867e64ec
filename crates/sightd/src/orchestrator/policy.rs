//! Backend selection policy.
//!
//! Pure function of the probe results, the remote credential and the request
//! shape. The engine calls it once per request, before any adapter runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use sight_common::{BackendKind, SightError};

use crate::probes::Reachability;

/// Which backend is preferred when both are ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Cloud model first, on-device model as fallback
    #[default]
    RemoteFirst,
    /// On-device model first, cloud model as fallback
    LocalFirst,
}

impl RoutingPolicy {
    /// Backends in order of preference
    pub fn preference(self) -> [BackendKind; 2] {
        match self {
            Self::RemoteFirst => [BackendKind::Remote, BackendKind::Local],
            Self::LocalFirst => [BackendKind::Local, BackendKind::Remote],
        }
    }

    /// Choose the primary backend and the eligible fallback, if any
    pub fn plan(
        self,
        offline_image: OfflineImagePolicy,
        conditions: &RouteConditions,
    ) -> Result<RoutePlan, SightError> {
        if conditions.has_image && !conditions.reachability.network {
            match offline_image {
                OfflineImagePolicy::Reject => return Err(SightError::OfflineImageUnavailable),
                OfflineImagePolicy::UseLocal if !conditions.local_ready() => {
                    return Err(SightError::NoBackendAvailable)
                }
                OfflineImagePolicy::UseLocal => {}
            }
        }

        let [first, second] = self.preference();
        let primary = if conditions.is_ready(first) {
            first
        } else if conditions.is_ready(second) {
            second
        } else {
            return Err(SightError::NoBackendAvailable);
        };

        let other = primary.other();
        let fallback = conditions.is_ready(other).then_some(other);
        Ok(RoutePlan { primary, fallback })
    }
}

impl fmt::Display for RoutingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoteFirst => write!(f, "remote_first"),
            Self::LocalFirst => write!(f, "local_first"),
        }
    }
}

/// What to do with an image request while the device is offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineImagePolicy {
    /// Send it to the local backend if that is up
    #[default]
    UseLocal,
    /// Refuse with a distinct offline error
    Reject,
}

impl fmt::Display for OfflineImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UseLocal => write!(f, "use_local"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Everything the policy looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteConditions {
    pub reachability: Reachability,
    pub remote_credential: bool,
    pub has_image: bool,
}

impl RouteConditions {
    /// Remote needs both network and a credential
    pub fn remote_ready(&self) -> bool {
        self.reachability.network && self.remote_credential
    }

    pub fn local_ready(&self) -> bool {
        self.reachability.local
    }

    pub fn is_ready(&self, backend: BackendKind) -> bool {
        match backend {
            BackendKind::Local => self.local_ready(),
            BackendKind::Remote => self.remote_ready(),
        }
    }
}

/// Primary backend plus at most one fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePlan {
    pub primary: BackendKind,
    pub fallback: Option<BackendKind>,
}
