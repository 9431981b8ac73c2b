//! Outcomes of a template reconciliation and the status they map to

use std::time::Duration;

use crate::crd::ComponentTemplateState;
use crate::error::Error;

pub const WAITING_FOR_CLUSTER: &str = "waiting for opensearch cluster to exist";
pub const WAITING_FOR_RUNNING: &str = "waiting for opensearch cluster status to be running";
pub const TEMPLATE_EXISTS: &str =
    "component template already exists in OpenSearch; not modifying";

/// Event reason codes
pub mod reasons {
    pub const OPENSEARCH_ERROR: &str = "OpensearchError";
    pub const OPENSEARCH_PENDING: &str = "OpensearchPending";
    pub const OPENSEARCH_REF_MISMATCH: &str = "OpensearchRefMismatch";
    pub const OPENSEARCH_API_ERROR: &str = "OpensearchAPIError";
    pub const OPENSEARCH_API_UPDATED: &str = "OpensearchAPIUpdated";
    pub const STATUS_ERROR: &str = "StatusError";
    pub const NAME_MISMATCH: &str = "OpensearchComponentTemplateNameMismatch";
    pub const EXISTENCE_CHECKED: &str = "ExistenceChecked";
}

/// How the scheduler should revisit the resource
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requeue {
    After(Duration),
    AwaitChange,
}

/// Successful end of a reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The referenced cluster does not exist
    ClusterMissing,
    /// The cluster exists but is not running
    ClusterNotReady,
    /// Existence was checked with status writes disabled
    ExistenceRecorded { exists: bool },
    /// The template pre-existed and is left untouched
    Adopted,
    /// Remote template already matches the spec
    InSync,
    /// Remote template was created or overwritten
    Updated,
}

/// Failed reconciliation: user-facing reason plus the underlying error
#[derive(Debug)]
pub struct Failure {
    pub reason: String,
    pub error: Error,
}

/// Requeue intervals handed back to the scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Intervals {
    /// Waiting on a precondition
    pub pending: Duration,
    /// Steady-state poll
    pub sync: Duration,
}

/// Status fields written at the end of a reconciliation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// `None` leaves the stored state untouched
    pub state: Option<ComponentTemplateState>,
    pub reason: Option<String>,
}

impl Outcome {
    pub fn requeue(&self, intervals: &Intervals) -> Requeue {
        match self {
            Outcome::ClusterMissing | Outcome::ClusterNotReady => Requeue::After(intervals.pending),
            Outcome::ExistenceRecorded { .. } | Outcome::Adopted => Requeue::AwaitChange,
            Outcome::InSync | Outcome::Updated => Requeue::After(intervals.sync),
        }
    }

    /// Human-readable reason for waiting outcomes
    pub fn waiting_reason(&self) -> Option<&'static str> {
        match self {
            Outcome::ClusterMissing => Some(WAITING_FOR_CLUSTER),
            Outcome::ClusterNotReady => Some(WAITING_FOR_RUNNING),
            _ => None,
        }
    }
}

/// Map a reconciliation result to the status it leaves behind
pub fn transition(result: &Result<Outcome, Failure>) -> Transition {
    let (state, reason) = match result {
        Ok(outcome @ (Outcome::ClusterMissing | Outcome::ClusterNotReady)) => {
            let reason = outcome.waiting_reason().map(str::to_string);
            (Some(ComponentTemplateState::Pending), reason)
        }
        Ok(Outcome::ExistenceRecorded { .. }) => (None, None),
        Ok(Outcome::Adopted) => (
            Some(ComponentTemplateState::Ignored),
            Some(TEMPLATE_EXISTS.to_string()),
        ),
        Ok(Outcome::InSync | Outcome::Updated) => (Some(ComponentTemplateState::Created), None),
        Err(failure) => (Some(ComponentTemplateState::Error), Some(failure.reason.clone())),
    };
    Transition { state, reason }
}
