//! Jobs held by the mock backend

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use docking_protocol::JobState;

use crate::job::JobDescriptor;

/// Prefix of backend-assigned job ids
const BACKEND_ID_PREFIX: &str = "dock";

/// One recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub state: JobState,
    pub at: DateTime<Utc>,
}

/// A job accepted by the mock backend
#[derive(Debug, Clone)]
pub struct MockJob {
    pub job_id: String,
    pub backend_job_id: String,
    pub job_key: String,
    /// Descriptor exactly as received
    pub descriptor: JobDescriptor,
    pub history: Vec<StateChange>,
}

impl MockJob {
    pub fn state(&self) -> JobState {
        self.history
            .last()
            .map_or(JobState::Queued, |change| change.state)
    }

    pub fn accepted_at(&self) -> DateTime<Utc> {
        self.history.first().map_or_else(Utc::now, |change| change.at)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.history.last().map_or_else(Utc::now, |change| change.at)
    }
}

/// Accepted jobs keyed by caller job id
#[derive(Debug, Default)]
pub struct JobLedger {
    jobs: HashMap<String, MockJob>,
    admitted: u64,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn lookup(&self, job_id: &str) -> Option<&MockJob> {
        self.jobs.get(job_id)
    }

    /// Jobs still queued or running
    pub fn active(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| !job.state().is_terminal())
            .count()
    }

    /// Record a new QUEUED job under a fresh backend id.
    ///
    /// The caller has already checked that `job_id` is not taken.
    pub fn admit(&mut self, job_id: &str, job_key: &str, descriptor: JobDescriptor) -> &MockJob {
        self.admitted += 1;
        let job = MockJob {
            job_id: job_id.to_string(),
            backend_job_id: format!("{BACKEND_ID_PREFIX}-{:06}", self.admitted),
            job_key: job_key.to_string(),
            descriptor,
            history: vec![StateChange {
                state: JobState::Queued,
                at: Utc::now(),
            }],
        };
        self.jobs.entry(job_id.to_string()).or_insert(job)
    }

    /// Move a job to `state`. Terminal jobs stay where they are.
    pub fn advance(&mut self, job_id: &str, state: JobState) -> bool {
        match self.jobs.get_mut(job_id) {
            Some(job) if !job.state().is_terminal() => {
                job.history.push(StateChange {
                    state,
                    at: Utc::now(),
                });
                true
            }
            _ => false,
        }
    }
}
