//! Server-assigned lifecycle fields of a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, RunId, RunStatus};

/// Lifecycle of a single run.
///
/// Fields are private: the only way to change them is through the
/// transition methods, each of which moves the status one step forward and
/// stamps the matching timestamp. A fresh state is `pending` with no id, no
/// timestamps and no results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    status: RunStatus,
    #[serde(default)]
    error: bool,
    id: Option<RunId>,
    #[serde(default)]
    results: Vec<String>,
    error_message: Option<String>,
    created_time: Option<DateTime<Utc>>,
    start_processing_time: Option<DateTime<Utc>>,
    completed_time: Option<DateTime<Utc>>,
    duration: Option<f64>,
}

impl RunState {
    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn id(&self) -> Option<&RunId> {
        self.id.as_ref()
    }

    pub fn results(&self) -> &[String] {
        &self.results
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.created_time
    }

    pub fn start_processing_time(&self) -> Option<DateTime<Utc>> {
        self.start_processing_time
    }

    pub fn completed_time(&self) -> Option<DateTime<Utc>> {
        self.completed_time
    }

    /// Seconds between start and completion. `None` until both are stamped.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Record the id and creation time the executing node assigned.
    pub fn accept(&mut self, id: RunId, at: DateTime<Utc>) -> Result<(), CoreError> {
        if let Some(existing) = &self.id {
            return Err(CoreError::validation(format!(
                "run already accepted as '{existing}'"
            )));
        }
        if self.status != RunStatus::Pending {
            return Err(CoreError::InvalidStateTransition {
                from: self.status.to_string(),
                to: RunStatus::Pending.to_string(),
            });
        }
        if id.is_empty() {
            return Err(CoreError::validation("run id is empty"));
        }
        self.id = Some(id);
        self.created_time = Some(at);
        Ok(())
    }

    /// `pending -> processing`.
    pub fn start_at(&mut self, at: DateTime<Utc>) -> Result<(), CoreError> {
        self.check_transition(RunStatus::Processing)?;
        if let Some(created) = self.created_time {
            if at < created {
                return Err(CoreError::validation(
                    "start_processing_time precedes created_time",
                ));
            }
        }
        self.status = RunStatus::Processing;
        self.start_processing_time = Some(at);
        Ok(())
    }

    /// `processing -> completed`, recording the results.
    pub fn complete_at(
        &mut self,
        at: DateTime<Utc>,
        results: Vec<String>,
    ) -> Result<(), CoreError> {
        self.check_transition(RunStatus::Completed)?;
        self.check_not_before_start(at)?;
        self.status = RunStatus::Completed;
        self.error = false;
        self.results = results;
        self.finish(at);
        Ok(())
    }

    /// `pending | processing -> error`, recording the failure message.
    pub fn fail_at(
        &mut self,
        at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Result<(), CoreError> {
        self.check_transition(RunStatus::Error)?;
        self.check_not_before_start(at)?;
        self.status = RunStatus::Error;
        self.error = true;
        self.error_message = Some(message.into());
        self.finish(at);
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), CoreError> {
        self.start_at(Utc::now())
    }

    pub fn complete(&mut self, results: Vec<String>) -> Result<(), CoreError> {
        self.complete_at(Utc::now(), results)
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        self.fail_at(Utc::now(), message)
    }

    fn check_transition(&self, next: RunStatus) -> Result<(), CoreError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            })
        }
    }

    fn check_not_before_start(&self, at: DateTime<Utc>) -> Result<(), CoreError> {
        match self.start_processing_time {
            Some(start) if at < start => Err(CoreError::validation(
                "completed_time precedes start_processing_time",
            )),
            _ => Ok(()),
        }
    }

    fn finish(&mut self, at: DateTime<Utc>) {
        self.completed_time = Some(at);
        self.duration = self.start_processing_time.and_then(|start| {
            (at - start)
                .num_microseconds()
                .map(|us| us as f64 / 1_000_000.0)
        });
    }
}
