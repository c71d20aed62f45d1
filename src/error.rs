//! Fault taxonomy for the agent.
//!
//! Collaborator adapters (camera drivers, inference backends, GPIO) report
//! failures as `anyhow::Error` with context. The core classifies them here so
//! the scheduler can tell a startup fault, which ends the process, from a
//! steady-state fault, which only ends the current cycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or invalid setting. Always fatal.
    #[error("configuration error: {0}")]
    Config(String),

    /// Label file could not be opened or read.
    #[error("label file error: {0}")]
    Parse(String),

    /// Camera could not be opened, configured or read.
    #[error("camera error: {0:#}")]
    Resource(anyhow::Error),

    /// Engine invocation failed or produced malformed outputs.
    #[error("inference error: {0:#}")]
    Inference(anyhow::Error),

    /// Overlay drawing or persisting failed.
    #[error("annotation error: {0:#}")]
    Annotation(anyhow::Error),

    /// Actuator pin could not be driven.
    #[error("actuation error: {0:#}")]
    Actuation(anyhow::Error),

    /// Class id has no entry in the label catalog.
    #[error("no label for class id {0}")]
    UnknownLabel(f32),
}

impl AgentError {
    /// True for faults that the scheduler isolates to a single cycle.
    ///
    /// A camera fault is cycle-local once the loop is running; the binary
    /// probes the camera once before entering the loop so that a camera that
    /// is absent at startup is still reported as fatal.
    pub fn is_cycle_local(&self) -> bool {
        !matches!(self, AgentError::Config(_) | AgentError::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn startup_faults_are_not_cycle_local() {
        assert!(!AgentError::Config("threshold".into()).is_cycle_local());
        assert!(!AgentError::Parse("labels.txt".into()).is_cycle_local());
        assert!(AgentError::Resource(anyhow!("busy")).is_cycle_local());
        assert!(AgentError::Inference(anyhow!("invoke")).is_cycle_local());
        assert!(AgentError::Annotation(anyhow!("font")).is_cycle_local());
    }

    #[test]
    fn display_includes_context_chain() {
        let err = AgentError::Resource(anyhow!("device busy").context("open /dev/video0"));
        assert_eq!(err.to_string(), "camera error: open /dev/video0: device busy");
    }
}
