use thiserror::Error;

/// Failure raised by a caller-supplied policy. Never escapes `decide`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("custom policy failed: {0}")]
    Failed(String),
    #[error("custom policy panicked: {0}")]
    Panicked(String),
}

impl PolicyError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Caller-supplied override for the built-in filtering rules.
///
/// Returning `Ok(true)` filters the transcript, `Ok(false)` allows it. An
/// error makes the engine fall back to its built-in rules.
pub trait InterruptionPolicy: Send + Sync {
    fn should_filter(&self, transcript: &str, agent_state: Option<&str>)
        -> Result<bool, PolicyError>;
}

impl<F> InterruptionPolicy for F
where
    F: Fn(&str, Option<&str>) -> Result<bool, PolicyError> + Send + Sync,
{
    fn should_filter(
        &self,
        transcript: &str,
        agent_state: Option<&str>,
    ) -> Result<bool, PolicyError> {
        self(transcript, agent_state)
    }
}

/// Pins a closure to the policy signature so its argument types are inferred.
pub fn policy_fn<F>(policy: F) -> F
where
    F: Fn(&str, Option<&str>) -> Result<bool, PolicyError> + Send + Sync,
{
    policy
}
