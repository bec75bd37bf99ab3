use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const SPEAKING_LABEL: &str = "speaking";
pub const LISTENING_LABEL: &str = "listening";

/// Shared "agent is producing speech" flag.
///
/// Clones point at the same flag, so the synthesis side can flip it while the
/// transcript side reads it.
#[derive(Clone, Debug, Default)]
pub struct SpeakingState {
    speaking: Arc<AtomicBool>,
}

impl SpeakingState {
    pub fn new(speaking: bool) -> Self {
        Self { speaking: Arc::new(AtomicBool::new(speaking)) }
    }

    pub fn set_speaking(&self, speaking: bool) {
        let previous = self.speaking.swap(speaking, Ordering::SeqCst);
        if previous != speaking {
            tracing::debug!(
                event_name = "agent.speaking_state",
                speaking,
                "agent speaking state changed"
            );
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub fn label(&self) -> &'static str {
        if self.is_speaking() {
            SPEAKING_LABEL
        } else {
            LISTENING_LABEL
        }
    }
}
