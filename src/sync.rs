use crate::audio::MediaBackend;
use crate::engine::{AdvanceOutcome, PlaybackEngine};
use crate::model::{PlaybackPosition, TransportState};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Nothing loaded.
    Idle,
    /// The backend read failed; the next tick tries again.
    Skipped,
    /// Length unknown: no progress published, no end check.
    UnknownLength { elapsed: f64 },
    Progress(PlaybackPosition),
    Ended {
        position: PlaybackPosition,
        outcome: AdvanceOutcome,
    },
}

impl SyncOutcome {
    pub fn position(&self) -> Option<PlaybackPosition> {
        match self {
            Self::Progress(position) | Self::Ended { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Polls playback position, publishes progress and drives auto-advance.
#[derive(Debug, Clone)]
pub struct ProgressSynchronizer {
    epsilon: f64,
    consecutive_failures: u32,
}

impl ProgressSynchronizer {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.max(0.0),
            consecutive_failures: 0,
        }
    }

    pub fn tick<B: MediaBackend>(&mut self, engine: &mut PlaybackEngine<B>) -> SyncOutcome {
        if !engine.is_loaded() {
            return SyncOutcome::Idle;
        }

        let elapsed = match engine.position() {
            Ok(elapsed) => elapsed,
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                tracing::debug!(
                    error = %err,
                    failures = self.consecutive_failures,
                    "position read failed, skipping tick"
                );
                return SyncOutcome::Skipped;
            }
        };
        self.consecutive_failures = 0;

        let length = engine.get_length();
        if length <= 0.0 {
            return SyncOutcome::UnknownLength { elapsed };
        }

        let position = PlaybackPosition {
            elapsed,
            total: length,
        };

        if engine.state() != TransportState::Playing || engine.guard_suppresses(elapsed) {
            return SyncOutcome::Progress(position);
        }

        if elapsed >= length - self.epsilon {
            tracing::debug!(elapsed, length, "end of track reached");
            let outcome = engine.auto_advance();
            return SyncOutcome::Ended { position, outcome };
        }

        SyncOutcome::Progress(position)
    }
}
