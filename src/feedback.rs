//! Side effects fired when capsules hit something hard enough.
//!
//! Feedback is best effort. A failing back-end never stops the simulation,
//! errors are logged at trace level and dropped.

use super::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

pub trait ImpactFeedback: Send + Sync {
    /// `intensity` is the fastest capsule speed (pixels/s) among this step's impacts.
    fn play_impact(&self, intensity: f32) -> anyhow::Result<()>;
}

/// Short falling sine chirp played on impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropTone {
    pub start_frequency: f32,
    pub end_frequency: f32,
    pub gain: f32,
    pub duration: Duration,
}
impl Default for DropTone {
    fn default() -> Self {
        Self {
            start_frequency: 800.0,
            end_frequency: 200.0,
            gain: 0.15,
            duration: Duration::from_millis(150),
        }
    }
}
impl DropTone {
    /// Exponential ramp of the frequency, `t` clamped to the tone duration.
    pub fn frequency_at(&self, t: Duration) -> f32 {
        let f = (t.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        self.start_frequency * (self.end_frequency / self.start_frequency).powf(f)
    }
}

#[derive(Debug, Default)]
pub struct LogFeedback {
    pub tone: DropTone,
}
impl ImpactFeedback for LogFeedback {
    fn play_impact(&self, intensity: f32) -> anyhow::Result<()> {
        log::debug!(
            "impact {:.0}px/s, tone {}Hz -> {}Hz",
            intensity,
            self.tone.start_frequency,
            self.tone.end_frequency
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CountingFeedback {
    played: AtomicU64,
}
impl CountingFeedback {
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::Relaxed)
    }
}
impl ImpactFeedback for CountingFeedback {
    fn play_impact(&self, _intensity: f32) -> anyhow::Result<()> {
        self.played.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Process-wide feedback, built on first use.
pub fn default_feedback() -> Arc<dyn ImpactFeedback> {
    static DEFAULT: OnceLock<Arc<LogFeedback>> = OnceLock::new();
    DEFAULT.get_or_init(Default::default).clone()
}

/// Forward an impact, swallowing failures.
pub(crate) fn play(feedback: &dyn ImpactFeedback, intensity: f32) {
    if let Err(err) = feedback.play_impact(intensity) {
        log::trace!("impact feedback failed: {:#}", err);
    }
}
