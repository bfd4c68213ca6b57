use super::*;

/// Count fixed steps due since the last call.
///
/// Never blocks. When the caller falls more than `max_behind` late,
/// the extra time is dropped instead of being simulated.
pub struct StepClock {
    internal_time: Instant,
    max_behind: Duration,
    dt: Duration,
}
impl StepClock {
    const MIN_DT: Duration = Duration::from_micros(100);

    /// `max_behind` is raised to one `dt`, anything lower would never step.
    pub fn new(dt: Duration, max_behind: Duration, now: Instant) -> Self {
        let dt = dt.max(Self::MIN_DT);
        Self {
            internal_time: now,
            max_behind: max_behind.max(dt),
            dt,
        }
    }

    pub fn advance(&mut self, now: Instant) -> u32 {
        let behind = now.saturating_duration_since(self.internal_time);
        if behind > self.max_behind {
            log::debug!(
                "Physics behind by {}ms which is more than maximum of {}ms",
                behind.as_millis(),
                self.max_behind.as_millis()
            );
            self.internal_time = now - self.max_behind;
        }

        let mut steps = 0;
        while self.internal_time + self.dt <= now {
            self.internal_time += self.dt;
            steps += 1;
        }
        steps
    }
}
