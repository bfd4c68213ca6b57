use super::*;

/// Where and when the pointer went down, in container pixels.
#[derive(Debug, Clone, Copy)]
struct PointerSample {
    x: f32,
    y: f32,
    at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Short press and release in place. Coordinates of the release.
    Tap { x: f32, y: f32 },
    /// Anything else. The drag constraint already moved whatever was grabbed.
    Drag { distance: f32, elapsed: Duration },
}

#[derive(Debug, Clone, Copy)]
enum GestureState {
    Idle,
    PointerDownPending(PointerSample),
}

/// Decide on release whether a press was a tap (select) or a drag (throw).
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    state: GestureState,
    tap_max_distance: f32,
    tap_max_duration: Duration,
}
impl GestureClassifier {
    pub fn new(configs: &GestureConfigs) -> Self {
        Self {
            state: GestureState::Idle,
            tap_max_distance: configs.tap_max_distance,
            tap_max_duration: configs.tap_max_duration(),
        }
    }

    /// A second press without release replaces the first one.
    pub fn pointer_down(&mut self, x: f32, y: f32, at: Instant) {
        self.state = GestureState::PointerDownPending(PointerSample { x, y, at });
    }

    /// `None` if no press was pending.
    pub fn pointer_up(&mut self, x: f32, y: f32, at: Instant) -> Option<Gesture> {
        let GestureState::PointerDownPending(down) =
            std::mem::replace(&mut self.state, GestureState::Idle)
        else {
            return None;
        };

        let distance = (x - down.x).hypot(y - down.y);
        let elapsed = at.saturating_duration_since(down.at);

        if distance < self.tap_max_distance && elapsed < self.tap_max_duration {
            Some(Gesture::Tap { x, y })
        } else {
            Some(Gesture::Drag { distance, elapsed })
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, GestureState::PointerDownPending(_))
    }

    /// Forget a pending press.
    pub fn cancel(&mut self) {
        self.state = GestureState::Idle;
    }
}
