use super::*;

struct Grab {
    rb: RigidBodyHandle,
    /// Grabbed point in the body's local frame (meters).
    local_anchor: Point<Real>,
    /// Pointer position (meters).
    target: Point<Real>,
}

/// Spring between the pointer and the point of a capsule that was grabbed.
///
/// Each step the body's velocity is set so it closes `stiffness` of the gap.
/// Releasing leaves the body with its last velocity, which is how capsules get thrown.
pub struct DragConstraint {
    stiffness: f32,
    grab: Option<Grab>,
}
impl DragConstraint {
    pub fn new(stiffness: f32) -> Self {
        Self {
            stiffness: stiffness.clamp(0.0, 1.0),
            grab: None,
        }
    }

    /// `point` in pixels, usually where the pointer went down.
    pub fn grab(&mut self, physics: &mut Physics, rb: RigidBodyHandle, point: Vector<Real>) {
        let target = Point::from(physics.scale().to_meters(point));
        let Some(body) = physics.body_mut(rb) else {
            return;
        };
        body.wake_up(true);
        self.grab = Some(Grab {
            rb,
            local_anchor: body.position().inverse_transform_point(&target),
            target,
        });
    }

    /// `point` in pixels.
    pub fn move_to(&mut self, scale: PixelScale, point: Vector<Real>) {
        if let Some(grab) = &mut self.grab {
            grab.target = Point::from(scale.to_meters(point));
        }
    }

    pub fn release(&mut self) -> Option<RigidBodyHandle> {
        self.grab.take().map(|grab| grab.rb)
    }

    pub fn grabbed(&self) -> Option<RigidBodyHandle> {
        self.grab.as_ref().map(|grab| grab.rb)
    }

    /// Pull the grabbed body toward the pointer. Call before stepping.
    pub fn apply(&mut self, physics: &mut Physics) {
        let Some((rb, local_anchor, target)) = self
            .grab
            .as_ref()
            .map(|grab| (grab.rb, grab.local_anchor, grab.target))
        else {
            return;
        };
        let dt = physics.dt();
        let Some(body) = physics.body_mut(rb) else {
            // Body got removed under the pointer.
            self.grab = None;
            return;
        };

        let anchor = body.position() * local_anchor;
        let linvel = (target - anchor) * (self.stiffness / dt);
        body.set_linvel(linvel, true);
    }
}
