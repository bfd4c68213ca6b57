use super::*;

/// Pixels <-> meters. The engine's tolerances are tuned for meters,
/// everything outside this module speaks pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    pub pixels_per_meter: f32,
}
impl PixelScale {
    pub fn to_meters(self, pixels: Vector<Real>) -> Vector<Real> {
        pixels / self.pixels_per_meter
    }

    pub fn to_pixels(self, meters: Vector<Real>) -> Vector<Real> {
        meters * self.pixels_per_meter
    }

    pub fn length_to_meters(self, pixels: f32) -> f32 {
        pixels / self.pixels_per_meter
    }

    pub fn length_to_pixels(self, meters: f32) -> f32 {
        meters * self.pixels_per_meter
    }
}

/// Material of a dynamic ball. Lengths in pixels.
#[derive(Debug, Clone, Copy)]
pub struct BallMaterial {
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Mass per square pixel.
    pub density: f32,
    pub can_sleep: bool,
}

/// Position of a body in pixels, as seen from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleState {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Pixels/s.
    pub speed: f32,
    pub sleeping: bool,
}

/// Most a contact may be pushed apart in one step (meters).
/// Unbounded, overlapping spawns are separated fast enough to clear a wall.
const MAX_PENETRATION_CORRECTION: Real = 0.1;

pub struct Physics {
    scale: PixelScale,
    gravity: Vector<Real>,
    physics_pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    events: PhysicsEventCollector,
}
impl Physics {
    /// `gravity` is downward, in pixels/s².
    pub fn new(dt: f32, gravity: f32, scale: PixelScale) -> Self {
        let integration_parameters = IntegrationParameters {
            dt,
            min_ccd_dt: dt / 100.0,
            max_penetration_correction: MAX_PENETRATION_CORRECTION,
            ..Default::default()
        };
        Self {
            scale,
            gravity: scale.to_meters(vector![0.0, gravity]),
            physics_pipeline: Default::default(),
            integration_parameters,
            islands: Default::default(),
            broad_phase: Default::default(),
            narrow_phase: Default::default(),
            bodies: Default::default(),
            colliders: Default::default(),
            impulse_joints: Default::default(),
            multibody_joints: Default::default(),
            ccd_solver: Default::default(),
            events: Default::default(),
        }
    }

    pub fn step(&mut self) {
        self.events.clear();

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.events,
        );
    }

    pub fn dt(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn scale(&self) -> PixelScale {
        self.scale
    }

    /// Immovable box. `center` and `half_extents` in pixels.
    pub fn add_fixed_box(
        &mut self,
        center: Vector<Real>,
        half_extents: Vector<Real>,
        friction: f32,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::fixed()
            .translation(self.scale.to_meters(center))
            .user_data(UserData::pack_boundary())
            .build();
        let rb = self.bodies.insert(rb);

        let half_extents = self.scale.to_meters(half_extents);
        let coll = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .friction(friction)
            .build();
        self.colliders
            .insert_with_parent(coll, rb, &mut self.bodies);

        rb
    }

    /// Dynamic ball. `center` in pixels.
    pub fn add_ball(
        &mut self,
        center: Vector<Real>,
        material: BallMaterial,
        capsule_id: CapsuleId,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(self.scale.to_meters(center))
            .linear_damping(material.linear_damping)
            .angular_damping(material.angular_damping)
            .can_sleep(material.can_sleep)
            .ccd_enabled(true)
            .user_data(UserData::pack_capsule(capsule_id))
            .build();
        let rb = self.bodies.insert(rb);

        let ppm = self.scale.pixels_per_meter;
        let coll = ColliderBuilder::ball(self.scale.length_to_meters(material.radius))
            .density(material.density * ppm * ppm)
            .friction(material.friction)
            .restitution(material.restitution)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.colliders
            .insert_with_parent(coll, rb, &mut self.bodies);

        rb
    }

    /// Remove the body and its colliders. `None` if it was already gone.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )
    }

    /// Drop every body, collider and joint. Parameters are kept.
    pub fn clear(&mut self) {
        self.islands = Default::default();
        self.broad_phase = Default::default();
        self.narrow_phase = Default::default();
        self.bodies = Default::default();
        self.colliders = Default::default();
        self.impulse_joints = Default::default();
        self.multibody_joints = Default::default();
        self.ccd_solver = Default::default();
        self.events.clear();
    }

    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn body(&self, rb: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(rb)
    }

    pub fn body_mut(&mut self, rb: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(rb)
    }

    pub fn capsule_state(&self, rb: RigidBodyHandle) -> Option<CapsuleState> {
        let body = self.bodies.get(rb)?;
        let position = self.scale.to_pixels(*body.translation());
        Some(CapsuleState {
            x: position.x,
            y: position.y,
            angle: body.rotation().angle(),
            speed: self.scale.length_to_pixels(body.linvel().norm()),
            sleeping: body.is_sleeping(),
        })
    }

    /// If `point` (pixels) is inside one of the body's colliders.
    pub fn contains_point(&self, rb: RigidBodyHandle, point: Vector<Real>) -> bool {
        let Some(body) = self.bodies.get(rb) else {
            return false;
        };
        let point = Point::from(self.scale.to_meters(point));
        body.colliders().iter().any(|&handle| {
            self.colliders
                .get(handle)
                .map_or(false, |coll| coll.shape().contains_point(coll.position(), &point))
        })
    }

    /// Contacts that started during the last step.
    pub fn num_contacts_started(&self) -> usize {
        self.events.num_impacts()
    }

    /// Fastest speed (pixels/s) among bodies that started touching during the last step.
    pub fn strongest_impact(&self) -> Option<f32> {
        self.events
            .strongest_impact()
            .map(|speed| self.scale.length_to_pixels(speed))
    }
}

#[derive(Default)]
pub struct PhysicsEventCollector {
    /// Speed of the fastest body for each contact started this step.
    impacts: Arc<Mutex<Vec<(Option<CapsuleId>, f32)>>>,
}
impl PhysicsEventCollector {
    pub fn clear(&mut self) {
        self.impacts.lock().clear();
    }

    fn num_impacts(&self) -> usize {
        self.impacts.lock().len()
    }

    fn strongest_impact(&self) -> Option<f32> {
        self.impacts
            .lock()
            .iter()
            .map(|&(_, speed)| speed)
            .reduce(f32::max)
    }
}
impl EventHandler for PhysicsEventCollector {
    fn handle_collision_event(
        &self,
        bodies: &RigidBodySet,
        colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if !event.started() {
            return;
        }

        let mut fastest: Option<(Option<CapsuleId>, f32)> = None;
        for handle in [event.collider1(), event.collider2()] {
            let Some(body) = colliders
                .get(handle)
                .and_then(|coll| coll.parent())
                .and_then(|rb| bodies.get(rb))
            else {
                continue;
            };
            let speed = body.linvel().norm();
            if fastest.map_or(true, |(_, fastest_speed)| speed > fastest_speed) {
                fastest = Some((body.user_data.capsule_id(), speed));
            }
        }

        if let Some(impact) = fastest {
            self.impacts.lock().push(impact);
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Body:
/// - CapsuleId: 64
/// - Capsule flag: 1
///
/// Boundaries carry no id.
pub trait UserData {
    const CAPSULE_FLAG_OFFSET: u32 = u64::BITS;
    fn pack_capsule(capsule_id: CapsuleId) -> Self;
    fn pack_boundary() -> Self;
    fn capsule_id(self) -> Option<CapsuleId>;
}
impl UserData for u128 {
    fn pack_capsule(capsule_id: CapsuleId) -> Self {
        capsule_id.as_u64() as u128 | 1 << Self::CAPSULE_FLAG_OFFSET
    }

    fn pack_boundary() -> Self {
        0
    }

    fn capsule_id(self) -> Option<CapsuleId> {
        if self >> Self::CAPSULE_FLAG_OFFSET & 1 == 1 {
            Some(CapsuleId(self as u64))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> BallMaterial {
        BallMaterial {
            radius: 35.0,
            restitution: 0.3,
            friction: 0.5,
            linear_damping: 0.0,
            angular_damping: 0.0,
            density: 0.002,
            can_sleep: true,
        }
    }

    #[test]
    fn test_user_data() {
        let data = <u128 as UserData>::pack_capsule(CapsuleId(42));
        assert_eq!(data.capsule_id(), Some(CapsuleId(42)));
        assert_eq!(<u128 as UserData>::pack_boundary().capsule_id(), None);
        assert_eq!(
            <u128 as UserData>::pack_capsule(CapsuleId(0)).capsule_id(),
            Some(CapsuleId(0))
        );
    }

    #[test]
    fn test_free_fall_in_pixels() {
        let mut physics = Physics::new(
            1.0 / 60.0,
            1200.0,
            PixelScale {
                pixels_per_meter: 50.0,
            },
        );
        let rb = physics.add_ball(vector![100.0, 0.0], material(), CapsuleId(0));

        for _ in 0..60 {
            physics.step();
        }

        // Semi-implicit euler lands a bit past 0.5 * g * t².
        let state = physics.capsule_state(rb).unwrap();
        assert!(state.y > 550.0 && state.y < 650.0, "y: {}", state.y);
        approx::assert_relative_eq!(state.x, 100.0, epsilon = 0.01);
        approx::assert_relative_eq!(state.speed, 1200.0, epsilon = 1.0);
    }

    #[test]
    fn test_contains_point() {
        let mut physics = Physics::new(
            1.0 / 60.0,
            0.0,
            PixelScale {
                pixels_per_meter: 50.0,
            },
        );
        let rb = physics.add_ball(vector![100.0, 100.0], material(), CapsuleId(0));

        assert!(physics.contains_point(rb, vector![100.0, 100.0]));
        assert!(physics.contains_point(rb, vector![130.0, 100.0]));
        assert!(!physics.contains_point(rb, vector![136.0, 100.0]));
        assert!(!physics.contains_point(rb, vector![126.0, 126.0]));

        physics.remove_body(rb).unwrap();
        assert!(!physics.contains_point(rb, vector![100.0, 100.0]));
        assert!(physics.remove_body(rb).is_none());
    }

    #[test]
    fn test_overlapping_balls_separate_gently() {
        let mut physics = Physics::new(
            1.0 / 60.0,
            0.0,
            PixelScale {
                pixels_per_meter: 50.0,
            },
        );
        let a = physics.add_ball(vector![100.0, 100.0], material(), CapsuleId(0));
        let b = physics.add_ball(vector![110.0, 100.0], material(), CapsuleId(1));

        physics.step();

        // 0.1m per step at 60Hz, 50px/m.
        let max_speed = 300.0 + 1.0;
        for rb in [a, b] {
            let state = physics.capsule_state(rb).unwrap();
            assert!(state.speed <= max_speed, "{:?}", state);
        }
    }

    #[test]
    fn test_impact_reported_on_landing() {
        let mut physics = Physics::new(
            1.0 / 60.0,
            1200.0,
            PixelScale {
                pixels_per_meter: 50.0,
            },
        );
        physics.add_fixed_box(vector![160.0, 425.0], vector![160.0, 25.0], 0.8);
        physics.add_ball(vector![160.0, 0.0], material(), CapsuleId(0));

        let mut strongest = None;
        for _ in 0..120 {
            physics.step();
            strongest = strongest.or(physics.strongest_impact());
        }

        let speed = strongest.expect("ball never touched the floor");
        assert!(speed > 120.0, "speed: {}", speed);
    }
}
