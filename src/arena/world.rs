use super::*;

/// Everything simulated for one mounted container: boundaries, capsules and the drag.
///
/// Coordinates are container pixels, origin top-left, y down.
pub struct ArenaWorld {
    width: f32,
    height: f32,
    configs: ArenaConfigs,

    physics: Physics,
    /// Floor, left wall, right wall.
    boundaries: [RigidBodyHandle; 3],
    registry: BodyRegistry,
    drag: DragConstraint,

    feedback: Arc<dyn ImpactFeedback>,
    rng: StdRng,
    next_capsule_id: CapsuleId,

    /// Bumped on every clear. Spawns scheduled under an older epoch are dropped.
    epoch: u64,
    alive: bool,
    tick: u64,
    impacts: u64,
}
impl ArenaWorld {
    /// `None` if the container has no area yet.
    pub fn new(
        width: f32,
        height: f32,
        configs: ArenaConfigs,
        feedback: Arc<dyn ImpactFeedback>,
    ) -> Option<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            log::warn!("Not starting arena with container {}x{}", width, height);
            return None;
        }
        if let Err(err) = configs.validate() {
            log::warn!("Not starting arena, {:#}", err);
            return None;
        }

        let world_configs = configs.world_configs;
        let mut physics = Physics::new(
            world_configs.physics_dt().as_secs_f32(),
            world_configs.gravity,
            PixelScale {
                pixels_per_meter: world_configs.pixels_per_meter,
            },
        );

        let thickness = world_configs.wall_thickness;
        let half = thickness * 0.5;
        // Floor just under the visible area, walls just outside and twice as tall.
        let floor = physics.add_fixed_box(
            vector![width * 0.5, height + half],
            vector![width * 0.5, half],
            world_configs.floor_friction,
        );
        let left_wall = physics.add_fixed_box(
            vector![-half, height * 0.5],
            vector![half, height],
            world_configs.wall_friction,
        );
        let right_wall = physics.add_fixed_box(
            vector![width + half, height * 0.5],
            vector![half, height],
            world_configs.wall_friction,
        );

        let rng = match configs.spawn_configs.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Some(Self {
            width,
            height,
            configs,
            physics,
            boundaries: [floor, left_wall, right_wall],
            registry: Default::default(),
            drag: DragConstraint::new(configs.gesture_configs.drag_stiffness),
            feedback,
            rng,
            next_capsule_id: Default::default(),
            epoch: 0,
            alive: true,
            tick: 0,
            impacts: 0,
        })
    }

    pub fn step(&mut self) {
        if !self.alive {
            return;
        }

        self.drag.apply(&mut self.physics);
        self.physics.step();

        // At most one impact per step, however many pairs touched.
        if let Some(intensity) = self.physics.strongest_impact() {
            if intensity > self.configs.world_configs.impact_speed_threshold {
                self.impacts += 1;
                log::debug!("Impact at {:.0}px/s on tick {}", intensity, self.tick);
                feedback::play(self.feedback.as_ref(), intensity);
            }
        }

        self.tick += 1;
    }

    /// Random spawn columns tried before stacking above the least crowded one.
    const SPAWN_ATTEMPTS: usize = 8;

    /// Drop `post` in at a random spot above the arena, clear of other capsules.
    /// Return `false` if it is already there or the world is gone.
    pub fn spawn_capsule(&mut self, post: Arc<Post>) -> bool {
        if !self.alive || self.registry.contains(&post.id) {
            return false;
        }

        let radius = self.configs.capsule_configs.radius;
        let jitter = self.configs.capsule_configs.spawn_height_jitter.max(0.0);
        let y = -radius - self.rng.gen::<f32>() * jitter;

        // Never overlap a capsule that has not fallen away yet.
        let mut best = (self.width * 0.5, f32::NEG_INFINITY);
        for _ in 0..Self::SPAWN_ATTEMPTS {
            let x = self.spawn_x(radius);
            let free_y = self.free_spawn_y(x, y, radius);
            if free_y > best.1 {
                best = (x, free_y);
            }
            if free_y >= y {
                break;
            }
        }

        self.spawn_capsule_at(post, best.0, best.1)
    }

    fn spawn_x(&mut self, radius: f32) -> f32 {
        if self.width > radius * 4.0 {
            self.rng.gen_range(radius * 2.0..self.width - radius * 2.0)
        } else {
            self.width * 0.5
        }
    }

    /// Largest `y` up to `y` where a capsule at `x` overlaps no other capsule.
    fn free_spawn_y(&self, x: f32, y: f32, radius: f32) -> f32 {
        let diameter = radius * 2.0;
        self.registry
            .iter()
            .filter_map(|capsule| self.physics.capsule_state(capsule.rb))
            .filter(|state| (state.x - x).abs() < diameter && state.y < y + diameter)
            .map(|state| state.y - diameter)
            .fold(y, f32::min)
    }

    /// Same as [`ArenaWorld::spawn_capsule`] at a chosen position (pixels).
    pub fn spawn_capsule_at(&mut self, post: Arc<Post>, x: f32, y: f32) -> bool {
        if !self.alive || self.registry.contains(&post.id) {
            return false;
        }

        let capsule_configs = self.configs.capsule_configs;
        let material = BallMaterial {
            radius: capsule_configs.radius,
            restitution: capsule_configs.restitution,
            friction: capsule_configs.friction,
            linear_damping: capsule_configs.linear_damping,
            angular_damping: capsule_configs.angular_damping,
            density: capsule_configs.density,
            can_sleep: self.configs.world_configs.enable_sleeping,
        };

        let capsule_id = self.next_capsule_id.next();
        let spawn_position = vector![x, y];
        let rb = self.physics.add_ball(spawn_position, material, capsule_id);

        log::debug!("Spawned {} as {:?} at ({:.0}, {:.0})", post.id, capsule_id, x, y);
        self.registry.insert(CapsuleBody {
            capsule_id,
            rb,
            post,
            spawn_position,
        })
    }

    /// Remove every capsule. Boundaries stay.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.drag.release();

        let mut removed = 0;
        for capsule in self.registry.drain() {
            self.physics.remove_body(capsule.rb);
            removed += 1;
        }
        log::debug!("Cleared {} capsules, epoch {}", removed, self.epoch);
    }

    /// Topmost capsule whose footprint contains the point (pixels). Boundaries never match.
    pub fn query_point(&self, x: f32, y: f32) -> Option<&Arc<Post>> {
        self.capsule_at(x, y).map(|capsule| &capsule.post)
    }

    fn capsule_at(&self, x: f32, y: f32) -> Option<&CapsuleBody> {
        let point = vector![x, y];
        self.registry
            .iter_topmost()
            .find(|capsule| self.physics.contains_point(capsule.rb, point))
    }

    /// Attach the drag constraint to the capsule under the pointer, if any.
    pub fn grab(&mut self, x: f32, y: f32) -> bool {
        let Some(rb) = self.capsule_at(x, y).map(|capsule| capsule.rb) else {
            return false;
        };
        self.drag.grab(&mut self.physics, rb, vector![x, y]);
        log::debug!("Grabbed capsule at ({:.0}, {:.0})", x, y);
        true
    }

    pub fn drag_to(&mut self, x: f32, y: f32) {
        self.drag.move_to(self.physics.scale(), vector![x, y]);
    }

    pub fn release(&mut self) -> bool {
        self.drag.release().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.grabbed().is_some()
    }

    /// Release every body. The world ignores all calls afterward.
    pub fn shutdown(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.epoch += 1;
        self.drag.release();
        self.registry.drain().for_each(drop);
        self.physics.clear();
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Steps that produced an impact.
    pub fn impacts(&self) -> u64 {
        self.impacts
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn configs(&self) -> &ArenaConfigs {
        &self.configs
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, post_id: &PostId) -> bool {
        self.registry.contains(post_id)
    }

    /// Number of bodies in the engine, boundaries included.
    pub fn num_bodies(&self) -> usize {
        self.physics.num_bodies()
    }

    pub fn num_boundaries(&self) -> usize {
        self.boundaries
            .iter()
            .filter(|&&rb| self.physics.body(rb).is_some())
            .count()
    }

    pub fn capsule_state(&self, post_id: &PostId) -> Option<CapsuleState> {
        let capsule = self.registry.get(post_id)?;
        self.physics.capsule_state(capsule.rb)
    }

    pub(super) fn physics(&self) -> &Physics {
        &self.physics
    }

    pub(super) fn physics_mut(&mut self) -> &mut Physics {
        &mut self.physics
    }
}

/// Step the world at a fixed rate until it is torn down.
pub(super) async fn run_physics(world: Weak<Mutex<ArenaWorld>>, configs: WorldConfigs) {
    let dt = configs.physics_dt();
    let mut interval = time::interval(dt);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
    let mut clock = StepClock::new(dt, configs.max_behind(), Instant::now());

    loop {
        interval.tick().await;
        let steps = clock.advance(Instant::now());

        let Some(world) = world.upgrade() else {
            break;
        };
        let mut world = world.lock();
        if !world.is_alive() {
            break;
        }
        for _ in 0..steps {
            world.step();
        }
    }

    log::debug!("Physics loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::test_post;

    fn world(width: f32, height: f32) -> ArenaWorld {
        let mut configs = ArenaConfigs::default();
        configs.spawn_configs.seed = Some(1);
        ArenaWorld::new(width, height, configs, Arc::new(CountingFeedback::default())).unwrap()
    }

    fn post(id: &str) -> Arc<Post> {
        Arc::new(test_post(id, chrono::Utc::now()))
    }

    #[test]
    fn test_invalid_dimensions() {
        let feedback = crate::feedback::default_feedback();
        assert!(ArenaWorld::new(0.0, 640.0, Default::default(), feedback.clone()).is_none());
        assert!(ArenaWorld::new(320.0, 0.0, Default::default(), feedback.clone()).is_none());
        assert!(ArenaWorld::new(f32::NAN, 640.0, Default::default(), feedback.clone()).is_none());
        assert!(ArenaWorld::new(-5.0, 640.0, Default::default(), feedback).is_none());
    }

    #[test]
    fn test_boundaries() {
        let world = world(320.0, 640.0);
        assert_eq!(world.num_boundaries(), 3);
        assert_eq!(world.num_bodies(), 3);
        assert!(world.is_empty());
        assert!(world.query_point(160.0, 660.0).is_none());
    }

    #[test]
    fn test_spawn_is_idempotent() {
        let mut world = world(320.0, 640.0);

        assert!(world.spawn_capsule(post("a")));
        assert!(world.spawn_capsule(post("b")));
        assert!(!world.spawn_capsule(post("a")));

        assert_eq!(world.len(), 2);
        assert_eq!(world.num_bodies(), 5);
    }

    #[test]
    fn test_spawn_position() {
        let mut world = world(320.0, 640.0);
        let radius = world.configs().capsule_configs.radius;

        assert!(world.spawn_capsule(post("first")));
        let state = world.capsule_state(&PostId::new("first")).unwrap();
        assert!(state.x >= radius * 2.0 && state.x <= 320.0 - radius * 2.0);
        assert!(state.y <= -radius && state.y >= -radius - 100.0);
    }

    #[test]
    fn test_simultaneous_spawns_do_not_overlap() {
        let mut world = world(320.0, 640.0);
        let radius = world.configs().capsule_configs.radius;

        for i in 0..30 {
            assert!(world.spawn_capsule(post(&i.to_string())));
        }

        let states: Vec<CapsuleState> = world
            .registry()
            .iter()
            .map(|capsule| world.physics().capsule_state(capsule.rb).unwrap())
            .collect();
        for (i, a) in states.iter().enumerate() {
            assert!(a.x >= radius * 2.0 && a.x <= 320.0 - radius * 2.0, "{:?}", a);
            assert!(a.y <= -radius, "{:?}", a);
            for b in &states[i + 1..] {
                let distance = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
                assert!(distance >= radius * 2.0 - 0.01, "{:?} {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_narrow_container_spawns_centered() {
        let mut world = world(100.0, 640.0);
        world.spawn_capsule(post("a"));
        approx::assert_relative_eq!(world.capsule_state(&PostId::new("a")).unwrap().x, 50.0);
    }

    #[test]
    fn test_clear() {
        let mut world = world(320.0, 640.0);
        for id in ["a", "b", "c"] {
            world.spawn_capsule(post(id));
        }
        let epoch = world.epoch();

        world.clear();

        assert!(world.is_empty());
        assert_eq!(world.num_bodies(), 3);
        assert_eq!(world.epoch(), epoch + 1);
        // Can come back after a clear.
        assert!(world.spawn_capsule(post("a")));
    }

    #[test]
    fn test_query_point() {
        let mut world = world(320.0, 640.0);
        world.spawn_capsule_at(post("a"), 100.0, 300.0);
        world.spawn_capsule_at(post("b"), 200.0, 300.0);

        assert_eq!(world.query_point(110.0, 290.0).unwrap().id, PostId::new("a"));
        assert_eq!(world.query_point(200.0, 330.0).unwrap().id, PostId::new("b"));
        assert!(world.query_point(150.0, 300.0).is_none());
    }

    #[test]
    fn test_query_point_prefers_topmost() {
        let mut world = world(320.0, 640.0);
        world.spawn_capsule_at(post("under"), 100.0, 300.0);
        world.spawn_capsule_at(post("over"), 130.0, 300.0);

        assert_eq!(world.query_point(115.0, 300.0).unwrap().id, PostId::new("over"));
        assert_eq!(world.query_point(80.0, 300.0).unwrap().id, PostId::new("under"));
    }

    fn assert_settled_inside(world: &ArenaWorld) {
        let radius = world.configs().capsule_configs.radius;
        let tolerance = 2.0;
        for capsule in world.registry().iter() {
            let state = world.physics().capsule_state(capsule.rb).unwrap();
            assert!(state.y + radius <= 640.0 + tolerance, "{:?}", state);
            assert!(state.x - radius >= -tolerance, "{:?}", state);
            assert!(state.x + radius <= 320.0 + tolerance, "{:?}", state);
            assert!(state.y > capsule.spawn_position.y, "{:?}", state);
            assert!(state.speed < world.configs().sleep_configs.speed_threshold, "{:?}", state);
        }
    }

    #[test]
    fn test_capsules_settle_inside() {
        for seed in 0..10 {
            let mut configs = ArenaConfigs::default();
            configs.spawn_configs.seed = Some(seed);
            let mut world =
                ArenaWorld::new(320.0, 640.0, configs, Arc::new(CountingFeedback::default()))
                    .unwrap();
            for i in 0..8 {
                world.spawn_capsule(post(&i.to_string()));
            }

            // 20 simulated seconds.
            for _ in 0..1200 {
                world.step();
            }

            assert_eq!(world.len(), 8);
            assert_settled_inside(&world);
            assert!(world.impacts() > 0);
        }
    }

    #[test]
    fn test_overlapping_batches_settle_inside() {
        for seed in 0..5 {
            let mut configs = ArenaConfigs::default();
            configs.spawn_configs.seed = Some(seed);
            let mut world =
                ArenaWorld::new(320.0, 640.0, configs, Arc::new(CountingFeedback::default()))
                    .unwrap();

            // Three batches of six landing on the same instant.
            for batch in 0..3 {
                for i in 0..6 {
                    world.spawn_capsule(post(&format!("{}-{}", batch, i)));
                }
            }
            for _ in 0..1200 {
                world.step();
            }

            assert_eq!(world.len(), 18);
            assert_settled_inside(&world);
        }
    }

    #[test]
    fn test_one_impact_per_step() {
        let feedback = Arc::new(CountingFeedback::default());
        let mut world = ArenaWorld::new(
            320.0,
            640.0,
            Default::default(),
            feedback.clone() as Arc<dyn ImpactFeedback>,
        )
        .unwrap();
        // Same height, far enough apart to only touch the floor.
        world.spawn_capsule_at(post("a"), 80.0, 300.0);
        world.spawn_capsule_at(post("b"), 240.0, 300.0);

        let mut landed = false;
        for _ in 0..120 {
            world.step();
            if world.physics().num_contacts_started() > 0 {
                assert_eq!(world.physics().num_contacts_started(), 2);
                landed = true;
                break;
            }
        }

        assert!(landed);
        assert_eq!(world.impacts(), 1);
        assert_eq!(feedback.played(), 1);
    }

    #[test]
    fn test_invalid_configs() {
        let mut configs = ArenaConfigs::default();
        configs.render_configs.frame_interval_ms = 0;
        let feedback = crate::feedback::default_feedback();
        assert!(ArenaWorld::new(320.0, 640.0, configs, feedback.clone()).is_none());

        let mut configs = ArenaConfigs::default();
        configs.world_configs.physics_dt = 0.0;
        assert!(ArenaWorld::new(320.0, 640.0, configs, feedback).is_none());
    }

    #[test]
    fn test_shutdown() {
        let mut world = world(320.0, 640.0);
        world.spawn_capsule(post("a"));

        world.shutdown();
        world.shutdown();

        assert!(!world.is_alive());
        assert!(world.is_empty());
        assert_eq!(world.num_bodies(), 0);
        assert!(!world.spawn_capsule(post("b")));
        world.step();
        assert_eq!(world.tick(), 0);
    }
}
