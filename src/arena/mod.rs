pub mod clock;
pub mod drag;
pub mod gesture;
pub mod physics;
pub mod registry;
pub mod render;
mod sleep;
mod spawner;
pub mod world;

use super::*;
use crate::configs::*;
use crate::feedback;
use crate::ids::CapsuleId;
use rapier2d::prelude::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub use clock::StepClock;
pub use drag::DragConstraint;
pub use gesture::{Gesture, GestureClassifier};
pub use physics::*;
pub use registry::{BodyRegistry, CapsuleBody};
pub use render::{CapsuleView, Snapshot};
pub use spawner::Spawner;
pub use world::ArenaWorld;

/// A capsule the user tapped.
#[derive(Debug, Clone)]
pub struct Selection {
    pub post: Arc<Post>,
}

/// Background work and shared state of a mounted arena.
struct Session {
    world: Arc<Mutex<ArenaWorld>>,
    snapshots: Arc<watch::Sender<Arc<Snapshot>>>,
    spawner: Spawner,
    /// Physics, render and sleep loops.
    loops: [JoinHandle<()>; 3],
}

/// The capsule container.
///
/// Owns one simulation session between [`Arena::mount`] and [`Arena::teardown`],
/// and routes pointer events to the drag constraint and the tap classifier.
/// Everything spawned runs on the current tokio runtime.
pub struct Arena {
    configs: ArenaConfigs,
    feedback: Arc<dyn ImpactFeedback>,
    gesture: GestureClassifier,
    session: Option<Session>,
}
impl Arena {
    pub fn new(configs: ArenaConfigs, feedback: Arc<dyn ImpactFeedback>) -> Self {
        Self {
            gesture: GestureClassifier::new(&configs.gesture_configs),
            configs,
            feedback,
            session: None,
        }
    }

    /// Start simulating in a `width` x `height` container (pixels).
    ///
    /// A mounted arena is torn down and rebuilt. Return `false` and stay
    /// unmounted while the container has no area.
    pub fn mount(&mut self, width: f32, height: f32) -> bool {
        self.teardown();

        let Some(world) = ArenaWorld::new(width, height, self.configs, self.feedback.clone())
        else {
            return false;
        };
        let world = Arc::new(Mutex::new(world));
        let (sender, _) = watch::channel(Arc::new(Snapshot::default()));
        let snapshots = Arc::new(sender);

        let loops = [
            tokio::spawn(world::run_physics(
                Arc::downgrade(&world),
                self.configs.world_configs,
            )),
            tokio::spawn(render::run_render(
                Arc::downgrade(&world),
                snapshots.clone(),
                self.configs.render_configs,
            )),
            tokio::spawn(sleep::run_sleep_checks(
                Arc::downgrade(&world),
                self.configs.sleep_configs,
            )),
        ];

        self.session = Some(Session {
            world,
            snapshots,
            spawner: Spawner::new(&self.configs.spawn_configs),
            loops,
        });

        log::info!("Arena mounted {}x{}", width, height);
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.session.is_some()
    }

    /// Add `posts` that are not in the arena yet, staggered.
    pub fn drop_capsules(&mut self, posts: &[Arc<Post>]) -> usize {
        self.schedule(posts, Duration::ZERO)
    }

    /// Replace the arena content with `posts`.
    pub fn populate(&mut self, posts: &[Arc<Post>]) -> usize {
        self.clear();
        let delay = self.configs.spawn_configs.repopulate_delay();
        let scheduled = self.schedule(posts, delay);
        log::info!("Populating arena with {} capsules", scheduled);
        scheduled
    }

    fn schedule(&mut self, posts: &[Arc<Post>], delay: Duration) -> usize {
        let Some(session) = &mut self.session else {
            log::debug!("Ignoring {} capsules, arena not mounted", posts.len());
            return 0;
        };
        session.spawner.schedule(&session.world, posts, delay)
    }

    /// Remove every capsule. Spawns still pending from before are dropped.
    pub fn clear(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };

        session.world.lock().clear();
        session.spawner.cancel_all();

        let frame = session.snapshots.borrow().frame;
        session.snapshots.send_replace(Arc::new(Snapshot {
            frame,
            capsules: Vec::new(),
        }));
        log::info!("Arena cleared");
    }

    /// Pointer pressed at container pixels `(x, y)`.
    /// Grabs the capsule under the pointer, if any.
    pub fn pointer_down(&mut self, x: f32, y: f32, at: Instant) {
        self.gesture.pointer_down(x, y, at);
        if let Some(session) = &self.session {
            session.world.lock().grab(x, y);
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if let Some(session) = &self.session {
            session.world.lock().drag_to(x, y);
        }
    }

    /// Pointer released. A tap on a capsule selects its post.
    pub fn pointer_up(&mut self, x: f32, y: f32, at: Instant) -> Option<Selection> {
        let gesture = self.gesture.pointer_up(x, y, at);
        let session = self.session.as_ref()?;
        let mut world = session.world.lock();
        world.release();

        match gesture? {
            Gesture::Tap { x, y } => {
                let post = world.query_point(x, y)?.clone();
                log::info!("Selected {} ({} - {})", post.id, post.artist, post.title);
                Some(Selection { post })
            }
            Gesture::Drag { distance, elapsed } => {
                log::debug!(
                    "Drag of {:.0}px over {}ms, no selection",
                    distance,
                    elapsed.as_millis()
                );
                None
            }
        }
    }

    /// Latest snapshot and every following one. `None` while unmounted.
    pub fn snapshots(&self) -> Option<watch::Receiver<Arc<Snapshot>>> {
        self.session
            .as_ref()
            .map(|session| session.snapshots.subscribe())
    }

    /// Run `f` on the live world. `None` while unmounted.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut ArenaWorld) -> R) -> Option<R> {
        let session = self.session.as_ref()?;
        let mut world = session.world.lock();
        Some(f(&mut world))
    }

    /// Stop every loop and timer and release all bodies. Safe to call any time.
    pub fn teardown(&mut self) {
        self.gesture.cancel();
        let Some(mut session) = self.session.take() else {
            return;
        };

        for handle in session.loops.iter() {
            handle.abort();
        }
        session.spawner.cancel_all();
        session.world.lock().shutdown();

        log::info!("Arena torn down");
    }

    pub fn configs(&self) -> &ArenaConfigs {
        &self.configs
    }
}
impl Drop for Arena {
    fn drop(&mut self) {
        self.teardown();
    }
}
