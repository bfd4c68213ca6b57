use super::*;

/// Where to draw one capsule this frame.
#[derive(Debug, Clone)]
pub struct CapsuleView {
    pub post_id: PostId,
    pub post: Arc<Post>,
    /// Center, container pixels.
    pub x: f32,
    pub y: f32,
    /// Radians.
    pub angle: f32,
}

/// Immutable projection of every capsule, oldest first.
///
/// A new snapshot replaces the previous one, it is never edited in place.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Render tick this was taken on.
    pub frame: u64,
    pub capsules: Vec<CapsuleView>,
}
impl Snapshot {
    pub fn get(&self, post_id: &PostId) -> Option<&CapsuleView> {
        self.capsules.iter().find(|view| &view.post_id == post_id)
    }

    pub fn len(&self) -> usize {
        self.capsules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capsules.is_empty()
    }
}

impl ArenaWorld {
    /// Sleeping capsules included.
    pub fn snapshot(&self, frame: u64) -> Snapshot {
        let physics = self.physics();
        let capsules = self
            .registry()
            .iter()
            .filter_map(|capsule| {
                let state = physics.capsule_state(capsule.rb)?;
                Some(CapsuleView {
                    post_id: capsule.post.id.clone(),
                    post: capsule.post.clone(),
                    x: state.x,
                    y: state.y,
                    angle: state.angle,
                })
            })
            .collect();

        Snapshot { frame, capsules }
    }
}

/// Publish a snapshot every frame until the world is torn down.
pub(super) async fn run_render(
    world: Weak<Mutex<ArenaWorld>>,
    sender: Arc<watch::Sender<Arc<Snapshot>>>,
    configs: RenderConfigs,
) {
    let mut interval = time::interval(configs.frame_interval());
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    let mut frame = sender.borrow().frame;

    loop {
        interval.tick().await;
        frame += 1;

        let snapshot = {
            let Some(world) = world.upgrade() else {
                break;
            };
            let world = world.lock();
            if !world.is_alive() {
                break;
            }
            world.snapshot(frame)
        };

        sender.send_replace(Arc::new(snapshot));
    }

    log::debug!("Render loop stopped");
}
