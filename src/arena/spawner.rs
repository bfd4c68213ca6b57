use super::*;

/// Trickle a batch of posts into the world, one every `stagger`.
///
/// Timers only hold a weak handle on the world and check its epoch when they fire,
/// so a timer outliving a clear or a teardown does nothing.
pub struct Spawner {
    stagger: Duration,
    pending: Vec<JoinHandle<()>>,
}
impl Spawner {
    pub fn new(configs: &SpawnConfigs) -> Self {
        Self {
            stagger: configs.stagger(),
            pending: Vec::new(),
        }
    }

    /// Post at index `i` spawns after `delay + i * stagger`.
    /// Posts already in the world are skipped. Return how many were scheduled.
    pub fn schedule(
        &mut self,
        world: &Arc<Mutex<ArenaWorld>>,
        posts: &[Arc<Post>],
        delay: Duration,
    ) -> usize {
        self.pending.retain(|handle| !handle.is_finished());

        let (epoch, fresh) = {
            let world = world.lock();
            if !world.is_alive() {
                log::warn!("Not spawning {} capsules into a dead world", posts.len());
                return 0;
            }
            let fresh: Vec<bool> = posts.iter().map(|post| !world.contains(&post.id)).collect();
            (world.epoch(), fresh)
        };

        let mut scheduled = 0;
        for (index, (post, fresh)) in posts.iter().zip(fresh).enumerate() {
            if !fresh {
                continue;
            }

            let at = delay + self.stagger * index as u32;
            let world = Arc::downgrade(world);
            let post = post.clone();
            self.pending
                .push(tokio::spawn(spawn_later(world, post, epoch, at)));
            scheduled += 1;
        }

        scheduled
    }

    /// Timers not fired yet.
    pub fn num_pending(&self) -> usize {
        self.pending
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn cancel_all(&mut self) {
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}
impl Drop for Spawner {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn spawn_later(world: Weak<Mutex<ArenaWorld>>, post: Arc<Post>, epoch: u64, delay: Duration) {
    time::sleep(delay).await;

    let Some(world) = world.upgrade() else {
        log::warn!("Dropped spawn of {}, arena is gone", post.id);
        return;
    };
    let mut world = world.lock();
    if !world.is_alive() {
        log::warn!("Dropped spawn of {}, arena is torn down", post.id);
    } else if world.epoch() != epoch {
        log::debug!("Dropped spawn of {}, arena was cleared", post.id);
    } else {
        world.spawn_capsule(post);
    }
}
