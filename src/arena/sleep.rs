use super::*;

impl ArenaWorld {
    /// Put awake capsules slower than the sleep threshold to sleep.
    /// Return how many were put to sleep.
    ///
    /// Only saves work. The engine wakes them again on contact or drag.
    pub fn sleep_idle(&mut self) -> usize {
        if !self.is_alive() {
            return 0;
        }

        let threshold = self.configs().sleep_configs.speed_threshold;
        let handles: Vec<RigidBodyHandle> = self.registry().iter().map(|c| c.rb).collect();
        let physics = self.physics_mut();
        let scale = physics.scale();

        let mut num_slept = 0;
        for rb in handles {
            let Some(body) = physics.body_mut(rb) else {
                continue;
            };
            if !body.is_sleeping() && scale.length_to_pixels(body.linvel().norm()) < threshold {
                body.sleep();
                num_slept += 1;
            }
        }

        if num_slept > 0 {
            log::debug!("Put {} capsules to sleep", num_slept);
        }
        num_slept
    }
}

/// Periodically call [`ArenaWorld::sleep_idle`] until the world is torn down.
pub(super) async fn run_sleep_checks(world: Weak<Mutex<ArenaWorld>>, configs: SleepConfigs) {
    let period = configs.check_interval();
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(world) = world.upgrade() else {
            break;
        };
        let mut world = world.lock();
        if !world.is_alive() {
            break;
        }
        world.sleep_idle();
    }

    log::debug!("Sleep checks stopped");
}
