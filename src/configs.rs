use super::*;
use anyhow::Context;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ArenaConfigs {
    pub world_configs: WorldConfigs,
    pub capsule_configs: CapsuleConfigs,
    pub spawn_configs: SpawnConfigs,
    pub sleep_configs: SleepConfigs,
    pub render_configs: RenderConfigs,
    pub gesture_configs: GestureConfigs,
}
impl ArenaConfigs {
    /// Read configs from a json file. Missing fields take their default value.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading arena configs {}", path.display()))?;
        let configs: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing arena configs {}", path.display()))?;
        configs
            .validate()
            .with_context(|| format!("invalid arena configs {}", path.display()))?;
        Ok(configs)
    }

    /// Reject values the simulation can not run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let world = &self.world_configs;
        anyhow::ensure!(
            world.physics_dt.is_finite() && world.physics_dt > 0.0,
            "physics_dt must be positive, got {}",
            world.physics_dt
        );
        anyhow::ensure!(
            world.pixels_per_meter.is_finite() && world.pixels_per_meter > 0.0,
            "pixels_per_meter must be positive, got {}",
            world.pixels_per_meter
        );
        anyhow::ensure!(
            world.wall_thickness > 0.0,
            "wall_thickness must be positive, got {}",
            world.wall_thickness
        );
        anyhow::ensure!(
            self.capsule_configs.radius > 0.0,
            "radius must be positive, got {}",
            self.capsule_configs.radius
        );
        anyhow::ensure!(
            self.sleep_configs.check_interval_ms > 0,
            "check_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.render_configs.frame_interval_ms > 0,
            "frame_interval_ms must be positive"
        );
        Ok(())
    }
}

/// Arena-wide physics. Lengths are pixels, times are seconds unless noted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfigs {
    /// Simulation runs in meters. Everything outside the physics module is pixels.
    pub pixels_per_meter: f32,
    /// Downward acceleration in pixels/s².
    pub gravity: f32,
    /// Thickness of the floor and both walls.
    /// Needs to be well above the distance a capsule travels in one step.
    pub wall_thickness: f32,
    pub floor_friction: f32,
    pub wall_friction: f32,
    /// Fixed physics time step.
    pub physics_dt: f32,
    /// How far behind the physics loop may fall before skipping steps (ms).
    pub max_behind_ms: u64,
    /// Let the engine put resting bodies to sleep on its own.
    pub enable_sleeping: bool,
    /// Capsule speed (pixels/s) at contact above which a contact counts as an impact.
    pub impact_speed_threshold: f32,
}
impl WorldConfigs {
    const MIN_PHYSICS_DT: f32 = 0.0001;
    const MAX_PHYSICS_DT: f32 = 1.0;

    /// Clamped to something a timer can tick at.
    pub fn physics_dt(&self) -> Duration {
        let dt = if self.physics_dt.is_nan() {
            Self::default().physics_dt
        } else {
            self.physics_dt
                .clamp(Self::MIN_PHYSICS_DT, Self::MAX_PHYSICS_DT)
        };
        Duration::from_secs_f32(dt)
    }

    pub fn max_behind(&self) -> Duration {
        Duration::from_millis(self.max_behind_ms)
    }
}
impl Default for WorldConfigs {
    fn default() -> Self {
        Self {
            pixels_per_meter: 50.0,
            gravity: 1200.0,
            wall_thickness: 50.0,
            floor_friction: 0.8,
            wall_friction: 0.3,
            physics_dt: 1.0 / 60.0,
            max_behind_ms: 250,
            enable_sleeping: true,
            impact_speed_threshold: 120.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfigs {
    /// Same radius for every capsule.
    pub radius: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Air drag, per second.
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Mass per square pixel.
    pub density: f32,
    /// Capsules spawn above the arena, up to this much higher than one radius.
    pub spawn_height_jitter: f32,
}
impl Default for CapsuleConfigs {
    fn default() -> Self {
        Self {
            radius: 35.0,
            restitution: 0.3,
            friction: 0.5,
            linear_damping: 0.6,
            angular_damping: 0.6,
            density: 0.002,
            spawn_height_jitter: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfigs {
    /// Delay between two capsules of the same batch (ms).
    pub stagger_ms: u64,
    /// Delay between a clear and the spawn of the new batch when repopulating (ms).
    pub repopulate_delay_ms: u64,
    /// Seed spawn positions. Random when `None`.
    pub seed: Option<u64>,
}
impl SpawnConfigs {
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn repopulate_delay(&self) -> Duration {
        Duration::from_millis(self.repopulate_delay_ms)
    }
}
impl Default for SpawnConfigs {
    fn default() -> Self {
        Self {
            stagger_ms: 120,
            repopulate_delay_ms: 50,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfigs {
    /// How often slow capsules are forced to sleep (ms).
    pub check_interval_ms: u64,
    /// Pixels/s under which an awake capsule is put to sleep.
    pub speed_threshold: f32,
}
impl SleepConfigs {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms.max(1))
    }
}
impl Default for SleepConfigs {
    fn default() -> Self {
        Self {
            check_interval_ms: 3000,
            speed_threshold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfigs {
    /// Time between two published snapshots (ms).
    pub frame_interval_ms: u64,
}
impl RenderConfigs {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}
impl Default for RenderConfigs {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfigs {
    /// A release further than this from the press (pixels) is a drag.
    pub tap_max_distance: f32,
    /// A release later than this after the press (ms) is a drag.
    pub tap_max_duration_ms: u64,
    /// Fraction of the gap between a grabbed capsule and the pointer closed each step.
    pub drag_stiffness: f32,
}
impl GestureConfigs {
    pub fn tap_max_duration(&self) -> Duration {
        Duration::from_millis(self.tap_max_duration_ms)
    }
}
impl Default for GestureConfigs {
    fn default() -> Self {
        Self {
            tap_max_distance: 10.0,
            tap_max_duration_ms: 300,
            drag_stiffness: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json() {
        let configs: ArenaConfigs =
            serde_json::from_str(r#"{ "spawn_configs": { "stagger_ms": 10, "seed": 7 } }"#)
                .unwrap();

        assert_eq!(configs.spawn_configs.stagger(), Duration::from_millis(10));
        assert_eq!(configs.spawn_configs.seed, Some(7));
        assert_eq!(configs.spawn_configs.repopulate_delay_ms, 50);
        assert_eq!(configs.capsule_configs.radius, 35.0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ArenaConfigs::load("/nonexistent/arena.json").unwrap_err();
        assert!(format!("{:#}", err).contains("reading arena configs"));
    }

    #[test]
    fn test_defaults_are_valid() {
        ArenaConfigs::default().validate().unwrap();
    }

    #[test]
    fn test_load_rejects_zero_frame_interval() {
        let path = std::env::temp_dir().join(format!("arena-configs-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "render_configs": { "frame_interval_ms": 0 } }"#).unwrap();

        let err = ArenaConfigs::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        let message = format!("{:#}", err);
        assert!(message.contains("invalid arena configs"), "{}", message);
        assert!(message.contains("frame_interval_ms"), "{}", message);
    }

    #[test]
    fn test_validate_rejects_non_positive_dt() {
        for dt in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let mut configs = ArenaConfigs::default();
            configs.world_configs.physics_dt = dt;
            assert!(configs.validate().is_err(), "dt: {}", dt);
        }
    }

    #[test]
    fn test_durations_never_zero() {
        let mut configs = ArenaConfigs::default();
        configs.render_configs.frame_interval_ms = 0;
        configs.sleep_configs.check_interval_ms = 0;
        configs.world_configs.physics_dt = -1.0;

        assert!(configs.render_configs.frame_interval() > Duration::ZERO);
        assert!(configs.sleep_configs.check_interval() > Duration::ZERO);
        assert!(configs.world_configs.physics_dt() > Duration::ZERO);

        configs.world_configs.physics_dt = f32::NAN;
        assert_eq!(configs.world_configs.physics_dt(), Duration::from_secs_f32(1.0 / 60.0));
    }
}
