pub mod arena;
pub mod capsule;
pub mod configs;
pub mod feedback;
pub mod ids;
pub mod logger;
pub mod post;

use ahash::RandomState;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio::time::{self, Duration, Instant};

pub use arena::{Arena, ArenaWorld, Selection};
pub use capsule::CapsuleSprite;
pub use configs::ArenaConfigs;
pub use feedback::{CountingFeedback, ImpactFeedback, LogFeedback};
pub use ids::PostId;
pub use post::{MonthKey, Post};
