use super::*;

/// A post currently simulated in the arena.
#[derive(Debug, Clone)]
pub struct CapsuleBody {
    pub capsule_id: CapsuleId,
    pub rb: RigidBodyHandle,
    pub post: Arc<Post>,
    /// Where the capsule entered the arena, in pixels.
    pub spawn_position: Vector<Real>,
}

/// Post id -> simulated body. At most one body per post.
///
/// Iteration order is spawn order: removal shifts instead of swapping.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    capsules: IndexMap<PostId, CapsuleBody, RandomState>,
}
impl BodyRegistry {
    /// Return `false` and drop `capsule` if its post is already registered.
    pub fn insert(&mut self, capsule: CapsuleBody) -> bool {
        match self.capsules.entry(capsule.post.id.clone()) {
            indexmap::map::Entry::Occupied(_) => false,
            indexmap::map::Entry::Vacant(entry) => {
                entry.insert(capsule);
                true
            }
        }
    }

    pub fn contains(&self, post_id: &PostId) -> bool {
        self.capsules.contains_key(post_id)
    }

    pub fn get(&self, post_id: &PostId) -> Option<&CapsuleBody> {
        self.capsules.get(post_id)
    }

    pub fn remove(&mut self, post_id: &PostId) -> Option<CapsuleBody> {
        self.capsules.shift_remove(post_id)
    }

    /// Empty the registry, oldest capsule first.
    pub fn drain(&mut self) -> impl Iterator<Item = CapsuleBody> + '_ {
        self.capsules.drain(..).map(|(_, capsule)| capsule)
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CapsuleBody> {
        self.capsules.values()
    }

    /// Most recently spawned first. Later capsules are drawn over earlier ones.
    pub fn iter_topmost(&self) -> impl Iterator<Item = &CapsuleBody> {
        self.capsules.values().rev()
    }

    pub fn len(&self) -> usize {
        self.capsules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capsules.is_empty()
    }
}
