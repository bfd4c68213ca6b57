use super::*;
use std::fmt;

/// Identifier the data-access service gives a post. Opaque to the arena.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);
impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl From<&str> for PostId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub String);

/// Serial number of a spawned body, packed in the rigid body's user data.
///
/// Strictly increasing over the lifetime of a world, so it also orders
/// capsules from oldest to most recently spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CapsuleId(pub u64);
impl CapsuleId {
    /// Return the current id and increment.
    pub fn next(&mut self) -> Self {
        let id = *self;
        self.0 += 1;
        id
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}
