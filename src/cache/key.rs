use std::fmt;

use crate::models::PostId;
use crate::paths;

/// Deterministic identifier for one cached server collection.
///
/// The key doubles as the GET path used to fetch it, so two views asking for
/// the same collection always land on the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// The global post list.
    pub fn posts() -> Self {
        Self(paths::POSTS.to_string())
    }

    /// Comments belonging to one post.
    pub fn comments(post_id: &PostId) -> Self {
        Self(paths::post_comments(post_id))
    }

    pub fn path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
