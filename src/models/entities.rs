//! Compiled entity payloads served by the frontend daemon.
//!
//! "Compiled" entities are the frontend's fully-resolved view objects: the
//! raw network entities merged with their signal aggregates (votes, mod
//! actions, follows) so the client can render them without further lookups.
//! The client never constructs these; it only decodes them.

use serde::{Deserialize, Serialize};

/// Aggregated vote/mod signals attached to a piece of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSignals {
    pub target_fingerprint: String,
    pub upvotes: i32,
    pub downvotes: i32,
    /// Whether the local user has upvoted this content
    pub self_upvoted: bool,
    /// Whether the local user has downvoted this content
    pub self_downvoted: bool,
    pub by_mod: bool,
    pub by_followed_person: bool,
    pub by_blocked_person: bool,
}

/// Aggregated trust/elect signals attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSignals {
    pub target_fingerprint: String,
    pub followed_by_self: bool,
    pub blocked_by_self: bool,
    pub follower_count: i32,
    pub canonical_name: String,
    pub made_mod_by_default: bool,
    pub made_mod_by_network: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledUser {
    pub fingerprint: String,
    pub non_canonical_name: String,
    /// Unix timestamps
    pub creation: i64,
    pub last_update: i64,
    pub last_refreshed: i64,
    pub expiry: i64,
    pub info: String,
    pub signals: Option<UserSignals>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledBoard {
    pub fingerprint: String,
    /// True when the local user created this board
    pub self_created: bool,
    pub name: String,
    pub description: String,
    pub owner: Option<CompiledUser>,
    pub creation: i64,
    pub last_update: i64,
    pub threads_count: i32,
    pub user_count: i32,
    pub subscribed: bool,
    pub notify: bool,
    /// Last time the local user viewed this board, unix timestamp
    pub last_seen: i64,
    pub signals: Option<ContentSignals>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledThread {
    pub fingerprint: String,
    /// Fingerprint of the board this thread belongs to
    pub board: String,
    pub self_created: bool,
    pub name: String,
    pub body: String,
    pub link: String,
    pub owner: Option<CompiledUser>,
    pub creation: i64,
    pub last_update: i64,
    pub posts_count: i32,
    pub signals: Option<ContentSignals>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledPost {
    pub fingerprint: String,
    pub board: String,
    pub thread: String,
    /// Parent post fingerprint, or the thread fingerprint for top-level posts
    pub parent: String,
    pub self_created: bool,
    pub body: String,
    pub owner: Option<CompiledUser>,
    pub creation: i64,
    pub last_update: i64,
    pub signals: Option<ContentSignals>,
}

/// Response payload for a board view: the board plus its threads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardAndThreads {
    pub board: CompiledBoard,
    pub threads: Vec<CompiledThread>,
}

/// Response payload for a thread view: the enclosing board, the thread,
/// and its posts as a flat list (the client rebuilds the tree from
/// `parent` fingerprints).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadAndPosts {
    pub board: CompiledBoard,
    pub thread: CompiledThread,
    pub posts: Vec<CompiledPost>,
}

/// Response payload for a user profile view. The graph parts are only
/// populated when the request asked for them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAndGraph {
    pub user_exists: bool,
    pub user: Option<CompiledUser>,
    pub boards: Vec<CompiledBoard>,
    pub threads: Vec<CompiledThread>,
    pub posts: Vec<CompiledPost>,
}

/// Raw (uncompiled) network entities, returned for diagnostic views.
/// The entity schema is owned by the frontend; the client treats them
/// as opaque JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UncompiledEntities {
    pub entities: Vec<serde_json::Value>,
}
