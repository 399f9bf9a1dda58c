//! User-initiated events sent to the frontend daemon: content events
//! (create/edit board, thread, post, user) and signal events (votes,
//! reports, mod actions, follows, elects).

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Whether an event mints a new entity or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Create,
    Update,
}

/// Common header carried by every content and signal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Fingerprint of the local user issuing the event
    pub owner_fingerprint: String,
    /// Fingerprint of the entity being updated; empty for creations
    pub prior_fingerprint: String,
    pub kind: EventKind,
    /// Unix timestamp, seconds
    pub timestamp: i64,
}

impl Event {
    /// Build an event header stamped with the current time. An empty
    /// `prior_fingerprint` makes this a creation, anything else an update.
    pub fn new(owner_fingerprint: impl Into<String>, prior_fingerprint: impl Into<String>) -> Self {
        let prior_fingerprint = prior_fingerprint.into();
        let kind = if prior_fingerprint.is_empty() {
            EventKind::Create
        } else {
            EventKind::Update
        };
        Self {
            owner_fingerprint: owner_fingerprint.into(),
            prior_fingerprint,
            kind,
            timestamp: Utc::now().timestamp(),
        }
    }
}

// ========================================================================
// Content events
// ========================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardContent {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadContent {
    /// Board the thread is posted into
    pub board: String,
    pub name: String,
    pub body: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostContent {
    pub board: String,
    pub thread: String,
    /// Parent post fingerprint, or the thread fingerprint for top-level posts
    pub parent: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContent {
    pub name: String,
    pub info: String,
}

/// A create-or-edit request for a user-owned entity. Exactly one of the
/// data fields is set; the others stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEventPayload {
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_data: Option<BoardContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_data: Option<ThreadContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<PostContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<UserContent>,
}

impl ContentEventPayload {
    pub fn board(event: Event, data: BoardContent) -> Self {
        Self {
            event,
            board_data: Some(data),
            thread_data: None,
            post_data: None,
            user_data: None,
        }
    }

    pub fn thread(event: Event, data: ThreadContent) -> Self {
        Self {
            event,
            board_data: None,
            thread_data: Some(data),
            post_data: None,
            user_data: None,
        }
    }

    pub fn post(event: Event, data: PostContent) -> Self {
        Self {
            event,
            board_data: None,
            thread_data: None,
            post_data: Some(data),
            user_data: None,
        }
    }

    pub fn user(event: Event, data: UserContent) -> Self {
        Self {
            event,
            board_data: None,
            thread_data: None,
            post_data: None,
            user_data: Some(data),
        }
    }
}

// ========================================================================
// Signal events
// ========================================================================

/// Broad category a signal belongs to. The frontend aggregates signals
/// per class (e.g. votes land in bloom filters, mod actions stay
/// individual and retractable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTypeClass {
    AddsToDiscussion,
    FollowsGuidelines,
    ModActions,
    PublicTrust,
    PublicElect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Upvote,
    Downvote,
    ReportToMod,
    ModBlock,
    ModApprove,
    Follow,
    Block,
    Elect,
    Disqualify,
}

impl SignalKind {
    /// The class each signal kind aggregates under.
    pub fn type_class(&self) -> SignalTypeClass {
        match self {
            SignalKind::Upvote | SignalKind::Downvote => SignalTypeClass::AddsToDiscussion,
            SignalKind::ReportToMod => SignalTypeClass::FollowsGuidelines,
            SignalKind::ModBlock | SignalKind::ModApprove => SignalTypeClass::ModActions,
            SignalKind::Follow | SignalKind::Block => SignalTypeClass::PublicTrust,
            SignalKind::Elect | SignalKind::Disqualify => SignalTypeClass::PublicElect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTargetType {
    Content,
    User,
}

/// A signal aimed at a piece of content or a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEventPayload {
    pub event: Event,
    pub target_fingerprint: String,
    pub target_type: SignalTargetType,
    pub type_class: SignalTypeClass,
    pub kind: SignalKind,
    /// Free-text attached to the signal (report reason, mod rationale)
    pub text: String,
    /// Board context, only set for content targets
    pub target_board: String,
    /// Thread context, only set for content targets
    pub target_thread: String,
}

impl SignalEventPayload {
    /// Signal against a piece of content, carrying its board/thread context.
    pub fn content(
        event: Event,
        target_fingerprint: impl Into<String>,
        kind: SignalKind,
        text: impl Into<String>,
        target_board: impl Into<String>,
        target_thread: impl Into<String>,
    ) -> Self {
        Self {
            event,
            target_fingerprint: target_fingerprint.into(),
            target_type: SignalTargetType::Content,
            type_class: kind.type_class(),
            kind,
            text: text.into(),
            target_board: target_board.into(),
            target_thread: target_thread.into(),
        }
    }

    /// Signal against a user.
    pub fn user(event: Event, target_fingerprint: impl Into<String>, kind: SignalKind) -> Self {
        Self {
            event,
            target_fingerprint: target_fingerprint.into(),
            target_type: SignalTargetType::User,
            type_class: kind.type_class(),
            kind,
            text: String::new(),
            target_board: String::new(),
            target_thread: String::new(),
        }
    }
}

// ========================================================================
// Requests
// ========================================================================

/// Per-board subscription state written back to the frontend.
/// `last_seen_only` restricts the write to the last-seen timestamp so a
/// view refresh does not clobber the subscription flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardSignalRequest {
    pub fingerprint: String,
    pub subscribed: bool,
    pub notify: bool,
    pub last_seen: i64,
    pub last_seen_only: bool,
}

/// Which parts of a user's graph the profile view needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserViewRequest {
    pub fingerprint: String,
    pub user_entity_requested: bool,
    pub boards_requested: bool,
    pub threads_requested: bool,
    pub posts_requested: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UncompiledEntityKind {
    Board,
    Thread,
    Post,
    Vote,
    Key,
    Truststate,
}

/// Page of raw entities owned by a given key, for diagnostic views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityByKeyRequest {
    pub kind: UncompiledEntityKind,
    pub owner_fingerprint: String,
    pub limit: i32,
    pub offset: i32,
}
