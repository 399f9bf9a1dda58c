//! Ambient payloads pushed unsolicited by the frontend daemon once the
//! handshake completes: board summaries for the sidebar, health status,
//! the local user entity, and notifications.

use serde::{Deserialize, Serialize};

use crate::models::entities::CompiledUser;

/// Lightweight board summary for the ambient sidebar list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientBoard {
    pub fingerprint: String,
    pub name: String,
    pub last_update: i64,
    pub last_seen: i64,
}

/// Health status of the backend process, relayed through the frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendAmbientStatus {
    pub backend_config_location: String,
    pub caching_status: String,
    pub last_cache_generation_duration_seconds: i32,
}

/// Health status of the frontend daemon's own compile/refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrontendAmbientStatus {
    pub refresher_status: String,
    pub last_refresh_timestamp: i64,
    pub last_refresh_duration_seconds: i32,
}

/// A user-initiated entity still waiting to be minted and gossiped out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InflightEntry {
    pub kind: String,
    pub fingerprint: String,
    pub status: String,
}

/// Ambient status push. Every field is optional because the daemon sends
/// partial updates; fields that are absent leave the previously delivered
/// value in place (see [`AmbientStatusPayload::merge_from`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientStatusPayload {
    pub backend: Option<BackendAmbientStatus>,
    pub frontend: Option<FrontendAmbientStatus>,
    pub inflights: Option<Vec<InflightEntry>>,
}

impl AmbientStatusPayload {
    /// Merge a partial update into this status. Absent parts of `update`
    /// keep the current value, so an inflights-only push does not wipe the
    /// backend/frontend health previously received.
    pub fn merge_from(&mut self, update: AmbientStatusPayload) {
        if let Some(backend) = update.backend {
            self.backend = Some(backend);
        }
        if let Some(frontend) = update.frontend {
            self.frontend = Some(frontend);
        }
        if let Some(inflights) = update.inflights {
            self.inflights = Some(inflights);
        }
    }
}

/// The local user entity push. `local_user` is only present when a local
/// user has been created on this machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientLocalUserPayload {
    pub local_user_exists: bool,
    pub local_user: Option<CompiledUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ReplyToPost,
    ReplyToThread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// Pre-rendered display text, e.g. "3 replies to your post"
    pub text: String,
    pub response_posts: Vec<String>,
    pub parent_post: String,
    pub parent_thread: String,
    pub creation_timestamp: i64,
    pub newest_response_timestamp: i64,
    pub read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationsPayload {
    pub unseen_count: i32,
    pub notifications: Vec<Notification>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_absent_parts() {
        let mut status = AmbientStatusPayload {
            backend: Some(BackendAmbientStatus {
                caching_status: "Caching...".to_string(),
                ..Default::default()
            }),
            frontend: Some(FrontendAmbientStatus {
                refresher_status: "Idle".to_string(),
                ..Default::default()
            }),
            inflights: None,
        };

        // An inflights-only update must not erase backend/frontend health.
        status.merge_from(AmbientStatusPayload {
            backend: None,
            frontend: None,
            inflights: Some(vec![InflightEntry {
                kind: "post".to_string(),
                fingerprint: "fp-1".to_string(),
                status: "awaiting mint".to_string(),
            }]),
        });

        assert_eq!(status.backend.as_ref().unwrap().caching_status, "Caching...");
        assert_eq!(status.frontend.as_ref().unwrap().refresher_status, "Idle");
        assert_eq!(status.inflights.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn merge_replaces_present_parts() {
        let mut status = AmbientStatusPayload {
            frontend: Some(FrontendAmbientStatus {
                refresher_status: "Compiling...".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        status.merge_from(AmbientStatusPayload {
            frontend: Some(FrontendAmbientStatus {
                refresher_status: "Idle".to_string(),
                last_refresh_duration_seconds: 4,
                ..Default::default()
            }),
            ..Default::default()
        });

        let frontend = status.frontend.unwrap();
        assert_eq!(frontend.refresher_status, "Idle");
        assert_eq!(frontend.last_refresh_duration_seconds, 4);
    }

    #[test]
    fn notification_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NotificationKind::ReplyToThread).unwrap();
        assert_eq!(json, r#""reply_to_thread""#);
    }
}
