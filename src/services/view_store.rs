//! Latest-value store for data the frontend daemon pushes.
//!
//! Each cell holds the most recent push of one view; a new push replaces
//! the old value wholesale, except the ambient status which merges
//! partial updates. UI layers that want change notifications can wrap
//! this or implement [`AmbientSink`] themselves.

use std::sync::RwLock;

use crate::frontend::listener::AmbientSink;
use crate::models::{
    AmbientBoard, AmbientLocalUserPayload, AmbientStatusPayload, CompiledThread,
    NotificationsPayload,
};

#[derive(Debug, Default)]
pub struct ViewStore {
    ambient_boards: RwLock<Vec<AmbientBoard>>,
    ambient_status: RwLock<AmbientStatusPayload>,
    local_user: RwLock<AmbientLocalUserPayload>,
    home_view: RwLock<Vec<CompiledThread>>,
    popular_view: RwLock<Vec<CompiledThread>>,
    notifications: RwLock<NotificationsPayload>,
    onboard_complete: RwLock<bool>,
    mod_mode_enabled: RwLock<bool>,
}

// Lock poisoning only happens if a holder panicked; the stored views are
// plain data, so the poisoned value is still the latest complete push.
fn read<T: Clone>(cell: &RwLock<T>) -> T {
    match cell.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn write<T>(cell: &RwLock<T>, value: T) {
    match cell.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

impl ViewStore {
    pub fn ambient_boards(&self) -> Vec<AmbientBoard> {
        read(&self.ambient_boards)
    }

    pub fn current_status(&self) -> AmbientStatusPayload {
        read(&self.ambient_status)
    }

    pub fn current_local_user(&self) -> AmbientLocalUserPayload {
        read(&self.local_user)
    }

    pub fn home_threads(&self) -> Vec<CompiledThread> {
        read(&self.home_view)
    }

    pub fn popular_threads(&self) -> Vec<CompiledThread> {
        read(&self.popular_view)
    }

    pub fn current_notifications(&self) -> NotificationsPayload {
        read(&self.notifications)
    }

    pub fn is_onboard_complete(&self) -> bool {
        read(&self.onboard_complete)
    }

    pub fn is_mod_mode_enabled(&self) -> bool {
        read(&self.mod_mode_enabled)
    }
}

impl AmbientSink for ViewStore {
    fn deliver_ambients(&self, boards: Vec<AmbientBoard>) {
        tracing::debug!(count = boards.len(), "ambient boards delivered");
        write(&self.ambient_boards, boards);
    }

    fn ambient_status(&self, status: AmbientStatusPayload) {
        match self.ambient_status.write() {
            Ok(mut guard) => guard.merge_from(status),
            Err(poisoned) => poisoned.into_inner().merge_from(status),
        }
    }

    fn ambient_local_user(&self, payload: AmbientLocalUserPayload) {
        write(&self.local_user, payload);
    }

    fn home_view(&self, threads: Vec<CompiledThread>) {
        write(&self.home_view, threads);
    }

    fn popular_view(&self, threads: Vec<CompiledThread>) {
        write(&self.popular_view, threads);
    }

    fn notifications(&self, payload: NotificationsPayload) {
        write(&self.notifications, payload);
    }

    fn onboard_complete(&self, complete: bool) {
        write(&self.onboard_complete, complete);
    }

    fn mod_mode_enabled(&self, enabled: bool) {
        write(&self.mod_mode_enabled, enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendAmbientStatus, FrontendAmbientStatus};

    #[test]
    fn pushes_replace_previous_values() {
        let store = ViewStore::default();

        store.home_view(vec![CompiledThread {
            fingerprint: "old".to_string(),
            ..Default::default()
        }]);
        store.home_view(vec![CompiledThread {
            fingerprint: "new".to_string(),
            ..Default::default()
        }]);

        let view = store.home_threads();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].fingerprint, "new");
    }

    #[test]
    fn status_pushes_merge() {
        let store = ViewStore::default();

        store.ambient_status(AmbientStatusPayload {
            backend: Some(BackendAmbientStatus {
                caching_status: "Caching...".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        store.ambient_status(AmbientStatusPayload {
            frontend: Some(FrontendAmbientStatus {
                refresher_status: "Idle".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });

        let status = store.current_status();
        assert_eq!(status.backend.unwrap().caching_status, "Caching...");
        assert_eq!(status.frontend.unwrap().refresher_status, "Idle");
    }

    #[test]
    fn flags_start_false() {
        let store = ViewStore::default();
        assert!(!store.is_onboard_complete());
        assert!(!store.is_mod_mode_enabled());
        store.onboard_complete(true);
        assert!(store.is_onboard_complete());
    }
}
