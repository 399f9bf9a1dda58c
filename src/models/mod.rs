pub mod ambient;
pub mod config;
pub mod entities;
pub mod event;

pub use ambient::{
    AmbientBoard, AmbientLocalUserPayload, AmbientStatusPayload, BackendAmbientStatus,
    FrontendAmbientStatus, InflightEntry, Notification, NotificationKind, NotificationsPayload,
};
pub use config::{ClientConfig, FrontendSection};
pub use entities::{
    BoardAndThreads, CompiledBoard, CompiledPost, CompiledThread, CompiledUser, ContentSignals,
    ThreadAndPosts, UncompiledEntities, UserAndGraph, UserSignals,
};
pub use event::{
    BoardContent, BoardSignalRequest, ContentEventPayload, EntityByKeyRequest, Event, EventKind,
    PostContent, SignalEventPayload, SignalKind, SignalTargetType, SignalTypeClass, ThreadContent,
    UncompiledEntityKind, UserContent, UserViewRequest,
};
