use thiserror::Error;

/// Process exit codes for the `agora` binary.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const INTERNAL: i32 = 1;
    pub const USER_ERROR: i32 = 2;
}

#[derive(Error, Debug)]
pub enum AgoraError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Global config error: {0}")]
    GlobalConfig(String),

    #[error("Supervisor error: {0}")]
    Supervisor(String),

    #[error("Failed to connect to frontend daemon: {0}")]
    FrontendConnection(String),

    #[error("Frontend protocol error: {0}")]
    FrontendProtocol(String),

    #[error("Frontend error: {0}")]
    FrontendRemote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl AgoraError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AgoraError::InvalidArgument(_) => exit_codes::USER_ERROR,

            AgoraError::GlobalConfig(_)
            | AgoraError::Supervisor(_)
            | AgoraError::FrontendConnection(_)
            | AgoraError::FrontendProtocol(_)
            | AgoraError::FrontendRemote(_)
            | AgoraError::Io(_)
            | AgoraError::Json(_)
            | AgoraError::TomlDe(_)
            | AgoraError::TomlSer(_) => exit_codes::INTERNAL,
        }
    }
}

pub type Result<T> = std::result::Result<T, AgoraError>;
