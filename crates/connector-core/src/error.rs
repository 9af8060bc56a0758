use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transport could not be established or failed mid-stream.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Login was rejected by the server.
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// A frame could not be understood.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Shutdown requested")]
    Shutdown,

    #[error("Session already open")]
    AlreadyOpen,
}
