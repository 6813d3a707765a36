/// Errors from accepting, reading or writing connections.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade on an accepted socket failed.
    #[error("handshake with {peer} failed: {reason}")]
    UpgradeFailed { peer: String, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}
