/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Binding the listener failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] std::io::Error),

    /// Accepting a TCP connection or completing the WebSocket handshake
    /// failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer sent a binary frame that is not valid UTF-8.
    #[error("frame is not valid UTF-8")]
    InvalidText,
}

impl TransportError {
    pub(crate) fn send(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::SendFailed(std::io::Error::new(std::io::ErrorKind::BrokenPipe, err))
    }

    pub(crate) fn receive(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ReceiveFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            err,
        ))
    }
}
