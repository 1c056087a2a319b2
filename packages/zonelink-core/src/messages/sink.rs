//! Message sink abstraction for decoupling services from transport.
//!
//! Services depend on the [`MessageSink`] trait rather than a concrete
//! broadcast channel, enabling testing and alternative transports.

use tokio::sync::broadcast;

use super::StreamMessage;

/// Trait for sending messages to the streaming host without knowledge of
/// transport.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     sink: Arc<dyn MessageSink>,
/// }
///
/// impl MyService {
///     fn zone_appeared(&self, id: String, name: String) {
///         self.sink.send(StreamMessage::EnableZone { id, name });
///     }
/// }
/// ```
pub trait MessageSink: Send + Sync {
    /// Sends a message toward the streaming host.
    fn send(&self, message: StreamMessage);
}

/// No-op sink for embedding the engine without a connected host.
pub struct NoopMessageSink;

impl MessageSink for NoopMessageSink {
    fn send(&self, _message: StreamMessage) {
        // No-op: messages are delivered via WebSocket only in server mode
    }
}

/// Logging sink for debugging and development.
///
/// Logs every message at debug level instead of delivering it.
pub struct LoggingMessageSink;

impl MessageSink for LoggingMessageSink {
    fn send(&self, message: StreamMessage) {
        tracing::debug!(?message, "stream_message");
    }
}

/// Bridges outbound messages to the WebSocket broadcast channel.
///
/// Implements [`MessageSink`] by forwarding to a `tokio::sync::broadcast`
/// channel that the streaming-host socket handler subscribes to. With no host
/// connected the send fails and the message is dropped; the host learns
/// current zone state from the control plane's next notifications after it
/// reconnects, so drops are logged at trace level only.
#[derive(Clone)]
pub struct MessageBridge {
    tx: broadcast::Sender<StreamMessage>,
}

impl MessageBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Creates a new bridge wrapping an existing broadcast sender.
    pub fn with_sender(tx: broadcast::Sender<StreamMessage>) -> Self {
        Self { tx }
    }

    /// Returns a new receiver for the broadcast channel.
    ///
    /// The streaming-host socket handler uses this to subscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.tx.subscribe()
    }

    /// Returns a reference to the broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<StreamMessage> {
        &self.tx
    }
}

impl MessageSink for MessageBridge {
    fn send(&self, message: StreamMessage) {
        if let Err(e) = self.tx.send(message) {
            log::trace!("[MessageBridge] No stream host connected: {}", e);
        }
    }
}
