//! Point-to-point messaging abstraction for blob transfers.
//!
//! The host's distributed-object layer owns routing and delivery; the
//! sender only needs "send this named update to that peer", expressed as
//! [`BlobTransport`] so the substrate is injected rather than reached
//! through a global. [`LoopbackTransport`] backs tests and the demo binary
//! with an in-process channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{AppResult, LinkError};

use super::{BlobMessage, PeerId};

/// Point-to-point sender on the messaging substrate.
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Send a named update to an addressable peer.
    async fn send_update(&self, to: PeerId, update: BlobMessage) -> AppResult<()>;
}

/// In-process transport delivering updates over a Tokio channel.
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<(PeerId, BlobMessage)>,
}

impl LoopbackTransport {
    /// Create a transport and the receiving end of its delivery channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(PeerId, BlobMessage)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl BlobTransport for LoopbackTransport {
    async fn send_update(&self, to: PeerId, update: BlobMessage) -> AppResult<()> {
        self.tx
            .send((to, update))
            .map_err(|_| LinkError::Transfer("loopback receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_loopback_delivers_in_order() {
        let (transport, mut rx) = LoopbackTransport::new();
        let peer = PeerId(7);

        transport
            .send_update(peer, BlobMessage::SetChunk { data: Bytes::from_static(b"ab") })
            .await
            .unwrap();
        transport
            .send_update(peer, BlobMessage::SetChunk { data: Bytes::new() })
            .await
            .unwrap();

        let (to, first) = rx.recv().await.unwrap();
        assert_eq!(to, peer);
        assert_eq!(first, BlobMessage::SetChunk { data: Bytes::from_static(b"ab") });
        let (_, second) = rx.recv().await.unwrap();
        assert_eq!(second, BlobMessage::SetChunk { data: Bytes::new() });
    }

    #[tokio::test]
    async fn test_loopback_errors_after_receiver_drop() {
        let (transport, rx) = LoopbackTransport::new();
        drop(rx);
        let err = transport
            .send_update(PeerId(1), BlobMessage::SetChunk { data: Bytes::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, LinkError::Transfer(_)));
    }
}
