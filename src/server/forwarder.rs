//! Error fan-in.
//!
//! # Responsibilities
//! - Copy every error a collaborator emits onto the server's shared
//!   error stream
//! - Exit cleanly when the source closes (graceful end) or the closing
//!   signal fires (forced cancellation)
//!
//! # Design Decisions
//! - One task per forwarded source
//! - The shared stream is unbounded, so a forward never blocks even when
//!   nobody drains it during shutdown

use tokio::sync::{broadcast, mpsc};

use crate::meta::MetaError;

/// Forward errors from `source` to `sink` until either side ends.
pub(crate) async fn forward_errors(
    mut source: mpsc::UnboundedReceiver<MetaError>,
    sink: mpsc::UnboundedSender<MetaError>,
    mut closing: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            received = source.recv() => match received {
                Some(err) => {
                    // Reader dropped the server's stream; nothing left to do.
                    if sink.send(err).is_err() {
                        return;
                    }
                }
                None => return,
            },
            _ = closing.recv() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Shutdown;
    use std::time::Duration;

    fn boxed(msg: &str) -> MetaError {
        msg.to_string().into()
    }

    #[tokio::test]
    async fn forwards_each_error() {
        let (src_tx, src_rx) = mpsc::unbounded_channel();
        let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
        let closing = Shutdown::new();

        tokio::spawn(forward_errors(src_rx, sink_tx, closing.subscribe()));

        src_tx.send(boxed("first")).unwrap();
        src_tx.send(boxed("second")).unwrap();

        assert_eq!(sink_rx.recv().await.unwrap().to_string(), "first");
        assert_eq!(sink_rx.recv().await.unwrap().to_string(), "second");
    }

    #[tokio::test]
    async fn exits_when_source_closes() {
        let (src_tx, src_rx) = mpsc::unbounded_channel();
        let (sink_tx, _sink_rx) = mpsc::unbounded_channel();
        let closing = Shutdown::new();

        let task = tokio::spawn(forward_errors(src_rx, sink_tx, closing.subscribe()));
        drop(src_tx);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("forwarder exits on source close")
            .unwrap();
    }

    #[tokio::test]
    async fn closing_signal_unblocks_forwarder() {
        let (_src_tx, src_rx) = mpsc::unbounded_channel();
        let (sink_tx, _sink_rx) = mpsc::unbounded_channel();
        let closing = Shutdown::new();

        let task = tokio::spawn(forward_errors(src_rx, sink_tx, closing.subscribe()));
        closing.trigger();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("forwarder exits on closing signal")
            .unwrap();
    }
}
