//! The downstream side of decoding: what happens to a batch of [`Position`]s
//! once a decoder has produced them. Modeled as a capability trait the same
//! way `gateway-codec` models `FrameDecoder`/`ProtocolDecoder` (:
//! "capture this as capability interfaces"), so a transport handler never
//! needs to know whether positions end up logged, queued, or forwarded.
//!
//! Trait methods return a boxed future by hand rather than using `async fn`
//! in the trait: this crate has no dependency on the `async-trait` macro, and
//! `async fn` in a trait isn't `dyn`-compatible on its own.

use std::future::Future;
use std::pin::Pin;

use gateway_codec::model::Position;
use tokio::sync::mpsc;
use tracing::info;

pub trait PositionSink: Send + Sync {
    fn accept<'a>(&'a self, positions: Vec<Position>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Logs each position at `info` level. Used when no downstream consumer is
/// wired up; keeps the gateway runnable and observable on its own.
#[derive(Debug, Default)]
pub struct LoggingPositionSink;

impl PositionSink for LoggingPositionSink {
    fn accept<'a>(&'a self, positions: Vec<Position>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for position in &positions {
                info!(
                    protocol = %position.protocol,
                    device_id = position.device_id,
                    lat = position.latitude,
                    lon = position.longitude,
                    speed = position.speed,
                    valid = position.valid,
                    "position"
                );
            }
        })
    }
}

/// Forwards positions onto an `mpsc` channel. Grounded in the teacher's own
/// preference for channel handoff over direct downstream calls
/// (`p3-server/src/decoder/mod.rs`'s `tx.send(message)`); a full downstream
/// sink (database, message bus) would consume this channel's receiver
/// outside this crate.
pub struct ChannelPositionSink {
    tx: mpsc::Sender<Position>,
}

impl ChannelPositionSink {
    pub fn new(tx: mpsc::Sender<Position>) -> Self {
        ChannelPositionSink { tx }
    }
}

impl PositionSink for ChannelPositionSink {
    fn accept<'a>(&'a self, positions: Vec<Position>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for position in positions {
                if self.tx.send(position).await.is_err() {
                    tracing::warn!("position sink channel closed, dropping remaining positions");
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_forwards_positions_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelPositionSink::new(tx);
        let mut a = Position::new("huabao", 1);
        a.longitude = 1.0;
        let mut b = Position::new("huabao", 1);
        b.longitude = 2.0;
        sink.accept(vec![a, b]).await;

        assert_eq!(rx.recv().await.unwrap().longitude, 1.0);
        assert_eq!(rx.recv().await.unwrap().longitude, 2.0);
    }
}
