//! Single-writer channel of item/error results used by LIST/SEARCH.
//!
//! Ordering between items and errors is preserved per producing task; the
//! kernel guarantees at most one producer at a time per stream invocation,
//! but a caller sharing one sink across concurrent `ListStream` calls may
//! see their outputs interleave (spec.md §4.4) -- individual sends stay
//! atomic because each just pushes onto an `UnboundedSender`.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::QueryError;
use crate::item::Item;

/// A single event produced by a LIST/SEARCH invocation.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Item(Item),
    Error(QueryError),
}

/// The sink kernel shapes push results into. Implementors must be cheap to
/// clone/share across the tasks a kernel shape fans out internally (e.g.
/// `AlwaysGet`'s per-id GETs).
#[async_trait]
pub trait QueryResultStream: Send + Sync {
    async fn send_item(&self, item: Item);
    async fn send_error(&self, err: QueryError);
}

/// The default sink: bridges producer tasks to a single `mpsc` receiver,
/// mirroring the channel-bridge idiom the teacher uses to turn a fan-out
/// producer into a consumer-facing stream.
#[derive(Clone)]
pub struct ChannelStream {
    sender: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelStream {
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl QueryResultStream for ChannelStream {
    async fn send_item(&self, item: Item) {
        // The receiver may already be dropped if the caller abandoned the
        // stream (e.g. on cancellation); that's not the kernel's problem.
        let _ = self.sender.send(StreamEvent::Item(item));
    }

    async fn send_error(&self, err: QueryError) {
        let _ = self.sender.send(StreamEvent::Error(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;

    #[tokio::test]
    async fn preserves_send_order() {
        let (sink, mut rx) = ChannelStream::pair();
        sink.send_item(Item::new("person", "id", Scope::from("1.eu-west-2"))).await;
        sink.send_error(QueryError::not_found(Scope::from("1.eu-west-2"), "nope")).await;
        sink.send_item(Item::new("person", "id", Scope::from("1.eu-west-2"))).await;

        assert!(matches!(rx.recv().await, Some(StreamEvent::Item(_))));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Error(_))));
        assert!(matches!(rx.recv().await, Some(StreamEvent::Item(_))));
    }
}
