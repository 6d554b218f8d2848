use tokio::sync::broadcast;
use tracing::debug;

/// A write that changed what readers of the store would see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteEvent {
    QuotesChanged,
    CommentsChanged { quote_id: String },
}

impl QuoteEvent {
    pub fn touches_quote_list(&self) -> bool {
        matches!(self, QuoteEvent::QuotesChanged)
    }

    pub fn touches_thread(&self, quote_id: &str) -> bool {
        match self {
            QuoteEvent::CommentsChanged { quote_id: changed } => changed == quote_id,
            QuoteEvent::QuotesChanged => false,
        }
    }
}

/// In-process fan-out of change notifications to live subscribers.
pub struct ChangeFeed {
    tx: broadcast::Sender<QuoteEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many subscribers were notified; zero is not an error.
    pub fn publish(&self, event: QuoteEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "change feed has no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QuoteEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeFeed, QuoteEvent};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let feed = ChangeFeed::new(8);
        let mut rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);
        let delivered = feed.publish(QuoteEvent::CommentsChanged {
            quote_id: "q1".to_string(),
        });
        assert_eq!(delivered, 1);
        let event = rx.recv().await.unwrap();
        assert!(event.touches_thread("q1"));
        assert!(!event.touches_thread("q2"));
        assert!(!event.touches_quote_list());
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new(8);
        assert_eq!(feed.publish(QuoteEvent::QuotesChanged), 0);
    }
}
