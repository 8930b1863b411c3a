//! Row-change notifications.
//!
//! Backends publish a [`ChangeEvent`] after every write they perform. A
//! realtime transport sitting in front of the hosted backend can publish the
//! events it receives through the same [`ChangeFeed`], so consumers never
//! care where a change came from.

use klausa_core::Table;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row changed in `table`.
///
/// `contract_id` is the owning contract: the row's own id for `contracts`,
/// the `contract_id` column for dependent tables, `None` for KPI views or
/// when the transport does not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub contract_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, contract_id: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            contract_id: Some(contract_id.into()),
        }
    }
}

/// Which events a subscriber cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interest {
    tables: Vec<Table>,
    contract_id: Option<String>,
}

impl Interest {
    /// Every change on every table.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
            contract_id: None,
        }
    }

    /// Narrow to one contract. Events that carry no contract id still pass.
    pub fn for_contract(mut self, contract_id: impl Into<String>) -> Self {
        self.contract_id = Some(contract_id.into());
        self
    }

    pub fn wants(&self, event: &ChangeEvent) -> bool {
        let table_ok = self.tables.is_empty() || self.tables.contains(&event.table);
        let contract_ok = match (&self.contract_id, &event.contract_id) {
            (Some(want), Some(got)) => want == got,
            _ => true,
        };
        table_ok && contract_ok
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Event(ChangeEvent),
    /// The receiver fell behind and `n` events were dropped. Treat as "something changed".
    Lagged(u64),
}

/// Broadcast hub for [`ChangeEvent`]s. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        debug!(table = %event.table, kind = ?event.kind, contract_id = ?event.contract_id, "change");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, interest: Interest) -> ChangeSubscription {
        ChangeSubscription {
            rx: self.tx.subscribe(),
            interest,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct ChangeSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
    interest: Interest,
}

impl ChangeSubscription {
    /// Wait for the next relevant change. `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Change> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.interest.wants(&event) => return Some(Change::Event(event)),
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => return Some(Change::Lagged(n)),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_added(contract: &str) -> ChangeEvent {
        ChangeEvent::new(Table::LegalNotes, ChangeKind::Insert, contract)
    }

    #[test]
    fn interest_by_table_and_contract() {
        let interest =
            Interest::tables([Table::LegalNotes, Table::RiskFindings]).for_contract("c1");
        assert!(interest.wants(&note_added("c1")));
        assert!(!interest.wants(&note_added("c2")));
        assert!(!interest.wants(&ChangeEvent::new(Table::Contracts, ChangeKind::Update, "c1")));

        let anonymous = ChangeEvent {
            table: Table::LegalNotes,
            kind: ChangeKind::Delete,
            contract_id: None,
        };
        assert!(interest.wants(&anonymous));
        assert!(Interest::all().wants(&note_added("c9")));
    }

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.publish(note_added("c1")), 0);
    }

    #[tokio::test]
    async fn subscription_skips_unwanted_events() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(Interest::all().for_contract("c2"));
        feed.publish(note_added("c1"));
        feed.publish(note_added("c2"));
        assert_eq!(sub.next().await, Some(Change::Event(note_added("c2"))));
    }

    #[tokio::test]
    async fn lagging_subscriber_is_told() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe(Interest::all());
        for i in 0..5 {
            feed.publish(note_added(&format!("c{i}")));
        }
        assert!(matches!(sub.next().await, Some(Change::Lagged(3))));
        assert_eq!(sub.next().await, Some(Change::Event(note_added("c3"))));
    }

    #[tokio::test]
    async fn closed_feed_ends_subscription() {
        let feed = ChangeFeed::default();
        let mut sub = feed.subscribe(Interest::all());
        drop(feed);
        assert_eq!(sub.next().await, None);
    }
}
