//! Append-only event log with a broadcast feed for subscribers.

use tokio::sync::broadcast;
use tracing::trace;

use tokenkit_common::{EventRecord, LedgerId, SharedClock, TokenEvent};

/// Append-only sequence of [`EventRecord`]s in emission order.
///
/// Subscribers attach through [`EventLog::subscribe`]; the log never waits on
/// them and a lagging receiver simply misses records (it can catch up from
/// [`EventLog::since`] when retention is enabled).
pub struct EventLog {
    ledger_id: LedgerId,
    records: Vec<EventRecord>,
    retain: bool,
    last_sequence: u64,
    sender: broadcast::Sender<EventRecord>,
    clock: SharedClock,
}

impl EventLog {
    /// Create an empty log.
    pub fn new(ledger_id: LedgerId, capacity: usize, retain: bool, clock: SharedClock) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            ledger_id,
            records: Vec::new(),
            retain,
            last_sequence: 0,
            sender,
            clock,
        }
    }

    /// Append an event and publish it. Returns its sequence number.
    pub fn append(&mut self, event: TokenEvent) -> u64 {
        self.last_sequence += 1;
        let record = EventRecord {
            sequence: self.last_sequence,
            ledger_id: self.ledger_id,
            event,
            recorded_at: self.clock.now(),
        };

        trace!(
            ledger_id = %self.ledger_id,
            sequence = record.sequence,
            kind = record.event.kind(),
            "Event appended"
        );

        // Nobody listening is fine.
        let _ = self.sender.send(record.clone());

        if self.retain {
            self.records.push(record);
        }
        self.last_sequence
    }

    /// Attach a new subscriber. It receives records appended from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Retained records.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Retained records with a sequence number strictly greater than `sequence`.
    pub fn since(&self, sequence: u64) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.sequence > sequence)
    }

    /// Sequence number of the last appended event (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Retained events only, without the envelope.
    pub fn events(&self) -> impl Iterator<Item = &TokenEvent> {
        self.records.iter().map(|r| &r.event)
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("ledger_id", &self.ledger_id)
            .field("last_sequence", &self.last_sequence)
            .field("retained", &self.records.len())
            .finish()
    }
}
