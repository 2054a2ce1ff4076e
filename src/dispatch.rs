//! Orchestration: decide which occurrences must be notified right now, and notify them
//!
//! Every occurrence of every event goes through a tiny state machine that ends up
//! [`Skipped`](Outcome::Skipped), [`Notified`](Outcome::Notified) or [`Failed`](Outcome::Failed).
//! A failed occurrence is simply picked up again by the next run: it is only written to the ledger
//! once a notification has actually gone through.

use chrono::{Duration, NaiveDateTime};

use crate::ledger::ProcessedLedger;
use crate::notify::Notifier;
use crate::occurrence::{build_occurrences, is_active};
use crate::Event;
use crate::OccurrenceId;

/// What the evaluation window spans on each side of "now"
const WINDOW_MARGIN_DAYS: i64 = 1;

/// The terminal state of one occurrence evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Not active right now, or already notified earlier
    Skipped,
    /// The notification went through and has been recorded in the ledger
    Notified,
    /// The notification could not be delivered; nothing was recorded, so the next run retries it
    Failed,
}

/// Evaluates events against "now" and notifies the active, not-yet-notified occurrences.
///
/// The ledger and the notifier are explicit values (rather than files and endpoints hardcoded deep
/// inside), so tests can run the whole pipeline against an in-memory ledger and a scripted notifier.
pub struct Dispatcher<L, N>
where
    L: ProcessedLedger,
    N: Notifier,
{
    ledger: L,
    notifier: N,
    chat_id: i64,
}

impl<L, N> Dispatcher<L, N>
where
    L: ProcessedLedger,
    N: Notifier,
{
    pub fn new(ledger: L, notifier: N, chat_id: i64) -> Self {
        Self { ledger, notifier, chat_id }
    }

    /// Returns the ledger this dispatcher records to
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Run one full evaluation pass over `events`, as of `now`.
    ///
    /// Every event is expanded over `[now - 1 day, now + 1 day]`; every active occurrence that the
    /// ledger does not know yet gets notified, and recorded on success. Per-event problems (e.g. a
    /// malformed recurrence rule) are logged and do not stop the pass: the other events still get
    /// evaluated. Returns the number of notifications that went through.
    pub async fn process_events(&mut self, events: &[Event], now: NaiveDateTime) -> usize {
        let from = now - Duration::days(WINDOW_MARGIN_DAYS);
        let to = now + Duration::days(WINDOW_MARGIN_DAYS);

        let mut notified = 0;
        for event in events {
            let occurrences = match build_occurrences(event, from, to) {
                Err(err) => {
                    log::warn!("Unable to expand event '{}': {}. Skipping it.", event.name(), err);
                    continue;
                },
                Ok(occurrences) => occurrences,
            };

            for start in occurrences {
                if self.process_occurrence(event, start, now).await == Outcome::Notified {
                    notified += 1;
                }
            }
        }

        notified
    }

    /// Evaluate a single occurrence of `event`, starting at `start`
    async fn process_occurrence(&mut self, event: &Event, start: NaiveDateTime, now: NaiveDateTime) -> Outcome {
        if is_active(start, event.duration(), now) == false {
            return Outcome::Skipped;
        }

        let id = OccurrenceId::new(event.name(), start);
        if self.ledger.contains(&id) {
            log::debug!("Occurrence {} has already been notified. Skipping it.", id);
            return Outcome::Skipped;
        }

        let text = format!("{}:\n{}", event.name(), event.location());
        match self.notifier.notify(self.chat_id, &text).await {
            Ok(200) => {
                log::info!("Success sending notification for event '{}'", event.name());
                if let Err(err) = self.ledger.record(&id) {
                    // The notification DID go through. Failing to record it means the next run
                    // may send it a second time, so this must be loud.
                    log::error!("Notification for {} was sent but could not be recorded: {}. It may be sent again on the next run.", id, err);
                }
                Outcome::Notified
            },
            Ok(status) => {
                log::warn!("Error sending notification for event '{}': status {}", event.name(), status);
                Outcome::Failed
            },
            Err(err) => {
                log::warn!("Error sending notification for event '{}': {}", event.name(), err);
                Outcome::Failed
            },
        }
    }
}
