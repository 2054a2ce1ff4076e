//! This crate watches an iCalendar file for recurring events, and rings a Telegram webhook for every occurrence that is happening right now.
//!
//! It is meant to be run repeatedly (e.g. from a cron job or a systemd timer): each run expands the recurrence rules
//! of every event over a window around the current instant, keeps the occurrences whose time span contains "now",
//! and notifies each of them at most once. \
//! Deduplication across runs is handled by a [`ledger`](crate::ledger) of already-notified occurrences,
//! backed by a plain append-only text file.
//!
//! The iCalendar grammar itself is handled by the third-party `ical` crate (see the [`ical`](crate::ical) module),
//! and the notification is a plain HTTP POST (see the [`notify`](crate::notify) module).

pub mod settings;
pub use settings::Settings;

mod event;
pub use event::Event;
pub use event::RecurrenceSpec;

pub mod ical;
pub mod rrule;

mod occurrence;
pub use occurrence::build_occurrences;
pub use occurrence::is_active;
pub use occurrence::OccurrenceId;

pub mod ledger;
pub mod notify;

pub mod dispatch;
pub use dispatch::Dispatcher;
