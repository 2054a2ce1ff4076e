//! This module reads iCal files into the internal representation
//!
//! It is a wrapper around a third-party parser: the iCalendar grammar itself is handled by the `ical` crate,
//! this module only converts its output into [`Event`](crate::Event)s. This is the single place where
//! unstructured calendar data enters this crate.

mod parser;
pub use parser::open_calendar;
pub use parser::parse;
pub(crate) use parser::parse_datetime;
