//! Calendar events

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};

/// A calendar event, as supplied by the [`ical`](crate::ical) module.
///
/// This is a plain snapshot of what the calendar file contains: a name, the `DTSTART` anchor the recurrence
/// rule is evaluated from, a duration, and the raw extension properties (`RRULE`, `EXRULE`...).
/// An event that carries no `RRULE` property has no occurrences.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    name: String,
    location: String,
    dtstart: NaiveDateTime,
    duration: Duration,
    properties: HashMap<String, String>,
}

impl Event {
    pub fn new<S: ToString, T: ToString>(name: S, location: T, dtstart: NaiveDateTime, duration: Duration, properties: HashMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            dtstart,
            duration,
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The event location (may be empty)
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The `DTSTART` of the event, i.e. the anchor its recurrence rule is evaluated from
    pub fn dtstart(&self) -> NaiveDateTime {
        self.dtstart
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Return the raw value of an extension property (e.g. `"RRULE"`), if the event has it
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|value| value.as_str())
    }

    /// Narrow the freeform property bag down to the recurrence description of this event.
    ///
    /// Returns `None` when the event has no `RRULE` property. An `EXRULE` without an `RRULE` is vacuous
    /// (there is nothing to exclude occurrences from) and counts as "no recurrence" as well.
    pub fn recurrence(&self) -> Option<RecurrenceSpec> {
        let rule = self.property("RRULE")?;
        Some(RecurrenceSpec {
            rule: rule.to_string(),
            exclusion: self.property("EXRULE").map(|value| value.to_string()),
        })
    }
}

/// The recurrence description of an event: its `RRULE`, and the optional `EXRULE` that removes some of the
/// generated occurrences again.
///
/// This is the one place where the unstructured property bag of the calendar file is turned into typed data.
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrenceSpec {
    pub rule: String,
    pub exclusion: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn event_with_properties(properties: HashMap<String, String>) -> Event {
        let dtstart = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap().and_hms_opt(11, 0, 0).unwrap();
        Event::new("Standup", "Big meeting room", dtstart, Duration::minutes(30), properties)
    }

    #[test]
    fn test_recurrence_extraction() {
        let mut properties = HashMap::new();
        properties.insert("RRULE".to_string(), "FREQ=WEEKLY;BYDAY=MO".to_string());
        properties.insert("EXRULE".to_string(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=MO".to_string());

        let spec = event_with_properties(properties).recurrence().unwrap();
        assert_eq!(spec.rule, "FREQ=WEEKLY;BYDAY=MO");
        assert_eq!(spec.exclusion.as_deref(), Some("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO"));
    }

    #[test]
    fn test_event_without_rrule_has_no_recurrence() {
        assert_eq!(event_with_properties(HashMap::new()).recurrence(), None);
    }

    #[test]
    fn test_exrule_alone_is_not_a_recurrence() {
        let mut properties = HashMap::new();
        properties.insert("EXRULE".to_string(), "FREQ=WEEKLY;BYDAY=MO".to_string());
        assert_eq!(event_with_properties(properties).recurrence(), None);
    }
}
