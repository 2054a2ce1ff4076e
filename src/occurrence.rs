//! Concrete occurrences of recurring events

use std::error::Error;
use std::fmt::{Display, Formatter};

use chrono::{Duration, NaiveDateTime};

use crate::rrule;
use crate::Event;

/// Expand `event` into the ordered list of its concrete occurrence start instants within
/// `[from, to]`.
///
/// An event without an `RRULE` property has no occurrences (that is a notice, not an error).
/// The surviving instants are re-anchored to the wall-clock time of the event's `DTSTART`:
/// whatever time of day the rule evaluation produced (e.g. through `BYHOUR`), an occurrence always
/// starts at the same time of day as its anchor.
pub fn build_occurrences(event: &Event, from: NaiveDateTime, to: NaiveDateTime) -> Result<Vec<NaiveDateTime>, Box<dyn Error>> {
    let spec = match event.recurrence() {
        None => {
            log::info!("No RRULE found for event '{}'. Skipping.", event.name());
            return Ok(Vec::new());
        },
        Some(spec) => spec,
    };

    let dtstart = event.dtstart();
    let occurrences = rrule::expand(&spec.rule, dtstart, from, to)?;
    let occurrences = rrule::apply_exclusion(spec.exclusion.as_deref(), occurrences, dtstart, from, to)?;

    let mut result: Vec<NaiveDateTime> = occurrences.iter()
        .map(|occurrence| occurrence.date().and_time(dtstart.time()))
        .filter(|occurrence| from <= *occurrence && *occurrence <= to)
        .collect();
    result.sort();
    result.dedup();

    log::debug!("Event {} occurrences between {} and {}: {}", event.name(), from, to, result.len());
    Ok(result)
}

/// Whether an occurrence starting at `start` and lasting `duration` is ongoing at `now`.
/// Both ends of the span count as ongoing.
pub fn is_active(start: NaiveDateTime, duration: Duration, now: NaiveDateTime) -> bool {
    start <= now && now <= start + duration
}

/// The identity an occurrence is deduplicated under: event name plus occurrence *date*.
///
/// The date (not the full instant) is deliberate: at most one notification per event and per
/// calendar day ever gets recorded, however many occurrences the rule generates on that day.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OccurrenceId {
    content: String,
}

impl OccurrenceId {
    pub fn new(event_name: &str, start: NaiveDateTime) -> Self {
        Self {
            content: format!("{}_{}", event_name, start.format("%Y-%m-%d")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl Display for OccurrenceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use chrono::NaiveDate;

    fn instant(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day).unwrap().and_hms_opt(hour, minute, 0).unwrap()
    }

    fn recurring_event(rrule: &str, exrule: Option<&str>) -> Event {
        let mut properties = HashMap::new();
        properties.insert("RRULE".to_string(), rrule.to_string());
        if let Some(exrule) = exrule {
            properties.insert("EXRULE".to_string(), exrule.to_string());
        }
        Event::new("Daily planning", "Big meeting room", instant(2024, 12, 30, 11, 0), Duration::minutes(30), properties)
    }

    #[test]
    fn test_expand_event_with_exclusion() {
        let event = recurring_event(
            "FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;BYHOUR=11",
            Some("FREQ=WEEKLY;INTERVAL=2;BYDAY=MO;BYHOUR=11"),
        );

        let occurrences = build_occurrences(&event, instant(2025, 1, 9, 0, 0), instant(2025, 1, 31, 0, 0)).unwrap();

        let expected = vec![
            instant(2025, 1, 9, 11, 0),
            instant(2025, 1, 10, 11, 0),
            // 2025-01-13 is excluded by the EXRULE
            instant(2025, 1, 14, 11, 0),
            instant(2025, 1, 15, 11, 0),
            instant(2025, 1, 16, 11, 0),
            instant(2025, 1, 17, 11, 0),
            instant(2025, 1, 20, 11, 0),
            instant(2025, 1, 21, 11, 0),
            instant(2025, 1, 22, 11, 0),
            instant(2025, 1, 23, 11, 0),
            instant(2025, 1, 24, 11, 0),
            // 2025-01-27 is excluded by the EXRULE
            instant(2025, 1, 28, 11, 0),
            instant(2025, 1, 29, 11, 0),
            instant(2025, 1, 30, 11, 0),
        ];
        assert_eq!(occurrences, expected);
    }

    #[test]
    fn test_occurrences_are_reanchored_to_the_dtstart_time() {
        // The rule fires at 14:00, but the anchor says the event starts at 11:00:
        // the occurrence list must show 11:00
        let event = recurring_event("FREQ=WEEKLY;BYDAY=TH;BYHOUR=14", None);
        let occurrences = build_occurrences(&event, instant(2025, 1, 9, 0, 0), instant(2025, 1, 11, 0, 0)).unwrap();
        assert_eq!(occurrences, vec![instant(2025, 1, 9, 11, 0)]);
    }

    #[test]
    fn test_event_without_rrule_has_no_occurrences() {
        let event = Event::new("One-shot", "", instant(2025, 1, 9, 11, 0), Duration::hours(1), HashMap::new());
        let occurrences = build_occurrences(&event, instant(2025, 1, 1, 0, 0), instant(2025, 1, 31, 0, 0)).unwrap();
        assert!(occurrences.is_empty());
    }

    #[test]
    fn test_malformed_rrule_is_an_error() {
        let event = recurring_event("FREQ=NEVERMORE", None);
        assert!(build_occurrences(&event, instant(2025, 1, 1, 0, 0), instant(2025, 1, 31, 0, 0)).is_err());
    }

    #[test]
    fn test_is_active_bounds_are_inclusive() {
        let start = instant(2025, 1, 9, 11, 0);
        let duration = Duration::minutes(30);

        assert!(is_active(start, duration, start));
        assert!(is_active(start, duration, instant(2025, 1, 9, 11, 15)));
        assert!(is_active(start, duration, instant(2025, 1, 9, 11, 30)));

        assert!(is_active(start, duration, start - Duration::seconds(1)) == false);
        assert!(is_active(start, duration, instant(2025, 1, 9, 11, 30) + Duration::seconds(1)) == false);
    }

    #[test]
    fn test_occurrence_id_is_date_level() {
        let morning = OccurrenceId::new("Daily planning", instant(2025, 1, 9, 9, 0));
        let afternoon = OccurrenceId::new("Daily planning", instant(2025, 1, 9, 15, 0));
        let next_day = OccurrenceId::new("Daily planning", instant(2025, 1, 10, 9, 0));

        assert_eq!(morning.as_str(), "Daily planning_2025-01-09");
        // Same event, same day: same identity, whatever the time of day
        assert_eq!(morning, afternoon);
        assert_ne!(morning, next_day);
        assert_ne!(morning, OccurrenceId::new("Other event", instant(2025, 1, 9, 9, 0)));
    }
}
