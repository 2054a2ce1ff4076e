//! A module to parse ICal files

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use ical::parser::ical::component::IcalEvent;

use crate::Event;

/// Read an iCal file into [`Event`]s.
pub fn open_calendar(path: &Path) -> Result<Vec<Event>, Box<dyn Error>> {
    let content = match std::fs::read_to_string(path) {
        Err(err) => {
            return Err(format!("Unable to open calendar file {:?}: {}", path, err).into());
        },
        Ok(content) => content,
    };

    parse(&content)
}

/// Parse iCal data into the internal representation [`crate::Event`].
///
/// A malformed event (e.g. one that lacks a `SUMMARY` or a `DTSTART`) does not fail the whole calendar:
/// it is skipped with a warning, so that the other events still get evaluated.
pub fn parse(content: &str) -> Result<Vec<Event>, Box<dyn Error>> {
    let mut events = Vec::new();

    for calendar in ical::IcalParser::new(content.as_bytes()) {
        let calendar = match calendar {
            Err(err) => return Err(format!("Unable to parse iCal data: {}", err).into()),
            Ok(calendar) => calendar,
        };

        for ical_event in &calendar.events {
            match convert_event(ical_event) {
                Err(err) => log::warn!("Ignoring a malformed event: {}. Skipping it.", err),
                Ok(event) => events.push(event),
            }
        }
    }

    Ok(events)
}

fn convert_event(ical_event: &IcalEvent) -> Result<Event, Box<dyn Error>> {
    let mut name = None;
    let mut location = String::new();
    let mut dtstart = None;
    let mut dtend = None;
    let mut duration = None;
    let mut extra = HashMap::new();

    for prop in &ical_event.properties {
        let value = match &prop.value {
            None => continue,
            Some(value) => value,
        };

        match prop.name.as_str() {
            "SUMMARY" => name = Some(value.clone()),
            "LOCATION" => location = value.clone(),
            "DTSTART" => dtstart = Some(parse_datetime(value)?),
            "DTEND" => dtend = Some(parse_datetime(value)?),
            "DURATION" => duration = Some(parse_duration(value)?),
            _ => {
                // Everything else (RRULE, EXRULE, UID...) ends up in the property bag
                extra.insert(prop.name.clone(), value.clone());
            },
        }
    }

    let name = match name {
        None => return Err("Missing SUMMARY".into()),
        Some(name) => name,
    };
    let dtstart = match dtstart {
        None => return Err(format!("Missing DTSTART for event '{}'", name).into()),
        Some(dtstart) => dtstart,
    };

    // DTEND wins over an explicit DURATION. An event with neither lasts zero seconds,
    // i.e. it is only active at its exact start instant.
    let duration = match dtend {
        Some(dtend) => dtend - dtstart,
        None => duration.unwrap_or_else(Duration::zero),
    };

    Ok(Event::new(name, location, dtstart, duration, extra))
}

/// Parse an iCal date-time value (`20241230T110000`, `20241230T110000Z` or the date-only form `20241230`).
///
/// Values are treated as wall-clock time: a trailing `Z` or a `TZID` parameter is not converted to any
/// other time zone, since the whole evaluation happens in the time reference the calendar is written in.
pub(crate) fn parse_datetime(value: &str) -> Result<NaiveDateTime, Box<dyn Error>> {
    let trimmed = value.trim().trim_end_matches('Z');

    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y%m%dT%H%M%S") {
        return Ok(datetime);
    }
    match NaiveDate::parse_from_str(trimmed, "%Y%m%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
        Err(_) => Err(format!("Invalid iCal date-time '{}'", value).into()),
    }
}

/// Parse an iCal duration value, e.g. `PT30M`, `P1DT2H` or `P2W`
fn parse_duration(value: &str) -> Result<Duration, Box<dyn Error>> {
    let mut rest = value.trim();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let rest = match rest.strip_prefix('P') {
        None => return Err(format!("Invalid iCal duration '{}'", value).into()),
        Some(rest) => rest,
    };

    let mut seconds: i64 = 0;
    let mut digits = String::new();
    let mut in_time = false;
    for c in rest.chars() {
        if c == 'T' && digits.is_empty() {
            in_time = true;
            continue;
        }
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let count: i64 = digits.parse()
            .map_err(|_| format!("Invalid iCal duration '{}'", value))?;
        digits.clear();

        let unit_seconds = match (c, in_time) {
            ('W', false) => 7 * 86_400,
            ('D', false) => 86_400,
            ('H', true) => 3_600,
            ('M', true) => 60,
            ('S', true) => 1,
            _ => return Err(format!("Invalid iCal duration '{}'", value).into()),
        };
        seconds += count * unit_seconds;
    }

    if digits.is_empty() == false {
        // Trailing digits without a unit letter
        return Err(format!("Invalid iCal duration '{}'", value).into());
    }

    Ok(Duration::seconds(if negative { -seconds } else { seconds }))
}
