//! Evaluation of recurrence rules (`RRULE`/`EXRULE` strings) over a bounded time window
//!
//! This is not a general RFC 5545 implementation: only the mini-language needed to evaluate
//! calendar events over a bounded window is supported. A rule looks like
//! `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,TU;BYHOUR=11`, where `FREQ` is mandatory and everything else
//! is optional. \
//! Supported parts are `FREQ` (`DAILY`, `WEEKLY`, `MONTHLY`, `YEARLY`), `INTERVAL`, `BYDAY`
//! (plain two-letter weekday codes), `BYHOUR`, `BYMONTHDAY`, `BYMONTH`, `COUNT`, `UNTIL` and `WKST`.
//! Anything else (e.g. ordinal weekdays such as `2MO`, or sub-daily frequencies) is rejected when
//! the rule is parsed, so that a rule this module would mis-evaluate is visibly refused instead of
//! silently firing on the wrong days.

use std::error::Error;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::ical::parse_datetime;

/// How often a [`RecurrenceRule`] repeats
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A parsed recurrence rule.
///
/// Parse one from its textual form with [`str::parse`], then generate concrete instants with
/// [`expand`](RecurrenceRule::expand).
#[derive(Clone, Debug, PartialEq)]
pub struct RecurrenceRule {
    freq: Frequency,
    interval: u32,
    by_day: Vec<Weekday>,
    by_hour: Vec<u32>,
    by_month_day: Vec<u32>,
    by_month: Vec<u32>,
    count: Option<u32>,
    until: Option<NaiveDateTime>,
    week_start: Weekday,
}

impl FromStr for RecurrenceRule {
    type Err = Box<dyn Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut freq = None;
        let mut interval = 1;
        let mut by_day = Vec::new();
        let mut by_hour: Vec<u32> = Vec::new();
        let mut by_month_day = Vec::new();
        let mut by_month = Vec::new();
        let mut count = None;
        let mut until = None;
        let mut week_start = Weekday::Mon;

        for part in s.split(';') {
            let part = part.trim();
            if part.is_empty() {
                // Tolerate a trailing semicolon
                continue;
            }

            let (key, value) = match part.split_once('=') {
                None => return Err(format!("Invalid recurrence rule part '{}' in '{}'", part, s).into()),
                Some(key_value) => key_value,
            };

            match key.to_ascii_uppercase().as_str() {
                "FREQ" => freq = Some(parse_frequency(value)?),
                "INTERVAL" => {
                    interval = parse_bounded(value, 1, u32::MAX)?;
                },
                "COUNT" => count = Some(parse_bounded(value, 1, u32::MAX)?),
                "UNTIL" => until = Some(parse_datetime(value)?),
                "BYDAY" => {
                    by_day = value.split(',')
                        .map(parse_weekday)
                        .collect::<Result<Vec<Weekday>, _>>()?;
                },
                "BYHOUR" => {
                    by_hour = value.split(',')
                        .map(|hour| parse_bounded(hour, 0, 23))
                        .collect::<Result<Vec<u32>, _>>()?;
                    by_hour.sort();
                    by_hour.dedup();
                },
                "BYMONTHDAY" => {
                    by_month_day = value.split(',')
                        .map(|day| parse_bounded(day, 1, 31))
                        .collect::<Result<Vec<u32>, _>>()?;
                },
                "BYMONTH" => {
                    by_month = value.split(',')
                        .map(|month| parse_bounded(month, 1, 12))
                        .collect::<Result<Vec<u32>, _>>()?;
                    // Keep the generation chronological within a year
                    by_month.sort();
                    by_month.dedup();
                },
                "WKST" => week_start = parse_weekday(value)?,
                _ => return Err(format!("Unsupported recurrence rule part '{}' in '{}'", key, s).into()),
            }
        }

        let freq = match freq {
            None => return Err(format!("Missing FREQ in recurrence rule '{}'", s).into()),
            Some(freq) => freq,
        };

        Ok(Self { freq, interval, by_day, by_hour, by_month_day, by_month, count, until, week_start })
    }
}

impl RecurrenceRule {
    /// Generate every instant implied by this rule, starting at `anchor`, that falls within
    /// `[from, to]` (both ends included), in ascending order and without duplicates.
    ///
    /// `COUNT` is counted from the anchor onwards, so occurrences before `from` still consume it.
    /// Interval arithmetic is anchored too: e.g. `FREQ=WEEKLY;INTERVAL=2` fires on every second week
    /// counted from the anchor's week (weeks starting at `WKST`, `MO` unless said otherwise).
    pub fn expand(&self, anchor: NaiveDateTime, from: NaiveDateTime, to: NaiveDateTime) -> Vec<NaiveDateTime> {
        let mut instants = Vec::new();
        let mut generated = 0;
        let mut period = self.first_period(anchor.date());

        'periods: while period <= to.date() {
            for date in self.dates_in_period(period, anchor.date()) {
                for instant in self.instants_on(date, anchor.time()) {
                    if instant < anchor {
                        continue;
                    }
                    if let Some(until) = self.until {
                        if instant > until {
                            break 'periods;
                        }
                    }
                    if let Some(count) = self.count {
                        generated += 1;
                        if generated > count {
                            break 'periods;
                        }
                    }
                    if from <= instant && instant <= to {
                        instants.push(instant);
                    }
                }
            }

            period = match self.next_period(period) {
                None => break,
                Some(next) => next,
            };
        }

        instants.sort();
        instants.dedup();
        instants
    }

    /// The start of the period (day, week, month or year) the anchor lives in
    fn first_period(&self, anchor: NaiveDate) -> NaiveDate {
        match self.freq {
            Frequency::Daily => anchor,
            Frequency::Weekly => week_start(anchor, self.week_start),
            Frequency::Monthly => anchor.with_day(1).unwrap(/* every month has a day 1 */),
            Frequency::Yearly => NaiveDate::from_ymd_opt(anchor.year(), 1, 1).unwrap(/* every year has a January 1st */),
        }
    }

    /// The start of the period `interval` periods later, or `None` past the calendar bounds
    fn next_period(&self, period: NaiveDate) -> Option<NaiveDate> {
        match self.freq {
            Frequency::Daily => period.checked_add_signed(Duration::days(i64::from(self.interval))),
            Frequency::Weekly => period.checked_add_signed(Duration::weeks(i64::from(self.interval))),
            Frequency::Monthly => period.checked_add_months(Months::new(self.interval)),
            Frequency::Yearly => NaiveDate::from_ymd_opt(period.year() + self.interval as i32, 1, 1),
        }
    }

    /// The calendar dates this rule selects within one period, in ascending order
    fn dates_in_period(&self, period: NaiveDate, anchor: NaiveDate) -> Vec<NaiveDate> {
        match self.freq {
            Frequency::Daily => {
                let weekday_ok = self.by_day.is_empty() || self.by_day.contains(&period.weekday());
                if weekday_ok && self.month_matches(period) && self.month_day_filter_matches(period) {
                    vec![period]
                } else {
                    Vec::new()
                }
            },

            Frequency::Weekly => {
                (0..7)
                    .map(|offset| period + Duration::days(offset))
                    .filter(|date| {
                        let weekday_ok = if self.by_day.is_empty() {
                            date.weekday() == anchor.weekday()
                        } else {
                            self.by_day.contains(&date.weekday())
                        };
                        weekday_ok && self.month_matches(*date) && self.month_day_filter_matches(*date)
                    })
                    .collect()
            },

            Frequency::Monthly => {
                if self.month_matches(period) {
                    self.dates_in_month(period, anchor)
                } else {
                    Vec::new()
                }
            },

            Frequency::Yearly => {
                let months = if self.by_month.is_empty() {
                    vec![anchor.month()]
                } else {
                    self.by_month.clone()
                };
                months.iter()
                    .filter_map(|&month| NaiveDate::from_ymd_opt(period.year(), month, 1))
                    .flat_map(|first_of_month| self.dates_in_month(first_of_month, anchor))
                    .collect()
            },
        }
    }

    /// The dates of one month that match the BYMONTHDAY/BYDAY parts.
    ///
    /// With neither part, this is the anchor's day of month (skipped in months that are too short).
    /// `BYDAY` without `BYMONTHDAY` selects every matching weekday of the month.
    fn dates_in_month(&self, first_of_month: NaiveDate, anchor: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut date = first_of_month;

        while date.month() == first_of_month.month() {
            let month_day_ok = if self.by_month_day.is_empty() {
                if self.by_day.is_empty() { date.day() == anchor.day() } else { true }
            } else {
                self.by_month_day.contains(&date.day())
            };
            let weekday_ok = self.by_day.is_empty() || self.by_day.contains(&date.weekday());

            if month_day_ok && weekday_ok {
                dates.push(date);
            }

            date = match date.succ_opt() {
                None => break,
                Some(next) => next,
            };
        }

        dates
    }

    /// The instants of one selected date: one per `BYHOUR` hour, or the anchor's hour.
    /// Minutes and seconds always come from the anchor.
    fn instants_on(&self, date: NaiveDate, anchor_time: NaiveTime) -> Vec<NaiveDateTime> {
        if self.by_hour.is_empty() {
            return vec![date.and_time(anchor_time)];
        }

        self.by_hour.iter()
            .map(|&hour| {
                let time = NaiveTime::from_hms_opt(hour, anchor_time.minute(), anchor_time.second())
                    .unwrap(/* the hour was range-checked when the rule was parsed */);
                date.and_time(time)
            })
            .collect()
    }

    fn month_matches(&self, date: NaiveDate) -> bool {
        self.by_month.is_empty() || self.by_month.contains(&date.month())
    }

    fn month_day_filter_matches(&self, date: NaiveDate) -> bool {
        self.by_month_day.is_empty() || self.by_month_day.contains(&date.day())
    }
}

/// Expand `rule` from `anchor`, returning the generated instants within `[from, to]` (both ends
/// included) in ascending order. Fails if `rule` does not parse.
pub fn expand(rule: &str, anchor: NaiveDateTime, from: NaiveDateTime, to: NaiveDateTime) -> Result<Vec<NaiveDateTime>, Box<dyn Error>> {
    let rule: RecurrenceRule = rule.parse()?;
    Ok(rule.expand(anchor, from, to))
}

/// Remove from `candidates` every instant that `exclusion` generates over the same window.
///
/// Exclusion matches on exact instant equality; an exclusion instant that matches no candidate is
/// simply ignored. With no exclusion rule, the candidates are returned unchanged.
pub fn apply_exclusion(exclusion: Option<&str>, candidates: Vec<NaiveDateTime>, anchor: NaiveDateTime, from: NaiveDateTime, to: NaiveDateTime)
    -> Result<Vec<NaiveDateTime>, Box<dyn Error>>
{
    let exclusion = match exclusion {
        None => return Ok(candidates),
        Some(exclusion) => exclusion,
    };

    let mut remaining = candidates;
    for instant in expand(exclusion, anchor, from, to)? {
        log::debug!("Occurrence excluded: {}", instant);
        if let Some(position) = remaining.iter().position(|candidate| *candidate == instant) {
            remaining.remove(position);
        }
    }

    Ok(remaining)
}

fn parse_frequency(value: &str) -> Result<Frequency, Box<dyn Error>> {
    match value.to_ascii_uppercase().as_str() {
        "DAILY" => Ok(Frequency::Daily),
        "WEEKLY" => Ok(Frequency::Weekly),
        "MONTHLY" => Ok(Frequency::Monthly),
        "YEARLY" => Ok(Frequency::Yearly),
        _ => Err(format!("Unsupported frequency '{}'", value).into()),
    }
}

fn parse_weekday(value: &str) -> Result<Weekday, Box<dyn Error>> {
    match value.trim().to_ascii_uppercase().as_str() {
        "MO" => Ok(Weekday::Mon),
        "TU" => Ok(Weekday::Tue),
        "WE" => Ok(Weekday::Wed),
        "TH" => Ok(Weekday::Thu),
        "FR" => Ok(Weekday::Fri),
        "SA" => Ok(Weekday::Sat),
        "SU" => Ok(Weekday::Sun),
        // This also refuses ordinal values such as "2MO" or "-1FR", which we do not evaluate
        _ => Err(format!("Unsupported weekday '{}'", value).into()),
    }
}

fn parse_bounded(value: &str, min: u32, max: u32) -> Result<u32, Box<dyn Error>> {
    let number: u32 = value.trim().parse()
        .map_err(|_| format!("Invalid number '{}'", value))?;
    if number < min || number > max {
        return Err(format!("Number {} is out of the expected {}..={} range", number, min, max).into());
    }
    Ok(number)
}

/// The date the week of `date` starts on, weeks starting at `wkst`
fn week_start(date: NaiveDate, wkst: Weekday) -> NaiveDate {
    let offset = (7 + i64::from(date.weekday().num_days_from_monday()) - i64::from(wkst.num_days_from_monday())) % 7;
    date - Duration::days(offset)
}
