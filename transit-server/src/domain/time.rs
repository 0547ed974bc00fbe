//! Week-minute time handling.
//!
//! Every absolute time in the planner is a count of minutes since Monday
//! 00:00 of the planning week. A request's (day, "HH:MM") pair collapses to a
//! single integer, and trips running past midnight (or past the end of the
//! week) are plain arithmetic on that integer.

use std::fmt;
use std::ops::Add;

use chrono::Weekday;
use serde::Serialize;

/// Minutes in one day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minutes in one planning week.
pub const MINUTES_PER_WEEK: i64 = 7 * MINUTES_PER_DAY;

/// Error returned when parsing an invalid day or time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// An absolute time: minutes since Monday 00:00 of the planning week.
///
/// Values before the week start (previous Sunday's overnight services) are
/// negative, and values past Sunday 23:59 continue into the following week
/// without wrapping.
///
/// # Examples
///
/// ```
/// use transit_server::domain::WeekMinute;
/// use chrono::Weekday;
///
/// let t = WeekMinute::from_day_and_time(Weekday::Sun, "23:50").unwrap();
/// assert_eq!(t.minutes(), 10070);
/// assert_eq!(t.to_string(), "Sun 23:50");
///
/// // Fifteen minutes later is Monday of the following week.
/// let later = t + 15;
/// assert_eq!(later.minutes(), 10085);
/// assert_eq!(later.to_string(), "Mon 00:05");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WeekMinute(i64);

impl WeekMinute {
    /// Create from a raw minute count.
    pub const fn new(minutes: i64) -> Self {
        Self(minutes)
    }

    /// Combine a weekday with an "HH:MM" time of day.
    pub fn from_day_and_time(day: Weekday, time: &str) -> Result<Self, TimeError> {
        let minute_of_day = parse_hhmm(time)?;
        Ok(Self::on_day(
            i64::from(day.num_days_from_monday()),
            minute_of_day,
        ))
    }

    /// Absolute time of `offset` minutes into service day `day_index`.
    ///
    /// `day_index` counts days from the week start and may be negative or
    /// beyond 6; `offset` may exceed a day for trips running past midnight.
    pub fn on_day(day_index: i64, offset: u32) -> Self {
        Self(day_index * MINUTES_PER_DAY + i64::from(offset))
    }

    /// Returns the raw minute count.
    pub fn minutes(self) -> i64 {
        self.0
    }

    /// Day index relative to the week start (may be negative or above 6).
    pub fn day_index(self) -> i64 {
        self.0.div_euclid(MINUTES_PER_DAY)
    }

    /// Day of the week, wrapping across week boundaries.
    pub fn weekday(self) -> Weekday {
        weekday_of(self.day_index())
    }

    /// Minutes since midnight of the day this time falls on (0..1440).
    pub fn minute_of_day(self) -> u32 {
        // rem_euclid keeps this in 0..1440 even for negative values
        self.0.rem_euclid(MINUTES_PER_DAY) as u32
    }

    /// Signed minutes from `earlier` to `self`.
    pub fn minutes_since(self, earlier: Self) -> i64 {
        self.0 - earlier.0
    }
}

impl Add<u32> for WeekMinute {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        Self(self.0 + i64::from(rhs))
    }
}

impl fmt::Debug for WeekMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeekMinute({} = {})", self.0, self)
    }
}

impl fmt::Display for WeekMinute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minute_of_day = self.minute_of_day();
        write!(
            f,
            "{} {:02}:{:02}",
            self.weekday(),
            minute_of_day / 60,
            minute_of_day % 60
        )
    }
}

/// Weekday for a day index counted from Monday of the planning week.
pub fn weekday_of(day_index: i64) -> Weekday {
    match day_index.rem_euclid(7) {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Parse a request day number (Monday = 0 .. Sunday = 6).
pub fn parse_day(day: i64) -> Result<Weekday, TimeError> {
    u8::try_from(day)
        .ok()
        .and_then(|d| Weekday::try_from(d).ok())
        .ok_or_else(|| TimeError::new("day must be in 0..6 (Monday = 0)"))
}

/// Parse a 24-hour "HH:MM" (or "H:MM") string into minutes since midnight.
///
/// # Examples
///
/// ```
/// use transit_server::domain::parse_hhmm;
///
/// assert_eq!(parse_hhmm("00:00").unwrap(), 0);
/// assert_eq!(parse_hhmm("8:05").unwrap(), 485);
/// assert_eq!(parse_hhmm("23:59").unwrap(), 1439);
///
/// assert!(parse_hhmm("24:00").is_err());
/// assert!(parse_hhmm("12:60").is_err());
/// assert!(parse_hhmm("1230").is_err());
/// ```
pub fn parse_hhmm(s: &str) -> Result<u32, TimeError> {
    let (hours, minutes) = s
        .split_once(':')
        .ok_or_else(|| TimeError::new("expected HH:MM format"))?;

    if hours.is_empty() || hours.len() > 2 {
        return Err(TimeError::new("hour must have one or two digits"));
    }
    if minutes.len() != 2 {
        return Err(TimeError::new("minute must have two digits"));
    }

    let hour = parse_digits(hours).ok_or_else(|| TimeError::new("invalid hour digits"))?;
    if hour > 23 {
        return Err(TimeError::new("hour must be 0-23"));
    }

    let minute = parse_digits(minutes).ok_or_else(|| TimeError::new("invalid minute digits"))?;
    if minute > 59 {
        return Err(TimeError::new("minute must be 0-59"));
    }

    Ok(hour * 60 + minute)
}

/// Parse a short run of ASCII digits.
fn parse_digits(s: &str) -> Option<u32> {
    s.chars()
        .try_fold(0u32, |acc, c| Some(acc * 10 + c.to_digit(10)?))
}
