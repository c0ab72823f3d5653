//! Calendar and duration steps for the time axis
//!
//! Precision codes follow the frequency strings commonly used for time series
//! resampling: an optional positive multiplier followed by a unit, e.g. `D`, `6h`,
//! `15min`, `MS` or `2YS`.

use crate::errors::{GeoCubeError, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::str::FromStr;

/// Unit of a [`Precision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrecisionUnit {
    Second,
    Minute,
    Hour,
    /// Fixed 24 hour steps from the first timestamp
    Day,
    /// Weeks anchored on Sunday
    Week,
    MonthStart,
    MonthEnd,
    QuarterStart,
    QuarterEnd,
    YearStart,
    YearEnd,
}

impl PrecisionUnit {
    /// Canonical code of the unit
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Second => "s",
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Day => "D",
            Self::Week => "W",
            Self::MonthStart => "MS",
            Self::MonthEnd => "ME",
            Self::QuarterStart => "QS",
            Self::QuarterEnd => "QE",
            Self::YearStart => "YS",
            Self::YearEnd => "YE",
        }
    }

    fn parse(code: &str) -> Option<Self> {
        let unit = match code {
            "s" | "S" => Self::Second,
            "min" | "T" => Self::Minute,
            "h" | "H" => Self::Hour,
            "D" | "d" => Self::Day,
            "W" | "W-SUN" => Self::Week,
            "MS" => Self::MonthStart,
            "M" | "ME" => Self::MonthEnd,
            "QS" => Self::QuarterStart,
            "Q" | "QE" => Self::QuarterEnd,
            "YS" | "AS" => Self::YearStart,
            "Y" | "A" | "YE" => Self::YearEnd,
            _ => return None,
        };
        Some(unit)
    }

    /// Length in seconds of units with a fixed duration
    const fn fixed_seconds(self) -> Option<i64> {
        match self {
            Self::Second => Some(1),
            Self::Minute => Some(60),
            Self::Hour => Some(3_600),
            Self::Day => Some(86_400),
            Self::Week => Some(604_800),
            _ => None,
        }
    }

    /// Period in months and whether the anchor is the first (`true`) or last day
    fn calendar(self) -> Option<(i64, bool)> {
        match self {
            Self::MonthStart => Some((1, true)),
            Self::MonthEnd => Some((1, false)),
            Self::QuarterStart => Some((3, true)),
            Self::QuarterEnd => Some((3, false)),
            Self::YearStart => Some((12, true)),
            Self::YearEnd => Some((12, false)),
            _ => None,
        }
    }
}

/// Step used to generate the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precision {
    multiple: u32,
    unit: PrecisionUnit,
}

impl Precision {
    /// # Errors
    ///
    /// Returns `InvalidPrecision` if `multiple` is zero, or if a fixed-length step
    /// does not fit in a duration.
    pub fn new(multiple: u32, unit: PrecisionUnit) -> Result<Self> {
        let overflows = unit.fixed_seconds().is_some() && fixed_step(multiple, unit).is_none();
        if multiple == 0 || overflows {
            return Err(GeoCubeError::InvalidPrecision {
                code: format!("{multiple}{}", unit.as_str()),
            });
        }
        Ok(Self { multiple, unit })
    }

    #[must_use]
    pub const fn multiple(self) -> u32 {
        self.multiple
    }

    #[must_use]
    pub const fn unit(self) -> PrecisionUnit {
        self.unit
    }

    /// Every step from `start` up to and including `end`
    ///
    /// Tick units start at `start` exactly. Anchored units first roll `start`
    /// forward to the next anchor (keeping the time of day), so the first value may
    /// lie after `start`.
    #[must_use]
    pub fn date_range(self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
        if start > end {
            return Vec::new();
        }

        if let Some(step) = fixed_step(self.multiple, self.unit) {
            let first = if self.unit == PrecisionUnit::Week {
                let offset = (7 - start.weekday().num_days_from_sunday()) % 7;
                match start.checked_add_signed(Duration::days(i64::from(offset))) {
                    Some(first) => first,
                    None => return Vec::new(),
                }
            } else {
                start
            };
            return step_fixed(first, end, step);
        }

        match self.unit.calendar() {
            Some((period, is_start)) => {
                step_calendar(start, end, period, is_start, i64::from(self.multiple))
            }
            None => Vec::new(),
        }
    }
}

/// `multiple` fixed-length units, `None` for calendar units or on overflow
fn fixed_step(multiple: u32, unit: PrecisionUnit) -> Option<Duration> {
    let seconds = unit.fixed_seconds()?;
    i64::from(multiple)
        .checked_mul(seconds)
        .and_then(Duration::try_seconds)
}

fn step_fixed(first: NaiveDateTime, end: NaiveDateTime, step: Duration) -> Vec<NaiveDateTime> {
    let mut values = Vec::new();
    let mut current = first;
    while current <= end {
        values.push(current);
        match current.checked_add_signed(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    values
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn anchor_date(index: i64, is_start: bool) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    if is_start {
        Some(first)
    } else {
        first.checked_add_months(Months::new(1))?.pred_opt()
    }
}

fn step_calendar(
    start: NaiveDateTime,
    end: NaiveDateTime,
    period: i64,
    is_start: bool,
    multiple: i64,
) -> Vec<NaiveDateTime> {
    let time: NaiveTime = start.time();
    let phase = if is_start { 0 } else { period - 1 };

    // first month on the anchor phase whose anchor is not before `start`
    let mut index = month_index(start.date());
    index += (phase - index).rem_euclid(period);
    if let Some(date) = anchor_date(index, is_start) {
        if date < start.date() {
            index += period;
        }
    }

    let mut values = Vec::new();
    while let Some(date) = anchor_date(index, is_start) {
        let value = date.and_time(time);
        if value > end {
            break;
        }
        values.push(value);
        index += period * multiple;
    }
    values
}

impl FromStr for Precision {
    type Err = GeoCubeError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        let split = code
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(code.len());
        let (digits, unit) = code.split_at(split);

        let invalid = || GeoCubeError::InvalidPrecision {
            code: s.to_string(),
        };

        let multiple = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().map_err(|_| invalid())?
        };
        let unit = PrecisionUnit::parse(unit).ok_or_else(invalid)?;

        Precision::new(multiple, unit).map_err(|_| invalid())
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple == 1 {
            f.write_str(self.unit.as_str())
        } else {
            write!(f, "{}{}", self.multiple, self.unit.as_str())
        }
    }
}
