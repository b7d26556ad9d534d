use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("interval bounds are reversed: {low} > {high}")]
    Reversed { low: String, high: String },
    #[error("year {0} is outside the supported range 1..=9999")]
    YearOutOfRange(i32),
    #[error("invalid star range {0:?}: expected N or A..B")]
    InvalidStarRange(String),
}

/// Length of the lower half minus one when bisecting an interval whose
/// bounds are `span` apart. Rounds down, so the lower half gets the extra
/// element for odd-length intervals.
fn lower_half_span(span: u64) -> u64 {
    span / 2
}

/// Closed range of star counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarRange {
    low: u64,
    high: u64,
}

impl StarRange {
    pub fn new(low: u64, high: u64) -> Result<Self, IntervalError> {
        if low > high {
            return Err(IntervalError::Reversed {
                low: low.to_string(),
                high: high.to_string(),
            });
        }
        Ok(Self { low, high })
    }

    pub fn exact(stars: u64) -> Self {
        Self {
            low: stars,
            high: stars,
        }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn is_exact(&self) -> bool {
        self.low == self.high
    }

    /// Ranges between descending breakpoints: each consecutive pair
    /// `(hi, lo)` yields `[lo, hi - 1]`.
    pub fn from_breaks(breaks: &[u64]) -> Result<Vec<Self>, IntervalError> {
        breaks
            .windows(2)
            .map(|pair| {
                let (hi, lo) = (pair[0], pair[1]);
                if hi <= lo {
                    return Err(IntervalError::Reversed {
                        low: lo.to_string(),
                        high: hi.to_string(),
                    });
                }
                Self::new(lo, hi - 1)
            })
            .collect()
    }

    fn bisect(&self) -> Option<(Self, Self)> {
        if self.is_exact() {
            return None;
        }
        let mid = self.low + lower_half_span(self.high - self.low);
        Some((
            Self {
                low: self.low,
                high: mid,
            },
            Self {
                low: mid + 1,
                high: self.high,
            },
        ))
    }
}

/// Renders as `N` for an exact count and `A..B` otherwise, matching the
/// search grammar.
impl fmt::Display for StarRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}..{}", self.low, self.high)
        }
    }
}

impl FromStr for StarRange {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IntervalError::InvalidStarRange(s.to_string());
        let trimmed = s.trim();
        match trimmed.split_once("..") {
            Some((low, high)) => {
                let low = low.trim().parse().map_err(|_| invalid())?;
                let high = high.trim().parse().map_err(|_| invalid())?;
                Self::new(low, high)
            }
            None => trimmed.parse().map(Self::exact).map_err(|_| invalid()),
        }
    }
}

/// Closed range of calendar years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearRange {
    first: i32,
    last: i32,
}

impl YearRange {
    pub fn new(first: i32, last: i32) -> Result<Self, IntervalError> {
        for year in [first, last] {
            if !(1..=9999).contains(&year) {
                return Err(IntervalError::YearOutOfRange(year));
            }
        }
        if first > last {
            return Err(IntervalError::Reversed {
                low: first.to_string(),
                high: last.to_string(),
            });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn last(&self) -> i32 {
        self.last
    }

    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    /// January 1st of the first year through December 31st of the last.
    pub fn days(&self) -> DayRange {
        DayRange {
            first: jan_first(self.first),
            last: dec_last(self.last),
        }
    }

    fn bisect(&self) -> Option<(Self, Self)> {
        if self.is_single() {
            return None;
        }
        // Bounds are validated to 1..=9999, so the span is non-negative.
        let span = (self.last - self.first) as u64;
        let mid = self.first + lower_half_span(span) as i32;
        Some((
            Self {
                first: self.first,
                last: mid,
            },
            Self {
                first: mid + 1,
                last: self.last,
            },
        ))
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.first, self.last)
    }
}

fn jan_first(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn dec_last(year: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Closed range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRange {
    first: NaiveDate,
    last: NaiveDate,
}

impl DayRange {
    pub fn new(first: NaiveDate, last: NaiveDate) -> Result<Self, IntervalError> {
        if first > last {
            return Err(IntervalError::Reversed {
                low: first.to_string(),
                high: last.to_string(),
            });
        }
        Ok(Self { first, last })
    }

    /// The whole of `year`, January 1st through December 31st.
    pub fn for_year(year: i32) -> Result<Self, IntervalError> {
        Ok(YearRange::new(year, year)?.days())
    }

    pub fn first(&self) -> NaiveDate {
        self.first
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    /// Number of days between the bounds; zero for a single day.
    pub fn span_days(&self) -> u64 {
        self.last.signed_duration_since(self.first).num_days().unsigned_abs()
    }

    fn bisect(&self) -> Option<(Self, Self)> {
        let span = self.span_days();
        if span == 0 {
            return None;
        }
        let half = lower_half_span(span);
        let mid = self.first.checked_add_days(Days::new(half))?;
        let upper_start = mid.checked_add_days(Days::new(1))?;
        Some((
            Self {
                first: self.first,
                last: mid,
            },
            Self {
                first: upper_start,
                last: self.last,
            },
        ))
    }
}

impl fmt::Display for DayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.first.format("%Y-%m-%d"),
            self.last.format("%Y-%m-%d")
        )
    }
}

/// One searchable dimension of a partition.
///
/// All three variants share the same bisection rule: `[low, high]` becomes
/// `[low, low + d]` and `[low + d + 1, high]` with `d = floor((high - low) / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Stars(StarRange),
    Years(YearRange),
    Days(DayRange),
}

impl Interval {
    /// A degenerate interval covers a single star count, year or day.
    pub fn is_degenerate(&self) -> bool {
        match self {
            Interval::Stars(range) => range.is_exact(),
            Interval::Years(range) => range.is_single(),
            Interval::Days(range) => range.span_days() == 0,
        }
    }

    /// Splits into a lower and an upper half, or `None` when degenerate.
    pub fn bisect(&self) -> Option<(Interval, Interval)> {
        match self {
            Interval::Stars(range) => range
                .bisect()
                .map(|(lo, hi)| (Interval::Stars(lo), Interval::Stars(hi))),
            Interval::Years(range) => range
                .bisect()
                .map(|(lo, hi)| (Interval::Years(lo), Interval::Years(hi))),
            Interval::Days(range) => range
                .bisect()
                .map(|(lo, hi)| (Interval::Days(lo), Interval::Days(hi))),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Stars(range) => write!(f, "stars {range}"),
            Interval::Years(range) => write!(f, "years {range}"),
            Interval::Days(range) => write!(f, "days {range}"),
        }
    }
}
