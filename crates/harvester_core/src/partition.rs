use std::fmt;

use crate::{DayRange, Interval, StarRange, YearRange};

/// Creation-date restriction of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Created {
    Any,
    Years(YearRange),
    Days(DayRange),
}

/// A star range together with a creation-date restriction.
///
/// The date interval is the searched dimension when present; otherwise the
/// star range is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    pub stars: StarRange,
    pub created: Created,
}

impl Partition {
    pub fn by_stars(stars: StarRange) -> Self {
        Self {
            stars,
            created: Created::Any,
        }
    }

    pub fn by_days(stars: StarRange, days: DayRange) -> Self {
        Self {
            stars,
            created: Created::Days(days),
        }
    }

    /// The interval the splitter bisects for this partition.
    pub fn active(&self) -> Interval {
        match self.created {
            Created::Any => Interval::Stars(self.stars),
            Created::Years(years) => Interval::Years(years),
            Created::Days(days) => Interval::Days(days),
        }
    }

    pub(crate) fn with_interval(&self, interval: Interval) -> Self {
        match interval {
            Interval::Stars(stars) => Self { stars, ..*self },
            Interval::Years(years) => Self {
                created: Created::Years(years),
                ..*self
            },
            Interval::Days(days) => Self {
                created: Created::Days(days),
                ..*self
            },
        }
    }

    /// Deterministic artifact filename, e.g. `repos.stars=16.2010-2014.json`.
    ///
    /// Names use the explicit bounds of the partition so they stay distinct
    /// even where the rendered filter collapses an open-ended bound.
    pub fn artifact_name(&self) -> String {
        match self.created {
            Created::Any => format!("repos.stars={}.json", self.stars),
            Created::Years(years) => format!(
                "repos.stars={}.{}-{}.json",
                self.stars,
                years.first(),
                years.last()
            ),
            Created::Days(days) => format!(
                "repos.stars={}.{}-{}.json",
                self.stars,
                days.first().format("%Y-%m-%d"),
                days.last().format("%Y-%m-%d")
            ),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.created {
            Created::Any => write!(f, "stars {}", self.stars),
            Created::Years(years) => write!(f, "stars {} / years {years}", self.stars),
            Created::Days(days) => write!(f, "stars {} / days {days}", self.stars),
        }
    }
}
