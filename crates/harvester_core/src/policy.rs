use chrono::NaiveDate;

use crate::{Created, DayRange, Filter, Partition, YearRange};

/// Maximum number of results the search API returns for one query.
pub const RESULT_CAP: u64 = 1000;

/// What to do with a partition once its result count is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Count is within the cap: paginate and persist.
    Harvest,
    /// Bisect the active interval; the lower half is processed first.
    Split { lower: Partition, upper: Partition },
    /// The active interval is a single point. Continue in a finer dimension
    /// covering the same result set, so the known count carries over.
    Refine(Partition),
    /// A single day still exceeds the cap.
    Unsplittable,
}

/// Splitting policy over the star × creation-date space.
///
/// `era` is the supported creation-date range. Date clauses touching its
/// edges render open-ended so repositories outside the era still fall into
/// the first or last partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPolicy {
    cap: u64,
    era: YearRange,
}

impl SplitPolicy {
    pub fn new(era: YearRange) -> Self {
        Self {
            cap: RESULT_CAP,
            era,
        }
    }

    pub fn with_cap(mut self, cap: u64) -> Self {
        self.cap = cap;
        self
    }

    pub fn cap(&self) -> u64 {
        self.cap
    }

    pub fn era(&self) -> YearRange {
        self.era
    }

    pub fn decide(&self, partition: &Partition, count: u64) -> Decision {
        if count <= self.cap {
            return Decision::Harvest;
        }
        if let Some((lower, upper)) = partition.active().bisect() {
            return Decision::Split {
                lower: partition.with_interval(lower),
                upper: partition.with_interval(upper),
            };
        }
        match self.refine(partition) {
            Some(finer) => Decision::Refine(finer),
            None => Decision::Unsplittable,
        }
    }

    /// Next dimension for a partition whose active interval is a single point.
    fn refine(&self, partition: &Partition) -> Option<Partition> {
        let created = match partition.created {
            Created::Any => Created::Years(self.era),
            Created::Years(years) => Created::Days(DayRange::for_year(years.first()).ok()?),
            Created::Days(_) => return None,
        };
        Some(Partition {
            created,
            ..*partition
        })
    }

    pub fn filter(&self, partition: &Partition) -> Filter {
        let stars = format!("stars:{}", partition.stars);
        match self.created_clause(&partition.created) {
            Some(created) => Filter::new(format!("{stars} {created}")),
            None => Filter::new(stars),
        }
    }

    fn created_clause(&self, created: &Created) -> Option<String> {
        match created {
            Created::Any => None,
            Created::Years(years) => date_clause(
                years.first() <= self.era.first(),
                years.last() >= self.era.last(),
                years.first().to_string(),
                years.last().to_string(),
            ),
            Created::Days(days) => {
                let era_days = self.era.days();
                date_clause(
                    days.first() <= era_days.first(),
                    days.last() >= era_days.last(),
                    format_day(days.first()),
                    format_day(days.last()),
                )
            }
        }
    }
}

fn date_clause(open_low: bool, open_high: bool, low: String, high: String) -> Option<String> {
    match (open_low, open_high) {
        (true, true) => None,
        (true, false) => Some(format!("created:<={high}")),
        (false, true) => Some(format!("created:>={low}")),
        (false, false) => Some(format!("created:{low}..{high}")),
    }
}

fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
