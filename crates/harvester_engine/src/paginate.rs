use engine_logging::{engine_debug, engine_warn};
use harvester_core::{Filter, RESULT_CAP};

use crate::search::PageSource;
use crate::{Completion, HarvestError, HarvestEvent, Harvested, ProgressSink, QueryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSettings {
    pub page_size: u32,
    /// Stop paginating once the remaining quota drops below this.
    pub min_remaining: u64,
    pub result_cap: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            min_remaining: 10,
            result_cap: RESULT_CAP,
        }
    }
}

/// Cursor pagination over a filter already known to be within the cap.
#[derive(Debug, Clone)]
pub struct Paginator {
    settings: PaginationSettings,
}

impl Paginator {
    pub fn new(settings: PaginationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PaginationSettings {
        &self.settings
    }

    pub async fn paginate(
        &self,
        source: &dyn PageSource,
        filter: &Filter,
        sink: &dyn ProgressSink,
    ) -> Result<Harvested, HarvestError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = source
                .page(filter, cursor.as_deref(), self.settings.page_size)
                .await
                .map_err(|err| HarvestError::query(filter, err))?;
            pages += 1;

            // A total over the cap means the splitter handed us a bad filter.
            // Truncating here would hide that, so abort instead.
            if page.total > self.settings.result_cap {
                return Err(HarvestError::OverCap {
                    filter: filter.clone(),
                    total: page.total,
                    cap: self.settings.result_cap,
                });
            }

            records.extend(page.records);
            engine_debug!(
                "`{}` page {}: {} / {} cursor={:?}",
                filter,
                pages,
                records.len(),
                page.total,
                page.end_cursor
            );
            sink.emit(HarvestEvent::PageFetched {
                filter: filter.clone(),
                page: pages,
                accumulated: records.len(),
                total: page.total,
                rate_limit: page.rate_limit.clone(),
            });

            if !page.has_next_page {
                return Ok(Harvested {
                    records,
                    reported_total: page.total,
                    pages,
                    completion: Completion::Exhausted,
                });
            }

            if let Some(rate_limit) = page.rate_limit {
                if rate_limit.remaining < self.settings.min_remaining {
                    engine_warn!(
                        "Rate limit nearly exhausted ({}); truncating `{}` at {} / {}",
                        rate_limit,
                        filter,
                        records.len(),
                        page.total
                    );
                    return Ok(Harvested {
                        records,
                        reported_total: page.total,
                        pages,
                        completion: Completion::RateLimited {
                            remaining: rate_limit.remaining,
                            reset_at: rate_limit.reset_at,
                        },
                    });
                }
            }

            cursor = match page.end_cursor {
                Some(next) => Some(next),
                None => {
                    return Err(HarvestError::query(
                        filter,
                        QueryError::invalid_response(
                            "hasNextPage is true but endCursor is missing",
                        ),
                    ))
                }
            };
        }
    }
}
