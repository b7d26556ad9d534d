use engine_logging::{engine_debug, engine_info};
use harvester_engine::{HarvestEvent, ProgressSink};

/// Reports page and write progress through the logger.
///
/// Splitting, refining and skipping are already logged by the harvester.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::Probed { filter, count, .. } => {
                engine_debug!("Probe `{}`: {} results", filter, count);
            }
            HarvestEvent::PageFetched {
                filter,
                page,
                accumulated,
                total,
                rate_limit,
            } => match rate_limit {
                Some(rate_limit) => engine_info!(
                    "`{}` page {}: {} / {} ({})",
                    filter,
                    page,
                    accumulated,
                    total,
                    rate_limit
                ),
                None => engine_info!("`{}` page {}: {} / {}", filter, page, accumulated, total),
            },
            HarvestEvent::Written {
                path,
                records,
                total,
                ..
            } => {
                engine_info!("Wrote {:?} ({} of {} records)", path, records, total);
            }
            HarvestEvent::Skipped { .. }
            | HarvestEvent::Splitting { .. }
            | HarvestEvent::Refining { .. } => {}
        }
    }
}
