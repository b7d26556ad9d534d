//! Range splitting driver.
//!
//! Partitions are processed depth-first from an explicit stack: a split
//! pushes its upper half below its lower half, so the lower half and all of
//! its descendants finish before the upper half starts. The visiting order
//! is therefore fixed for a given seed list and policy, which keeps artifact
//! names stable across re-runs.

use engine_logging::{engine_info, engine_warn};
use harvester_core::{Decision, Partition, SplitPolicy};

use crate::paginate::{PaginationSettings, Paginator};
use crate::persist::ArtifactStore;
use crate::search::{CountProbe, PageSource};
use crate::{HarvestError, HarvestEvent, ProgressSink};

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub probes: u32,
    pub written: usize,
    pub skipped: usize,
    pub records: usize,
    /// Artifacts written short of their reported total.
    pub truncated: Vec<String>,
}

struct Pending {
    partition: Partition,
    /// Count inherited from a coarser partition with the same result set.
    known_count: Option<u64>,
}

pub struct Harvester<B> {
    backend: B,
    policy: SplitPolicy,
    paginator: Paginator,
    store: ArtifactStore,
}

impl<B: CountProbe + PageSource> Harvester<B> {
    /// The paginator's cap always follows the policy's cap.
    pub fn new(
        backend: B,
        policy: SplitPolicy,
        pagination: PaginationSettings,
        store: ArtifactStore,
    ) -> Self {
        let paginator = Paginator::new(PaginationSettings {
            result_cap: policy.cap(),
            ..pagination
        });
        Self {
            backend,
            policy,
            paginator,
            store,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Harvests every seed in order, splitting until each partition fits
    /// under the cap.
    ///
    /// Any error aborts the run. Artifacts written before the error are
    /// complete and are skipped on the next run.
    pub async fn run(
        &self,
        seeds: &[Partition],
        sink: &dyn ProgressSink,
    ) -> Result<HarvestSummary, HarvestError> {
        let mut summary = HarvestSummary::default();
        let mut stack: Vec<Pending> = seeds
            .iter()
            .rev()
            .map(|&partition| Pending {
                partition,
                known_count: None,
            })
            .collect();

        while let Some(Pending {
            partition,
            known_count,
        }) = stack.pop()
        {
            let artifact = partition.artifact_name();
            if self.store.already_done(&artifact) {
                engine_info!("Skipping {}, already exists", artifact);
                summary.skipped += 1;
                sink.emit(HarvestEvent::Skipped {
                    partition,
                    artifact,
                });
                continue;
            }

            let filter = self.policy.filter(&partition);
            let count = match known_count {
                Some(count) => count,
                None => {
                    let count = self
                        .backend
                        .count(&filter)
                        .await
                        .map_err(|err| HarvestError::query(&filter, err))?;
                    summary.probes += 1;
                    sink.emit(HarvestEvent::Probed {
                        partition,
                        filter: filter.clone(),
                        count,
                    });
                    count
                }
            };

            match self.policy.decide(&partition, count) {
                Decision::Harvest => {
                    engine_info!(
                        "Harvesting `{}` ({} results) into {}",
                        filter,
                        count,
                        artifact
                    );
                    let harvested = self
                        .paginator
                        .paginate(&self.backend, &filter, sink)
                        .await?;
                    let truncated = harvested.is_truncated();
                    let path = self.store.write(&artifact, &harvested.records).await?;
                    if truncated {
                        engine_warn!(
                            "Wrote truncated {}: {} / {} records",
                            artifact,
                            harvested.records.len(),
                            harvested.reported_total
                        );
                        summary.truncated.push(artifact);
                    }
                    summary.written += 1;
                    summary.records += harvested.records.len();
                    sink.emit(HarvestEvent::Written {
                        partition,
                        path,
                        records: harvested.records.len(),
                        total: harvested.reported_total,
                        truncated,
                    });
                }
                Decision::Split { lower, upper } => {
                    engine_info!("{} -> {}, will split", partition, count);
                    sink.emit(HarvestEvent::Splitting {
                        partition,
                        count,
                        lower,
                        upper,
                    });
                    stack.push(Pending {
                        partition: upper,
                        known_count: None,
                    });
                    stack.push(Pending {
                        partition: lower,
                        known_count: None,
                    });
                }
                Decision::Refine(finer) => {
                    engine_info!("{} -> {}, switching to {}", partition, count, finer);
                    sink.emit(HarvestEvent::Refining {
                        partition,
                        count,
                        finer,
                    });
                    stack.push(Pending {
                        partition: finer,
                        known_count: Some(count),
                    });
                }
                Decision::Unsplittable => {
                    return Err(HarvestError::Unsplittable {
                        filter,
                        partition,
                        count,
                    });
                }
            }
        }

        Ok(summary)
    }
}
