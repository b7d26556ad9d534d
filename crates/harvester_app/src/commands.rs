use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use engine_logging::engine_info;
use harvester_core::{DayRange, Partition, StarRange};
use harvester_engine::{
    ensure_output_dir, merge_artifacts, read_repo_table, scrape_all, write_file_atomically,
    write_h_index_table, write_repo_table, ArtifactStore, GraphQlSearch, HarvestSummary,
    Harvester, ReqwestExecutor, H_INDEX_FILENAME, REPO_TABLE_FILENAME,
};

use crate::config::HarvestConfig;
use crate::progress::LogProgress;

pub fn star_seed(range: StarRange) -> Vec<Partition> {
    vec![Partition::by_stars(range)]
}

/// Star-range seeds from a JSON array of descending breakpoints.
pub fn breaks_seeds(file: &Path) -> anyhow::Result<Vec<Partition>> {
    let content =
        fs::read(file).with_context(|| format!("reading breakpoints {}", file.display()))?;
    let breaks: Vec<u64> = serde_json::from_slice(&content)
        .with_context(|| format!("{} is not a JSON array of star counts", file.display()))?;
    let ranges = StarRange::from_breaks(&breaks)
        .with_context(|| format!("breakpoints in {} must be descending", file.display()))?;
    Ok(ranges.into_iter().map(Partition::by_stars).collect())
}

pub fn day_seed(stars: StarRange, from: NaiveDate, to: NaiveDate) -> anyhow::Result<Vec<Partition>> {
    let days = DayRange::new(from, to).context("invalid day window")?;
    Ok(vec![Partition::by_days(stars, days)])
}

pub async fn harvest(
    config: &HarvestConfig,
    seeds: &[Partition],
) -> anyhow::Result<HarvestSummary> {
    ensure_output_dir(&config.output_dir)?;
    let executor = ReqwestExecutor::new(config.executor_settings(config.token()?))?;
    let harvester = Harvester::new(
        GraphQlSearch::new(executor),
        config.split_policy()?,
        config.pagination(),
        ArtifactStore::new(config.output_dir.clone(), config.cooldown()),
    );
    engine_info!(
        "Harvesting {} seed(s) into {:?}",
        seeds.len(),
        config.output_dir
    );
    let summary = harvester.run(seeds, &LogProgress).await?;
    Ok(summary)
}

pub fn print_summary(summary: &HarvestSummary) {
    println!(
        "written: {}, skipped: {}, records: {}, probes: {}",
        summary.written, summary.skipped, summary.records, summary.probes
    );
    if !summary.truncated.is_empty() {
        println!("truncated (rate limit), delete to re-fetch:");
        for artifact in &summary.truncated {
            println!("  {artifact}");
        }
    }
}

pub async fn scrape(
    config: &HarvestConfig,
    query_file: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let query = fs::read_to_string(query_file)
        .with_context(|| format!("reading query {}", query_file.display()))?;
    let executor = ReqwestExecutor::new(config.executor_settings(config.token()?))?;
    let result = scrape_all(&executor, &query, config.min_remaining).await?;
    engine_info!("Scraped {} nodes", result.nodes.len());

    let json = serde_json::to_string(&result)?;
    match output {
        Some(path) => {
            write_file_atomically(path, json)?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub fn table(config: &HarvestConfig, output: Option<PathBuf>) -> anyhow::Result<()> {
    let rows = merge_artifacts(&config.output_dir)
        .with_context(|| format!("merging artifacts in {}", config.output_dir.display()))?;
    let path = output.unwrap_or_else(|| config.output_dir.join(REPO_TABLE_FILENAME));
    write_repo_table(&path, &rows)?;
    println!("{} repositories -> {}", rows.len(), path.display());
    Ok(())
}

pub fn h_index(
    config: &HarvestConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    min_h_index: usize,
) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| config.output_dir.join(REPO_TABLE_FILENAME));
    let output = output.unwrap_or_else(|| config.output_dir.join(H_INDEX_FILENAME));
    let rows = read_repo_table(&input)
        .with_context(|| format!("reading repository table {}", input.display()))?;
    let ranks = write_h_index_table(&output, &rows, min_h_index)?;
    println!(
        "{} owners with h-index >= {} -> {}",
        ranks.len(),
        min_h_index,
        output.display()
    );
    Ok(())
}
