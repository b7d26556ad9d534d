//! Run configuration: an optional RON file with per-field defaults, then
//! command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Datelike, Utc};
use engine_logging::engine_info;
use harvester_core::{SplitPolicy, YearRange, RESULT_CAP};
use harvester_engine::{ExecutorSettings, PaginationSettings, GITHUB_GRAPHQL_ENDPOINT};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "harvester.ron";
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarvestConfig {
    pub endpoint: String,
    pub token_file: PathBuf,
    pub output_dir: PathBuf,
    pub page_size: u32,
    pub min_remaining: u64,
    pub result_cap: u64,
    pub cooldown_ms: u64,
    pub first_year: i32,
    /// Changing this moves the era edge and therefore the artifact names of
    /// partitions refined by creation date.
    pub last_year: i32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_response_bytes: u64,
    pub user_agent: Option<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            endpoint: GITHUB_GRAPHQL_ENDPOINT.to_string(),
            token_file: PathBuf::from(".token"),
            output_dir: PathBuf::from("responses"),
            page_size: 100,
            min_remaining: 10,
            result_cap: RESULT_CAP,
            cooldown_ms: 4000,
            first_year: 2007,
            last_year: Utc::now().year(),
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            max_response_bytes: 16 * 1024 * 1024,
            user_agent: None,
        }
    }
}

impl HarvestConfig {
    /// Reads `path`, or `./harvester.ron` when no path is given.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILENAME), false),
        };
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()));
            }
        };
        let config = Self::parse(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        engine_info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.page_size == 0 || self.page_size > 100 {
            bail!("page_size must be between 1 and 100, got {}", self.page_size);
        }
        if self.result_cap == 0 {
            bail!("result_cap must be positive");
        }
        self.era()?;
        Ok(())
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        self
    }

    /// Years whose edges are searched open-ended.
    pub fn era(&self) -> anyhow::Result<YearRange> {
        YearRange::new(self.first_year, self.last_year).with_context(|| {
            format!(
                "invalid era first_year={} last_year={}",
                self.first_year, self.last_year
            )
        })
    }

    pub fn split_policy(&self) -> anyhow::Result<SplitPolicy> {
        Ok(SplitPolicy::new(self.era()?).with_cap(self.result_cap))
    }

    pub fn pagination(&self) -> PaginationSettings {
        PaginationSettings {
            page_size: self.page_size,
            min_remaining: self.min_remaining,
            result_cap: self.result_cap,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn executor_settings(&self, token: String) -> ExecutorSettings {
        let mut settings = ExecutorSettings::new(self.endpoint.clone(), token);
        settings.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        settings.request_timeout = Duration::from_secs(self.request_timeout_secs);
        settings.max_bytes = self.max_response_bytes;
        if let Some(user_agent) = &self.user_agent {
            settings.user_agent = user_agent.clone();
        }
        settings
    }

    /// The API token from `GITHUB_TOKEN`, falling back to the token file.
    pub fn token(&self) -> anyhow::Result<String> {
        resolve_token(std::env::var(TOKEN_ENV_VAR).ok(), &self.token_file)
    }
}

fn resolve_token(from_env: Option<String>, token_file: &Path) -> anyhow::Result<String> {
    if let Some(token) = from_env.map(|t| t.trim().to_string()) {
        if !token.is_empty() {
            return Ok(token);
        }
    }
    let token = fs::read_to_string(token_file)
        .with_context(|| {
            format!(
                "no {TOKEN_ENV_VAR} set and token file {} is unreadable",
                token_file.display()
            )
        })?
        .trim()
        .to_string();
    if token.is_empty() {
        bail!("token file {} is empty", token_file.display());
    }
    Ok(token)
}
