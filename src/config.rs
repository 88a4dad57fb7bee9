use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::core::matcher::{ScoreWeights, SPREAD};
use crate::core::ranker::DEFAULT_APPLICATION_BIAS;
use crate::core::session::Settings;
use crate::error::LauncherResult;
use crate::services::desktop_entries::DesktopEntryReader;
use crate::services::disk_cache::DiskCache;
use crate::services::path_executables::PathExecutableReader;
use crate::services::sources::{ItemSource, Sources};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    /// Also match against (and show) item descriptions
    pub show_descriptions: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Bonus added to applications over bare commands
    pub application_bias: u32,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub timeout_secs: u64,
    pub startup_timeout_ms: u64,
    /// Keep a copy of the item list on disk between runs
    pub disk_cache: bool,
    pub disk_cache_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub desktop_entries: bool,
    pub path_executables: bool,
    /// Additional directories searched for .desktop files (`~` allowed)
    pub extra_application_dirs: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 50,
            show_descriptions: true,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            application_bias: DEFAULT_APPLICATION_BIAS,
            weights: ScoreWeights::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            startup_timeout_ms: 2000,
            disk_cache: true,
            disk_cache_path: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            desktop_entries: true,
            path_executables: true,
            extra_application_dirs: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("rufi")
            .join("config.toml")
    }

    /// Load config from the default path, or return defaults if it is
    /// missing or broken
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, path = %path.display(), "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load and validate config from `path`
    pub fn load_from(path: &Path) -> LauncherResult<Self> {
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate();
        Ok(config)
    }

    /// Clamp values to acceptable ranges
    pub fn validate(&mut self) {
        self.search.max_results = self.search.max_results.clamp(1, 500);
        self.cache.timeout_secs = self.cache.timeout_secs.max(1);
        self.cache.startup_timeout_ms = self.cache.startup_timeout_ms.clamp(100, 60_000);

        // A larger bias could lift an application over a stronger layer
        self.scoring.application_bias = self.scoring.application_bias.min(SPREAD);

        if let Err(reason) = self.scoring.weights.validate() {
            warn!(%reason, "invalid score weights, using defaults");
            self.scoring.weights = ScoreWeights::default();
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> LauncherResult<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> LauncherResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The tunables used by the search session and item cache
    pub fn settings(&self) -> Settings {
        Settings {
            cache_timeout: Duration::from_secs(self.cache.timeout_secs),
            max_results: self.search.max_results,
            show_descriptions: self.search.show_descriptions,
            application_bias: self.scoring.application_bias,
            startup_timeout: Duration::from_millis(self.cache.startup_timeout_ms),
            weights: self.scoring.weights,
        }
    }

    /// Extra application dirs with `~` and variables expanded
    pub fn extra_application_dirs(&self) -> Vec<PathBuf> {
        self.sources
            .extra_application_dirs
            .iter()
            .map(|dir| expand_path(dir))
            .collect()
    }

    /// The enabled source readers, in precedence order
    pub fn sources(&self) -> Sources {
        let mut readers: Vec<Arc<dyn ItemSource>> = Vec::new();

        if self.sources.desktop_entries {
            let extra = self.extra_application_dirs();
            readers.push(Arc::new(DesktopEntryReader::from_env(&extra)));
        }

        if self.sources.path_executables {
            match PathExecutableReader::from_env() {
                Ok(reader) => readers.push(Arc::new(reader)),
                Err(error) => warn!(%error, "skipping path executables"),
            }
        }

        Sources::new(readers)
    }

    /// The on-disk item cache, unless disabled
    pub fn disk_cache(&self) -> Option<DiskCache> {
        if !self.cache.disk_cache {
            return None;
        }

        match &self.cache.disk_cache_path {
            Some(path) => Some(DiskCache::new(expand_path(path))),
            None => DiskCache::default_path().map(DiskCache::new),
        }
    }
}

/// Expand `~` and environment variables; leaves the path as is on failure
fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(error) => {
            warn!(%error, path, "could not expand path");
            PathBuf::from(shellexpand::tilde(path).into_owned())
        }
    }
}
