//! Drill configuration files
//!
//! A run can be described in TOML:
//!
//! ```toml
//! [catalog]
//! endpoint = "https://earth-search.aws.element84.com/v1"
//! collections = ["sentinel-2-l2a"]
//! assets = ["blue", "green"]
//! nearest_n = 1
//! properties = ["eo:cloud_cover<=20"]
//!
//! [read]
//! ignore_value = 0
//! concurrent = true
//!
//! [stats]
//! standard = ["mean", "stddev", "count"]
//! ```
//!
//! Every field has a default, so an empty file is valid.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::{debug, LevelFilter};
use serde::{Deserialize, Serialize};

use crate::coordinate::AmbiguousBufferPolicy;
use crate::drill::{CatalogRequest, DrillRequest, IgnoreValue};
use crate::errors::{DrillError, DrillResult};
use crate::stac::{parse_filters, StacClientOptions, DEFAULT_PAGE_LIMIT};
use crate::stats::StdStat;

/// `[catalog]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint: Option<String>,
    pub collections: Vec<String>,
    pub assets: Vec<String>,
    /// Items nearest in time kept per point; 0 keeps all
    pub nearest_n: usize,
    /// Property filters such as `eo:cloud_cover<=20`
    pub properties: Vec<String>,
    pub page_limit: u32,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            endpoint: None,
            collections: Vec::new(),
            assets: Vec::new(),
            nearest_n: 0,
            properties: Vec::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout_secs: 60,
            retries: 3,
        }
    }
}

impl CatalogConfig {
    /// Options for the STAC client
    pub fn client_options(&self) -> StacClientOptions {
        StacClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.retries,
            page_limit: self.page_limit,
        }
    }

    fn is_set(&self) -> bool {
        self.endpoint.is_some() || !self.collections.is_empty() || !self.assets.is_empty()
    }
}

/// `[read]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// A single value, a list with one value per asset, or unset to use
    /// the images' no-data values
    pub ignore_value: Option<IgnoreValue>,
    pub retries: u32,
    pub concurrent: bool,
    pub progress: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        ReadConfig {
            ignore_value: None,
            retries: 2,
            concurrent: false,
            progress: false,
        }
    }
}

/// `[geometry]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    pub buffer_policy: AmbiguousBufferPolicy,
}

/// `[stats]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub standard: Vec<StdStat>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig { standard: StdStat::ALL.to_vec() }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { file: None, level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> DrillResult<LevelFilter> {
        LevelFilter::from_str(&self.level)
            .map_err(|_| DrillError::Configuration(format!("Unknown log level: {}", self.level)))
    }
}

/// A complete drill configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillConfig {
    pub images: Vec<String>,
    pub image_ids: Option<Vec<String>>,
    pub catalog: CatalogConfig,
    pub read: ReadConfig,
    pub geometry: GeometryConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

impl DrillConfig {
    /// Parses a TOML document
    pub fn from_toml(content: &str) -> DrillResult<Self> {
        toml::from_str(content).map_err(|e| DrillError::Configuration(format!("Invalid configuration: {}", e)))
    }

    /// Reads a TOML file
    pub fn load(path: &Path) -> DrillResult<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Builds the drill request described by this configuration
    ///
    /// User statistics cannot be configured in a file; add them to the
    /// returned request.
    pub fn to_request(&self) -> DrillResult<DrillRequest> {
        let catalog = if self.catalog.is_set() {
            Some(CatalogRequest {
                endpoint: self.catalog.endpoint.clone(),
                collections: self.catalog.collections.clone(),
                assets: self.catalog.assets.clone(),
                nearest_n: self.catalog.nearest_n,
                filters: parse_filters(&self.catalog.properties)?,
            })
        } else {
            None
        };

        let request = DrillRequest {
            images: self.images.clone(),
            image_ids: self.image_ids.clone(),
            catalog,
            std_stats: self.stats.standard.clone(),
            user_stats: Vec::new(),
            ignore: self.read.ignore_value.clone().unwrap_or_default(),
            concurrent: self.read.concurrent,
            policy: self.geometry.buffer_policy,
            read_retries: self.read.retries,
            progress: self.read.progress,
        };
        request.validate()?;
        Ok(request)
    }
}
