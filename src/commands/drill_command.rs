//! Drill command
//!
//! Reads survey points from CSV, drills them through the configured images
//! and catalogue items, and writes the statistics as JSON.

use std::fs;
use std::path::PathBuf;

use clap::ArgMatches;
use log::{debug, info};

use super::command_traits::Command;
use super::points_file::{read_points, stats_to_json};
use crate::api::PixDrill;
use crate::config::DrillConfig;
use crate::drill::IgnoreValue;
use crate::errors::{DrillError, DrillResult};
use crate::stats::StdStat;

/// Layers command-line flags over a file configuration
///
/// # Arguments
/// * `args` - CLI argument matches from clap
///
/// # Returns
/// The file configuration named by `--config` (or the defaults) with every
/// given flag applied on top
pub fn config_from_args(args: &ArgMatches) -> DrillResult<DrillConfig> {
    let mut config = match args.get_one::<String>("config") {
        Some(path) => DrillConfig::load(path.as_ref())?,
        None => DrillConfig::default(),
    };

    let strings = |id: &str| -> Vec<String> {
        args.get_many::<String>(id).map(|values| values.cloned().collect()).unwrap_or_default()
    };

    let images = strings("image");
    if !images.is_empty() {
        config.images = images;
    }
    let image_ids = strings("image-id");
    if !image_ids.is_empty() {
        config.image_ids = Some(image_ids);
    }
    if let Some(endpoint) = args.get_one::<String>("stac") {
        config.catalog.endpoint = Some(endpoint.clone());
    }
    let collections = strings("collection");
    if !collections.is_empty() {
        config.catalog.collections = collections;
    }
    let assets = strings("asset");
    if !assets.is_empty() {
        config.catalog.assets = assets;
    }
    let properties = strings("property");
    if !properties.is_empty() {
        config.catalog.properties = properties;
    }
    if let Some(n) = args.get_one::<String>("nearest-n") {
        config.catalog.nearest_n = parse_number(n, "nearest-n")?;
    }
    if let Some(ignore) = args.get_one::<String>("ignore") {
        config.read.ignore_value = Some(parse_ignore(ignore)?);
    }
    if let Some(retries) = args.get_one::<String>("retries") {
        config.read.retries = parse_number(retries, "retries")?;
    }
    if args.get_flag("concurrent") {
        config.read.concurrent = true;
    }
    if args.get_flag("progress") {
        config.read.progress = true;
    }
    if let Some(policy) = args.get_one::<String>("buffer-policy") {
        config.geometry.buffer_policy = policy.parse()?;
    }
    let stats = strings("stat");
    if !stats.is_empty() {
        config.stats.standard = stats.iter().map(|s| s.parse::<StdStat>()).collect::<DrillResult<_>>()?;
    }
    if let Some(file) = args.get_one::<String>("log-file") {
        config.logging.file = Some(PathBuf::from(file));
    }
    if let Some(level) = args.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }
    Ok(config)
}

fn parse_number<T: std::str::FromStr>(value: &str, flag: &str) -> DrillResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DrillError::Configuration(format!("Invalid value for --{}: {}", flag, value)))
}

/// Parses `--ignore`: one value, or a comma-separated value per asset
fn parse_ignore(value: &str) -> DrillResult<IgnoreValue> {
    let values = value
        .split(',')
        .map(|v| parse_number::<f64>(v, "ignore"))
        .collect::<DrillResult<Vec<f64>>>()?;
    match values.as_slice() {
        [single] if !value.contains(',') => Ok(IgnoreValue::Single(*single)),
        _ => Ok(IgnoreValue::PerAsset(values)),
    }
}

/// Command that drills points and writes their statistics
pub struct DrillCommand {
    points_file: PathBuf,
    output_file: Option<PathBuf>,
    config: DrillConfig,
}

impl DrillCommand {
    /// Create a new drill command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Configuration with the flags already applied
    ///
    /// # Returns
    /// A new DrillCommand instance or an error
    pub fn new(args: &ArgMatches, config: DrillConfig) -> DrillResult<Self> {
        let points_file = args
            .get_one::<String>("points")
            .map(PathBuf::from)
            .ok_or_else(|| DrillError::Configuration("Missing --points file".to_string()))?;
        let output_file = args.get_one::<String>("output").map(PathBuf::from);
        debug!("Drill command: points {}, output {:?}", points_file.display(), output_file);

        Ok(DrillCommand { points_file, output_file, config })
    }
}

impl Command for DrillCommand {
    fn execute(&self) -> DrillResult<()> {
        let request = self.config.to_request()?;
        let points = read_points(&self.points_file)?;

        PixDrill::from_config(&self.config).drill(&points, &request)?;

        let json = serde_json::to_string_pretty(&stats_to_json(&points))
            .map_err(|e| DrillError::Configuration(format!("Cannot encode statistics: {}", e)))?;
        match &self.output_file {
            Some(path) => {
                fs::write(path, json)?;
                info!("Wrote statistics for {} points to {}", points.len(), path.display());
            }
            None => println!("{}", json),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignore() {
        assert_eq!(parse_ignore("0").unwrap(), IgnoreValue::Single(0.0));
        assert_eq!(parse_ignore("0,-9999").unwrap(), IgnoreValue::PerAsset(vec![0.0, -9999.0]));
        assert!(parse_ignore("none").is_err());
    }
}
