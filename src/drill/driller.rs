//! Point groups per item
//!
//! An `ItemDriller` holds one item and the survey points associated with
//! it. Reading opens each selected asset once and reads the region of
//! interest of every point; computing statistics then runs each point's
//! accumulator over what was read.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::retry::with_retry;
use crate::coordinate::{AmbiguousBufferPolicy, Footprint};
use crate::errors::{DrillError, DrillResult};
use crate::extractor::{pixel_window, read_roi, ArrayInfo};
use crate::item::Item;
use crate::point::SurveyPoint;
use crate::raster::{RasterDataset, RasterOpener};
use crate::stats::{StdStat, UserStat};

/// Pixel values to exclude from statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum IgnoreValue {
    /// Use each band's no-data value
    #[default]
    FromImage,
    /// One value for every asset
    Single(f64),
    /// One value per selected catalogue asset, in asset order
    PerAsset(Vec<f64>),
}

impl IgnoreValue {
    /// Override for each asset of an item
    ///
    /// # Returns
    /// One entry per asset, `None` where the image's no-data applies. A
    /// per-asset list is rejected for images and when its length differs
    /// from the number of assets.
    pub fn per_asset(&self, item: &Item, asset_count: usize) -> DrillResult<Vec<Option<f64>>> {
        match self {
            IgnoreValue::FromImage => Ok(vec![None; asset_count]),
            IgnoreValue::Single(v) => Ok(vec![Some(*v); asset_count]),
            IgnoreValue::PerAsset(_) if item.is_image() => Err(DrillError::Configuration(
                "a list of ignore values only applies to catalogue assets".to_string(),
            )),
            IgnoreValue::PerAsset(values) if values.len() != asset_count => Err(DrillError::Configuration(format!(
                "{} ignore values given for {} assets",
                values.len(),
                asset_count
            ))),
            IgnoreValue::PerAsset(values) => Ok(values.iter().map(|v| Some(*v)).collect()),
        }
    }
}

/// Settings for reading an item's rasters
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub policy: AmbiguousBufferPolicy,
    /// Extra attempts for failed opens and reads
    pub retries: u32,
}

/// One item and the points to drill it at
#[derive(Debug, Clone)]
pub struct ItemDriller {
    item: Item,
    points: Vec<Arc<SurveyPoint>>,
    asset_ids: Option<Vec<String>>,
}

impl ItemDriller {
    /// Creates a driller with no points
    ///
    /// Asset ids must be omitted for images and given for catalogue items.
    pub fn new(item: Item, asset_ids: Option<Vec<String>>) -> DrillResult<Self> {
        let mut driller = ItemDriller { item, points: Vec::new(), asset_ids: None };
        driller.set_asset_ids(asset_ids)?;
        Ok(driller)
    }

    /// Selects the assets to read
    pub fn set_asset_ids(&mut self, asset_ids: Option<Vec<String>>) -> DrillResult<()> {
        match (&self.item, &asset_ids) {
            (Item::Image(_), Some(_)) => {
                return Err(DrillError::Configuration(format!(
                    "asset ids cannot be selected for image '{}'",
                    self.item.id()
                )))
            }
            (Item::Catalog(_), None) => {
                return Err(DrillError::Configuration(format!(
                    "asset ids must be selected for catalogue item '{}'",
                    self.item.id()
                )))
            }
            (Item::Catalog(_), Some(ids)) if ids.is_empty() => {
                return Err(DrillError::Configuration(format!(
                    "asset ids must be selected for catalogue item '{}'",
                    self.item.id()
                )))
            }
            _ => {}
        }
        self.asset_ids = asset_ids;
        Ok(())
    }

    pub fn add_point(&mut self, point: Arc<SurveyPoint>) {
        self.points.push(point);
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn points(&self) -> &[Arc<SurveyPoint>] {
        &self.points
    }

    pub fn asset_ids(&self) -> Option<&[String]> {
        self.asset_ids.as_deref()
    }

    /// Reads every selected asset at every point
    ///
    /// Each asset is opened once. A point whose footprint cannot be built or
    /// lies outside an asset, or whose read fails, is recorded as failed for
    /// this item and keeps none of its arrays; other points are unaffected.
    ///
    /// # Arguments
    /// * `opener` - Opens asset hrefs
    /// * `ignore` - No-data override
    /// * `options` - Buffer policy and retry count
    ///
    /// # Returns
    /// `true` if every point was read from every asset
    pub fn read_data(&self, opener: &dyn RasterOpener, ignore: &IgnoreValue, options: &ReadOptions) -> DrillResult<bool> {
        let item_id = self.item.id();
        if self.points.is_empty() {
            return Ok(true);
        }

        let assets = match self.item.assets(self.asset_ids()) {
            Ok(assets) => assets,
            Err(e) if e.is_recoverable() => {
                self.record_failures(&vec![Some(e.to_string()); self.points.len()]);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let ignore_values = ignore.per_asset(&self.item, assets.len())?;
        debug!("Reading {} assets of '{}' at {} points", assets.len(), item_id, self.points.len());

        let mut arrays: Vec<Vec<ArrayInfo>> = vec![Vec::new(); self.points.len()];
        let mut failures: Vec<Option<String>> = vec![None; self.points.len()];

        for (asset, ignore_value) in assets.iter().zip(ignore_values) {
            let what = format!("open '{}'", asset.href);
            let mut dataset = match with_retry(options.retries, &what, || opener.open(&asset.href)) {
                Ok(dataset) => dataset,
                Err(e) if e.is_recoverable() => {
                    for failure in failures.iter_mut().filter(|f| f.is_none()) {
                        *failure = Some(format!("asset '{}': {}", asset.id, e));
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            for (index, point) in self.points.iter().enumerate() {
                if failures[index].is_some() {
                    continue;
                }
                match self.read_point(dataset.as_mut(), &asset.id, ignore_value, point, options) {
                    Ok(array) => arrays[index].push(array),
                    Err(e) if e.is_recoverable() => {
                        failures[index] = Some(format!("asset '{}': {}", asset.id, e));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        for ((point, point_arrays), failure) in self.points.iter().zip(arrays).zip(&failures) {
            if failure.is_none() {
                let mut stats = point.stats();
                for array in point_arrays {
                    stats.store_array(item_id, array);
                }
            }
        }
        self.record_failures(&failures);

        let failed = failures.iter().filter(|f| f.is_some()).count();
        info!("Read '{}' at {} of {} points", item_id, self.points.len() - failed, self.points.len());
        Ok(failed == 0)
    }

    fn read_point(
        &self,
        dataset: &mut dyn RasterDataset,
        asset_id: &str,
        ignore_value: Option<f64>,
        point: &SurveyPoint,
        options: &ReadOptions,
    ) -> DrillResult<ArrayInfo> {
        let info = dataset.info().clone();
        let footprint = Footprint::new(&point.buffered(), info.crs, options.policy)?;
        if pixel_window(&info, &footprint).is_none() {
            return Err(DrillError::Read(format!(
                "region of interest of point '{}' lies outside '{}'",
                point.id(),
                asset_id
            )));
        }
        let what = format!("read '{}' at point '{}'", asset_id, point.id());
        with_retry(options.retries, &what, || {
            read_roi(&mut *dataset, asset_id, &footprint, point.shape(), ignore_value)
        })
    }

    fn record_failures(&self, failures: &[Option<String>]) {
        for (point, failure) in self.points.iter().zip(failures) {
            if let Some(reason) = failure {
                warn!("Point '{}' not read from '{}': {}", point.id(), self.item.id(), reason);
                point.stats().record_failure(self.item.id(), reason);
            }
        }
    }

    /// Computes statistics for every point from the arrays read
    ///
    /// Standard statistics over multi-band arrays are skipped with a
    /// warning; every other error stops the run.
    pub fn calc_stats(&self, std_stats: &[StdStat], user_stats: &[UserStat]) -> DrillResult<()> {
        for point in &self.points {
            match point.calc_stats(&self.item, std_stats, user_stats) {
                Err(e @ DrillError::UnsupportedBandCount { .. }) => {
                    warn!("No standard statistics for point '{}' in '{}': {}", point.id(), self.item.id(), e);
                }
                other => other?,
            }
        }
        Ok(())
    }

    /// Clears the accumulators of every point
    pub fn reset_stats(&self) {
        for point in &self.points {
            point.reset_stats();
        }
    }
}
