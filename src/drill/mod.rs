//! Drilling survey points through images and catalogue items
//!
//! `drill` associates points with items, then for each item reads every
//! point's region of interest and computes its statistics. Items are
//! independent of each other and may be processed on a thread pool; each
//! point's accumulator is locked while it is written.

pub mod association;
pub mod driller;
pub mod retry;

use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;

use crate::coordinate::AmbiguousBufferPolicy;
use crate::errors::{DrillError, DrillResult};
use crate::point::SurveyPoint;
use crate::raster::RasterOpener;
use crate::stac::CatalogSearch;
use crate::stats::{StdStat, UserStat};
use crate::utils::progress::ProgressTracker;

pub use association::{create_catalog_drillers, create_image_drillers, in_time_window, nearest_n, CatalogRequest};
pub use driller::{IgnoreValue, ItemDriller, ReadOptions};
pub use retry::with_retry;

/// Everything needed to drill a set of points
#[derive(Debug, Clone, Default)]
pub struct DrillRequest {
    /// Image paths or URLs drilled at every point
    pub images: Vec<String>,
    /// Ids for `images`; the paths are used when absent
    pub image_ids: Option<Vec<String>>,
    pub catalog: Option<CatalogRequest>,
    pub std_stats: Vec<StdStat>,
    pub user_stats: Vec<UserStat>,
    pub ignore: IgnoreValue,
    /// Process items on the rayon thread pool
    pub concurrent: bool,
    pub policy: AmbiguousBufferPolicy,
    /// Extra attempts for failed opens and reads
    pub read_retries: u32,
    /// Show a progress bar
    pub progress: bool,
}

impl DrillRequest {
    /// Checks the request before anything is read
    pub fn validate(&self) -> DrillResult<()> {
        if self.images.is_empty() && self.catalog.is_none() {
            return Err(DrillError::Configuration(
                "no images and no catalogue search were given".to_string(),
            ));
        }
        if let Some(catalog) = &self.catalog {
            if catalog.assets.is_empty() {
                return Err(DrillError::Configuration("catalogue search needs at least one asset".to_string()));
            }
        }
        if let IgnoreValue::PerAsset(values) = &self.ignore {
            if !self.images.is_empty() {
                return Err(DrillError::Configuration(
                    "a list of ignore values only applies to catalogue assets".to_string(),
                ));
            }
            let assets = self.catalog.as_ref().map(|c| c.assets.len()).unwrap_or(0);
            if values.len() != assets {
                return Err(DrillError::Configuration(format!(
                    "{} ignore values given for {} assets",
                    values.len(),
                    assets
                )));
            }
        }
        let mut names: Vec<&str> = self.std_stats.iter().map(|s| s.name()).collect();
        names.extend(self.user_stats.iter().map(|u| u.name()));
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != names.len() {
            return Err(DrillError::Configuration("statistic names must be unique".to_string()));
        }
        Ok(())
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions { policy: self.policy, retries: self.read_retries }
    }
}

/// Drills points through the requested images and catalogue items
///
/// # Arguments
/// * `points` - Survey points; results land in each point's accumulator
/// * `request` - Items, statistics and read settings
/// * `opener` - Opens raster hrefs
/// * `catalog` - Catalogue client, required when `request.catalog` is set
///
/// # Returns
/// The drillers that were run, so that their points can be reset and
/// drilled again. Read and reprojection failures are recorded per point;
/// configuration, catalogue and statistic errors are returned.
pub fn drill(
    points: &[Arc<SurveyPoint>],
    request: &DrillRequest,
    opener: &dyn RasterOpener,
    catalog: Option<&dyn CatalogSearch>,
) -> DrillResult<Vec<ItemDriller>> {
    request.validate()?;

    let mut drillers = create_image_drillers(points, &request.images, request.image_ids.as_deref())?;
    if let Some(catalog_request) = &request.catalog {
        let catalog = catalog.ok_or_else(|| {
            DrillError::Configuration("catalogue search requested without a catalogue client".to_string())
        })?;
        drillers.extend(create_catalog_drillers(points, catalog, catalog_request, request.policy)?);
    }
    if drillers.is_empty() {
        warn!("No items to drill for {} points", points.len());
        return Ok(drillers);
    }

    info!("Drilling {} items at {} points", drillers.len(), points.len());
    let progress = ProgressTracker::new(drillers.len() as u64, "Drilling items", request.progress);
    let options = request.read_options();
    let run = |driller: &ItemDriller| -> DrillResult<()> {
        driller.read_data(opener, &request.ignore, &options)?;
        driller.calc_stats(&request.std_stats, &request.user_stats)?;
        progress.increment(1);
        Ok(())
    };

    if request.concurrent {
        drillers.par_iter().try_for_each(run)?;
    } else {
        drillers.iter().try_for_each(run)?;
    }
    progress.finish();
    Ok(drillers)
}
