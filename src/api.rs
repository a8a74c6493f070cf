//! Library entry point
//!
//! `PixDrill` ties together the raster opener, the catalogue client and
//! the drill loop.

use std::sync::Arc;

use log::info;

use crate::config::DrillConfig;
use crate::drill::{self, DrillRequest, ItemDriller};
use crate::errors::{DrillError, DrillResult};
use crate::point::SurveyPoint;
use crate::raster::{GeoTiffOpener, RasterOpener};
use crate::stac::{CatalogSearch, StacClient, StacClientOptions};

/// Main interface to the pixdrill library
pub struct PixDrill {
    opener: Box<dyn RasterOpener>,
    catalog: Option<Box<dyn CatalogSearch>>,
    client_options: StacClientOptions,
}

impl Default for PixDrill {
    fn default() -> Self {
        Self::new()
    }
}

impl PixDrill {
    /// Creates a driller that reads GeoTIFF files and URLs
    pub fn new() -> Self {
        PixDrill {
            opener: Box::new(GeoTiffOpener),
            catalog: None,
            client_options: StacClientOptions::default(),
        }
    }

    /// Replaces the raster opener
    pub fn with_opener<O: RasterOpener + 'static>(mut self, opener: O) -> Self {
        self.opener = Box::new(opener);
        self
    }

    /// Uses a catalogue client instead of one built from the request endpoint
    pub fn with_catalog<C: CatalogSearch + 'static>(mut self, catalog: C) -> Self {
        self.catalog = Some(Box::new(catalog));
        self
    }

    /// Options for STAC clients built from a request endpoint
    pub fn with_client_options(mut self, options: StacClientOptions) -> Self {
        self.client_options = options;
        self
    }

    /// Creates a driller configured from a drill configuration
    pub fn from_config(config: &DrillConfig) -> Self {
        Self::new().with_client_options(config.catalog.client_options())
    }

    /// Drills points through the requested images and catalogue items
    ///
    /// # Arguments
    /// * `points` - Survey points; statistics land in each point's accumulator
    /// * `request` - Items, statistics and read settings
    ///
    /// # Returns
    /// The drillers that were run, or the first configuration, catalogue or
    /// statistic error
    pub fn drill(&self, points: &[Arc<SurveyPoint>], request: &DrillRequest) -> DrillResult<Vec<ItemDriller>> {
        request.validate()?;

        let built;
        let catalog: Option<&dyn CatalogSearch> = match (&self.catalog, &request.catalog) {
            (Some(catalog), _) => Some(catalog.as_ref()),
            (None, Some(catalog_request)) => {
                let endpoint = catalog_request.endpoint.as_deref().ok_or_else(|| {
                    DrillError::Configuration("catalogue search needs an endpoint".to_string())
                })?;
                info!("Searching STAC endpoint {}", endpoint);
                built = StacClient::new(endpoint, self.client_options.clone())?;
                Some(&built)
            }
            (None, None) => None,
        };

        drill::drill(points, request, self.opener.as_ref(), catalog)
    }
}
