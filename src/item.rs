//! Items to be drilled
//!
//! An item is either a single image named by the caller or a catalogue item
//! found by search, whose raster assets are read individually.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::errors::{DrillError, DrillResult};

/// One raster to read: an asset id and the path or URL of its image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: String,
    pub href: String,
}

/// A single image chosen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    id: String,
    path: String,
}

impl ImageItem {
    /// Creates an image item; the id defaults to the path
    pub fn new(path: &str, id: Option<&str>) -> Self {
        ImageItem {
            id: id.filter(|i| !i.is_empty()).unwrap_or(path).to_string(),
            path: path.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// An item returned by a catalogue search
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub collection: Option<String>,
    /// Acquisition time
    pub datetime: Option<DateTime<Utc>>,
    /// WGS 84 bounds `[west, south, east, north]`
    pub bbox: Option<[f64; 4]>,
    /// Asset name to href
    pub assets: BTreeMap<String, String>,
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl CatalogItem {
    /// Creates an item with no properties
    pub fn new(id: &str, datetime: Option<DateTime<Utc>>) -> Self {
        CatalogItem {
            id: id.to_string(),
            collection: None,
            datetime,
            bbox: None,
            assets: BTreeMap::new(),
            properties: serde_json::Map::new(),
        }
    }

    /// Adds an asset
    pub fn with_asset(mut self, name: &str, href: &str) -> Self {
        self.assets.insert(name.to_string(), href.to_string());
        self
    }

    /// True if every named asset is present
    pub fn has_assets(&self, names: &[String]) -> bool {
        names.iter().all(|n| self.assets.contains_key(n))
    }
}

/// Something that can be drilled
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Image(ImageItem),
    Catalog(CatalogItem),
}

impl Item {
    /// Stable identifier used to key statistics
    pub fn id(&self) -> &str {
        match self {
            Item::Image(image) => image.id(),
            Item::Catalog(item) => &item.id,
        }
    }

    /// True for caller-supplied images
    pub fn is_image(&self) -> bool {
        matches!(self, Item::Image(_))
    }

    /// Acquisition time, known only for catalogue items
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Item::Image(_) => None,
            Item::Catalog(item) => item.datetime,
        }
    }

    /// Rasters to read, in order
    ///
    /// # Arguments
    /// * `asset_ids` - Asset selection; must be `None` for images and given
    ///   for catalogue items
    ///
    /// # Returns
    /// One asset for an image (named after the item), or the selected assets
    /// of a catalogue item. A catalogue item lacking a selected asset is a
    /// read error.
    pub fn assets(&self, asset_ids: Option<&[String]>) -> DrillResult<Vec<Asset>> {
        match (self, asset_ids) {
            (Item::Image(image), None) => Ok(vec![Asset {
                id: image.id().to_string(),
                href: image.path().to_string(),
            }]),
            (Item::Image(image), Some(_)) => Err(DrillError::Configuration(format!(
                "asset ids cannot be selected for image '{}'",
                image.id()
            ))),
            (Item::Catalog(item), Some(ids)) if !ids.is_empty() => ids
                .iter()
                .map(|id| {
                    item.assets
                        .get(id)
                        .map(|href| Asset { id: id.clone(), href: href.clone() })
                        .ok_or_else(|| DrillError::Read(format!("item '{}' has no asset '{}'", item.id, id)))
                })
                .collect(),
            (Item::Catalog(item), _) => Err(DrillError::Configuration(format!(
                "asset ids must be selected to read catalogue item '{}'",
                item.id
            ))),
        }
    }
}

impl From<ImageItem> for Item {
    fn from(image: ImageItem) -> Self {
        Item::Image(image)
    }
}

impl From<CatalogItem> for Item {
    fn from(item: CatalogItem) -> Self {
        Item::Catalog(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_item_defaults_id_to_path() {
        assert_eq!(ImageItem::new("/data/a.tif", None).id(), "/data/a.tif");
        assert_eq!(ImageItem::new("/data/a.tif", Some("a")).id(), "a");
    }

    #[test]
    fn test_image_assets() {
        let item = Item::from(ImageItem::new("a.tif", Some("img")));
        let assets = item.assets(None).unwrap();
        assert_eq!(assets, vec![Asset { id: "img".to_string(), href: "a.tif".to_string() }]);
        assert!(matches!(item.assets(Some(&["B02".to_string()])), Err(DrillError::Configuration(_))));
    }

    #[test]
    fn test_catalog_assets() {
        let item = Item::from(
            CatalogItem::new("S2A_1", None)
                .with_asset("B02", "https://host/B02.tif")
                .with_asset("B03", "https://host/B03.tif"),
        );
        let ids = vec!["B03".to_string(), "B02".to_string()];
        let assets = item.assets(Some(&ids)).unwrap();
        assert_eq!(assets[0].href, "https://host/B03.tif");
        assert_eq!(assets[1].id, "B02");

        assert!(matches!(item.assets(None), Err(DrillError::Configuration(_))));
        assert!(matches!(item.assets(Some(&["B08".to_string()])), Err(DrillError::Read(_))));
    }
}
