//! STAC item search wire types
//!
//! Only the parts of the STAC API needed for drilling are modelled: the
//! search body, the returned feature collection with its paging links, and
//! item assets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::item::CatalogItem;

/// Body of `POST /search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchBody {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub collections: Vec<String>,
    /// `[west, south, east, north]` in WGS 84
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    /// `start/end` in RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    /// Query extension filters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Paging fields supplied by a `next` link
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of search results
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl FeatureCollection {
    /// The `next` paging link, if any
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }
}

/// A link between STAC resources
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    /// HTTP method; GET when absent
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<Map<String, Value>>,
    /// Whether `body` is merged into the previous request
    #[serde(default)]
    pub merge: bool,
}

/// A STAC item as returned by search
#[derive(Debug, Clone, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
}

/// A single asset of an item
#[derive(Debug, Clone, Deserialize)]
pub struct StacAsset {
    pub href: String,
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
}

impl StacItem {
    /// Acquisition time from the `datetime` property
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        let raw = self.properties.get("datetime")?.as_str()?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                warn!("Item '{}' has unparseable datetime '{}': {}", self.id, raw, e);
                None
            }
        }
    }

    /// Converts to the drill loop's catalogue item
    pub fn into_catalog_item(self) -> CatalogItem {
        let datetime = self.datetime();
        let bbox = self
            .bbox
            .as_deref()
            .and_then(|b| match b {
                [w, s, e, n] => Some([*w, *s, *e, *n]),
                // 3D bounds
                [w, s, _, e, n, _] => Some([*w, *s, *e, *n]),
                _ => None,
            });
        CatalogItem {
            id: self.id,
            collection: self.collection,
            datetime,
            bbox,
            assets: self.assets.into_iter().map(|(name, asset)| (name, asset.href)).collect(),
            properties: self.properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
      "type": "FeatureCollection",
      "features": [{
        "type": "Feature",
        "id": "S2B_55HBU_20210612_0_L2A",
        "collection": "sentinel-s2-l2a-cogs",
        "bbox": [144.0, -38.0, 145.2, -37.0],
        "properties": {"datetime": "2021-06-12T00:07:41Z", "eo:cloud_cover": 3.1},
        "assets": {
          "B02": {"href": "https://example.com/B02.tif", "type": "image/tiff; application=geotiff"},
          "thumbnail": {"href": "https://example.com/preview.jpg"}
        }
      }],
      "links": [{"rel": "next", "href": "https://example.com/search", "method": "POST", "body": {"next": "abc"}}]
    }"#;

    #[test]
    fn test_parse_page() {
        let page: FeatureCollection = serde_json::from_str(PAGE).unwrap();
        let next = page.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert!(!next.merge);

        let item = page.features[0].clone().into_catalog_item();
        assert_eq!(item.id, "S2B_55HBU_20210612_0_L2A");
        assert_eq!(item.bbox, Some([144.0, -38.0, 145.2, -37.0]));
        assert_eq!(item.assets["B02"], "https://example.com/B02.tif");
        assert_eq!(item.datetime.unwrap().to_rfc3339(), "2021-06-12T00:07:41+00:00");
    }

    #[test]
    fn test_search_body_omits_unset() {
        let body = SearchBody { limit: Some(500), ..Default::default() };
        assert_eq!(serde_json::to_value(&body).unwrap(), serde_json::json!({"limit": 500}));
    }
}
