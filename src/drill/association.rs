//! Point to item association
//!
//! Images chosen by the caller are associated with every point. Catalogue
//! items are found per point by a spatio-temporal search, optionally cut
//! down to the items nearest in time, and grouped so that each item is
//! read once for all of its points.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::driller::ItemDriller;
use crate::coordinate::{AmbiguousBufferPolicy, BoundingBox, CoordinateSystem, Footprint};
use crate::errors::{DrillError, DrillResult};
use crate::item::{CatalogItem, ImageItem, Item};
use crate::point::SurveyPoint;
use crate::stac::{build_query, CatalogSearch, PropertyFilter, SearchRequest};

/// Catalogue search parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogRequest {
    /// STAC API root; needed only when no catalogue client is supplied
    pub endpoint: Option<String>,
    pub collections: Vec<String>,
    /// Assets to read from every item
    pub assets: Vec<String>,
    /// Keep only the n items nearest in time to each point; 0 keeps all
    pub nearest_n: usize,
    pub filters: Vec<PropertyFilter>,
}

/// Seconds between an item's acquisition and a survey time
fn time_distance(item: &CatalogItem, time: DateTime<Utc>) -> Option<i64> {
    item.datetime.map(|t| (t - time).num_seconds().abs())
}

/// Keeps the `n` items nearest in time, ties in catalogue order
///
/// Items without a datetime sort after all others. `n == 0` keeps every
/// item.
pub fn nearest_n(mut items: Vec<CatalogItem>, time: DateTime<Utc>, n: usize) -> Vec<CatalogItem> {
    if n == 0 {
        return items;
    }
    items.sort_by_key(|item| match time_distance(item, time) {
        Some(seconds) => (false, seconds),
        None => (true, 0),
    });
    items.truncate(n);
    items
}

/// True if the item was acquired within the point's window
///
/// Items without a datetime are kept.
pub fn in_time_window(item: &CatalogItem, point: &SurveyPoint) -> bool {
    match item.datetime {
        Some(t) => t >= point.start_date() && t <= point.end_date(),
        None => true,
    }
}

/// Area to search around a point, in WGS 84
///
/// A footprint crossing the antimeridian gives a box extending past
/// +/-180 degrees; it is not split into two boxes, so items on the far side
/// may be missed.
fn search_bbox(point: &SurveyPoint, policy: AmbiguousBufferPolicy) -> BoundingBox {
    match Footprint::new(&point.buffered(), CoordinateSystem::WGS84, policy) {
        Ok(footprint) => footprint.bbox(),
        Err(e) => {
            warn!("Searching at the centre of point '{}' only: {}", point.id(), e);
            let (lon, lat) = point.lonlat();
            BoundingBox::around(lon, lat, 0.0)
        }
    }
}

/// One driller per image, each holding every point
///
/// # Arguments
/// * `points` - Survey points
/// * `images` - Image paths or URLs
/// * `image_ids` - Optional ids, one per image and unique; paths otherwise
pub fn create_image_drillers(
    points: &[Arc<SurveyPoint>],
    images: &[String],
    image_ids: Option<&[String]>,
) -> DrillResult<Vec<ItemDriller>> {
    if let Some(ids) = image_ids {
        let unique: HashSet<&String> = ids.iter().collect();
        if ids.len() != images.len() || unique.len() != ids.len() {
            return Err(DrillError::Configuration(
                "the number of image ids must equal the number of images and each id must be unique".to_string(),
            ));
        }
    }

    images
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let id = image_ids.map(|ids| ids[i].as_str());
            let mut driller = ItemDriller::new(Item::from(ImageItem::new(path, id)), None)?;
            for point in points {
                driller.add_point(Arc::clone(point));
            }
            Ok(driller)
        })
        .collect()
}

/// Searches the catalogue for every point and groups points by item
///
/// # Arguments
/// * `points` - Survey points
/// * `catalog` - Catalogue to search
/// * `request` - Collections, assets, filters and nearest-n limit
/// * `policy` - Buffer policy used to size each point's search area
///
/// # Returns
/// One driller per item found, in the order items were first found
pub fn create_catalog_drillers(
    points: &[Arc<SurveyPoint>],
    catalog: &dyn CatalogSearch,
    request: &CatalogRequest,
    policy: AmbiguousBufferPolicy,
) -> DrillResult<Vec<ItemDriller>> {
    if request.assets.is_empty() {
        return Err(DrillError::Configuration("catalogue search needs at least one asset".to_string()));
    }
    let query = build_query(&request.filters);

    let mut drillers: Vec<ItemDriller> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();
    for point in points {
        let search = SearchRequest {
            collections: request.collections.clone(),
            bbox: search_bbox(point, policy),
            start: point.start_date(),
            end: point.end_date(),
            query: query.clone(),
            assets: request.assets.clone(),
        };
        let found = catalog.search(&search)?;
        let found: Vec<CatalogItem> = found.into_iter().filter(|item| in_time_window(item, point)).collect();
        let items = nearest_n(found, point.time(), request.nearest_n);
        debug!("Point '{}' matched {} items", point.id(), items.len());

        for item in items {
            let index = match index_of.get(&item.id) {
                Some(index) => *index,
                None => {
                    index_of.insert(item.id.clone(), drillers.len());
                    drillers.push(ItemDriller::new(Item::from(item), Some(request.assets.clone()))?);
                    drillers.len() - 1
                }
            };
            drillers[index].add_point(Arc::clone(point));
        }
    }
    info!("Catalogue search found {} items for {} points", drillers.len(), points.len());
    Ok(drillers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use parking_lot::Mutex;

    fn survey_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 7, 28, 0, 0, 0).unwrap()
    }

    fn item(id: &str, days: i64) -> CatalogItem {
        CatalogItem::new(id, Some(survey_time() + Duration::days(days))).with_asset("B02", "https://host/B02.tif")
    }

    fn point(id: &str) -> Arc<SurveyPoint> {
        Arc::new(
            SurveyPoint::new(id, 149.0, -35.3, CoordinateSystem::WGS84, survey_time())
                .unwrap()
                .with_time_delta(Duration::days(8)),
        )
    }

    struct ScriptedCatalog {
        items: Vec<CatalogItem>,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl CatalogSearch for ScriptedCatalog {
        fn search(&self, request: &SearchRequest) -> DrillResult<Vec<CatalogItem>> {
            self.requests.lock().push(request.clone());
            Ok(self.items.clone())
        }
    }

    #[test]
    fn test_time_window_is_inclusive() {
        let p = point("p");
        assert!(in_time_window(&item("start", -8), &p));
        assert!(in_time_window(&item("end", 8), &p));
        let after = CatalogItem::new("after", Some(p.end_date() + Duration::seconds(1)));
        assert!(!in_time_window(&after, &p));
        assert!(in_time_window(&CatalogItem::new("undated", None), &p));
    }

    #[test]
    fn test_search_bbox_past_antimeridian_is_not_split() {
        let p = SurveyPoint::new("dateline", 179.9999, -16.0, CoordinateSystem::WGS84, survey_time())
            .unwrap()
            .with_buffer(1000.0, crate::coordinate::BufferUnit::Metres);
        let bbox = search_bbox(&p, AmbiguousBufferPolicy::default());
        assert!(bbox.min_x < 180.0 && bbox.max_x > 180.0, "{:?}", bbox);
    }

    #[test]
    fn test_time_window_edge_deltas() {
        let exact = SurveyPoint::new("exact", 149.0, -35.3, CoordinateSystem::WGS84, survey_time()).unwrap();
        assert!(in_time_window(&item("same", 0), &exact));
        assert!(!in_time_window(&item("next", 1), &exact));

        let wide = exact.with_time_delta(Duration::days(100_000_000));
        assert!(in_time_window(&item("early", -365_000), &wide));
        assert!(in_time_window(&item("late", 365_000), &wide));
    }

    #[test]
    fn test_nearest_n_picks_closest() {
        let items = vec![item("five", 5), item("two", -2)];
        let nearest = nearest_n(items, survey_time(), 1);
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].id, "two");
    }

    #[test]
    fn test_nearest_n_ties_keep_catalog_order() {
        let items = vec![CatalogItem::new("undated", None), item("a", 3), item("b", -3), item("c", 1)];
        let ids: Vec<String> = nearest_n(items, survey_time(), 0).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["undated", "a", "b", "c"]);

        let items = vec![CatalogItem::new("undated", None), item("a", 3), item("b", -3), item("c", 1)];
        let ids: Vec<String> = nearest_n(items, survey_time(), 4).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["c", "a", "b", "undated"]);
    }

    #[test]
    fn test_image_ids_validated() {
        let points = vec![point("p")];
        let images = vec!["a.tif".to_string(), "b.tif".to_string()];
        let drillers = create_image_drillers(&points, &images, None).unwrap();
        assert_eq!(drillers[1].item().id(), "b.tif");
        assert_eq!(drillers[0].points().len(), 1);

        let dup = vec!["x".to_string(), "x".to_string()];
        assert!(create_image_drillers(&points, &images, Some(&dup)).is_err());
        let short = vec!["x".to_string()];
        assert!(create_image_drillers(&points, &images, Some(&short)).is_err());
    }

    #[test]
    fn test_catalog_items_grouped_by_id() {
        let catalog = ScriptedCatalog {
            items: vec![item("near", 1), item("far", 6), item("outside", 20)],
            requests: Mutex::new(Vec::new()),
        };
        let points = vec![point("p1"), point("p2")];
        let request = CatalogRequest {
            collections: vec!["sentinel-2-l2a".to_string()],
            assets: vec!["B02".to_string()],
            nearest_n: 0,
            ..Default::default()
        };
        let drillers =
            create_catalog_drillers(&points, &catalog, &request, AmbiguousBufferPolicy::default()).unwrap();
        let ids: Vec<&str> = drillers.iter().map(|d| d.item().id()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert_eq!(drillers[0].points().len(), 2);

        let requests = catalog.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].start, survey_time() - Duration::days(8));
        assert!(requests[0].bbox.contains(149.0, -35.3));
    }

    #[test]
    fn test_catalog_requires_assets() {
        let catalog = ScriptedCatalog { items: vec![], requests: Mutex::new(Vec::new()) };
        let result = create_catalog_drillers(&[point("p")], &catalog, &CatalogRequest::default(), AmbiguousBufferPolicy::default());
        assert!(matches!(result, Err(DrillError::Configuration(_))));
    }
}
