//! End-to-end drills through in-memory rasters and a scripted catalogue

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::Array2;
use parking_lot::Mutex;

use pixdrill::commands::points_file::{parse_points, stats_to_json};
use pixdrill::coordinate::GeoTransform;
use pixdrill::drill::CatalogRequest;
use pixdrill::raster::{MemoryOpener, MemoryRaster};
use pixdrill::stac::{CatalogSearch, SearchRequest};
use pixdrill::{
    BufferUnit, CatalogItem, CoordinateSystem, DrillError, DrillRequest, DrillResult, PixDrill, StatValue, StdStat,
    SurveyPoint, UserStat,
};

const UTM_55S: CoordinateSystem = CoordinateSystem::UTM(55, false);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn survey_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 7, 28, 0, 0, 0).unwrap()
}

/// 4 x 4 pixels of 10 m with 1..4 in the central 2 x 2 block
fn raster() -> MemoryRaster {
    let band = Array2::from_shape_vec(
        (4, 4),
        vec![
            0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 2.0, 0.0, //
            0.0, 3.0, 4.0, 0.0, //
            0.0, 0.0, 0.0, 0.0,
        ],
    )
    .unwrap();
    let gt = GeoTransform::north_up(500_000.0, 6_000_040.0, 10.0, 10.0).unwrap();
    MemoryRaster::new(vec![band], gt, UTM_55S).unwrap()
}

/// Point whose 10 m square buffer covers the central block
fn centre_point(id: &str) -> Arc<SurveyPoint> {
    Arc::new(
        SurveyPoint::new(id, 500_020.0, 6_000_020.0, UTM_55S, survey_time())
            .unwrap()
            .with_buffer(10.0, BufferUnit::Metres)
            .with_time_delta(Duration::days(10)),
    )
}

fn floats(point: &SurveyPoint, item: &str, stat: &str) -> Option<Vec<f64>> {
    point.stats().get_stat(item, stat).and_then(|v| v.as_floats())
}

struct ScriptedCatalog {
    items: Vec<CatalogItem>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedCatalog {
    fn new(items: Vec<CatalogItem>) -> Self {
        ScriptedCatalog { items, requests: Mutex::new(Vec::new()) }
    }
}

impl CatalogSearch for ScriptedCatalog {
    fn search(&self, request: &SearchRequest) -> DrillResult<Vec<CatalogItem>> {
        self.requests.lock().push(request.clone());
        Ok(self.items.clone())
    }
}

#[test]
fn test_image_mean_and_stddev() {
    init_logging();
    let opener = MemoryOpener::new().with("scene.tif", raster());
    let point = centre_point("p1");
    let request = DrillRequest {
        images: vec!["scene.tif".to_string()],
        std_stats: vec![StdStat::Mean, StdStat::Stddev, StdStat::Count],
        ..Default::default()
    };

    PixDrill::new().with_opener(opener).drill(&[Arc::clone(&point)], &request).unwrap();

    assert_eq!(floats(&point, "scene.tif", "mean"), Some(vec![2.5]));
    let stddev = floats(&point, "scene.tif", "stddev").unwrap();
    assert!((stddev[0] - 1.25f64.sqrt()).abs() < 1e-12);
    assert_eq!(point.stats().get_stat("scene.tif", "count"), Some(&StatValue::Counts(vec![4])));
}

#[test]
fn test_nearest_catalogue_item_is_drilled() {
    init_logging();
    let near = CatalogItem::new("S2_near", Some(survey_time() + Duration::days(2))).with_asset("B02", "mem://near/B02");
    let far = CatalogItem::new("S2_far", Some(survey_time() - Duration::days(5))).with_asset("B02", "mem://far/B02");
    let catalog = ScriptedCatalog::new(vec![far, near]);
    let opener = MemoryOpener::new().with("mem://near/B02", raster()).with("mem://far/B02", raster());

    let point = centre_point("p1");
    let request = DrillRequest {
        catalog: Some(CatalogRequest {
            collections: vec!["sentinel-2-l2a".to_string()],
            assets: vec!["B02".to_string()],
            nearest_n: 1,
            ..Default::default()
        }),
        std_stats: vec![StdStat::Mean],
        ..Default::default()
    };

    let drillers = PixDrill::new()
        .with_opener(opener)
        .with_catalog(catalog)
        .drill(&[Arc::clone(&point)], &request)
        .unwrap();

    assert_eq!(drillers.len(), 1);
    assert_eq!(drillers[0].item().id(), "S2_near");
    assert_eq!(floats(&point, "S2_near", "mean"), Some(vec![2.5]));
    assert!(point.stats().get_stat("S2_far", "mean").is_none());
}

#[test]
fn test_search_uses_point_window() {
    init_logging();
    let catalog = Arc::new(ScriptedCatalog::new(Vec::new()));
    let point = centre_point("p1");
    let request = CatalogRequest { assets: vec!["B02".to_string()], ..Default::default() };

    let drillers = pixdrill::drill::create_catalog_drillers(
        &[Arc::clone(&point)],
        catalog.as_ref(),
        &request,
        Default::default(),
    )
    .unwrap();
    assert!(drillers.is_empty());

    let requests = catalog.requests.lock();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].start, survey_time() - Duration::days(10));
    assert_eq!(requests[0].end, survey_time() + Duration::days(10));
    let (lon, lat) = point.lonlat();
    assert!(requests[0].bbox.contains(lon, lat));
}

#[test]
fn test_recompute_needs_reset() {
    init_logging();
    let opener = MemoryOpener::new().with("scene.tif", raster());
    let driller = PixDrill::new().with_opener(opener);
    let point = centre_point("p1");
    let request = DrillRequest {
        images: vec!["scene.tif".to_string()],
        std_stats: vec![StdStat::Mean],
        ..Default::default()
    };

    let drillers = driller.drill(&[Arc::clone(&point)], &request).unwrap();
    let first = floats(&point, "scene.tif", "mean");

    let again = driller.drill(&[Arc::clone(&point)], &request);
    assert!(matches!(again, Err(DrillError::StatAlreadyComputed { .. })));

    drillers[0].reset_stats();
    assert!(point.stats().is_empty());
    driller.drill(&[Arc::clone(&point)], &request).unwrap();
    assert_eq!(floats(&point, "scene.tif", "mean"), first);
}

#[test]
fn test_point_outside_image_is_recorded() {
    init_logging();
    let opener = MemoryOpener::new().with("scene.tif", raster());
    let inside = centre_point("inside");
    let outside = Arc::new(SurveyPoint::new("outside", 600_000.0, 6_000_020.0, UTM_55S, survey_time()).unwrap());
    let request = DrillRequest {
        images: vec!["scene.tif".to_string()],
        std_stats: vec![StdStat::Mean],
        ..Default::default()
    };

    PixDrill::new()
        .with_opener(opener)
        .drill(&[Arc::clone(&inside), Arc::clone(&outside)], &request)
        .unwrap();

    assert_eq!(floats(&inside, "scene.tif", "mean"), Some(vec![2.5]));
    let stats = outside.stats();
    assert!(stats.failure("scene.tif").is_some());
    assert!(stats.arrays("scene.tif").is_none());
    assert!(stats.get_stat("scene.tif", "mean").is_none());
}

#[test]
fn test_multi_band_arrays_need_user_stats() {
    init_logging();
    let bands = (0..3).map(|b| Array2::from_elem((4, 4), b as f64)).collect();
    let gt = GeoTransform::north_up(500_000.0, 6_000_040.0, 10.0, 10.0).unwrap();
    let rgb = MemoryRaster::new(bands, gt, UTM_55S).unwrap();
    let opener = MemoryOpener::new().with("rgb.tif", rgb).with("scene.tif", raster());

    let point = centre_point("p1");
    let band_count = UserStat::new("bands", |arrays, _, _| Ok(StatValue::Number(arrays[0].data.band_count() as f64)));
    let request = DrillRequest {
        images: vec!["rgb.tif".to_string(), "scene.tif".to_string()],
        std_stats: vec![StdStat::Mean],
        user_stats: vec![band_count],
        ..Default::default()
    };
    PixDrill::new().with_opener(opener).drill(&[Arc::clone(&point)], &request).unwrap();

    let stats = point.stats();
    assert_eq!(stats.get_stat("rgb.tif", "bands"), Some(&StatValue::Number(3.0)));
    assert!(stats.get_stat("rgb.tif", "mean").is_none());
    assert_eq!(stats.get_stat("scene.tif", "mean"), Some(&StatValue::Floats(vec![2.5])));
    assert_eq!(stats.get_stat("scene.tif", "bands"), Some(&StatValue::Number(1.0)));
}

#[test]
fn test_concurrent_drill_matches_sequential() {
    init_logging();
    let images: Vec<String> = (0..4).map(|i| format!("scene_{}.tif", i)).collect();
    let mut opener = MemoryOpener::new();
    for image in &images {
        opener.insert(image, raster());
    }
    let driller = PixDrill::new().with_opener(opener);

    let run = |concurrent: bool| {
        let points = vec![centre_point("a"), centre_point("b")];
        let request = DrillRequest {
            images: images.clone(),
            std_stats: vec![StdStat::Mean, StdStat::Max],
            concurrent,
            ..Default::default()
        };
        driller.drill(&points, &request).unwrap();
        stats_to_json(&points)
    };

    let sequential = run(false);
    let concurrent = run(true);
    assert_eq!(sequential, concurrent);
    assert_eq!(concurrent["b"]["scene_3.tif"]["max"], serde_json::json!([4.0]));
}

#[test]
fn test_points_file_to_json() {
    init_logging();
    let csv = "id,x,y,epsg,time,days,buffer\n\
               site-1,500020,6000020,32755,2022-07-28,3,10\n";
    let points = parse_points(csv.as_bytes()).unwrap();
    let opener = MemoryOpener::new().with("scene.tif", raster());
    let request = DrillRequest {
        images: vec!["scene.tif".to_string()],
        image_ids: Some(vec!["scene".to_string()]),
        std_stats: vec![StdStat::Mean],
        ..Default::default()
    };

    PixDrill::new().with_opener(opener).drill(&points, &request).unwrap();
    let json = stats_to_json(&points);
    assert_eq!(json["site-1"]["scene"]["mean"], serde_json::json!([2.5]));
}
