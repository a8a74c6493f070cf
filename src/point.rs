//! Survey points
//!
//! A survey point is a located, timestamped observation with a region of
//! interest. It owns the statistics accumulator for every item drilled at
//! its location; the accumulator is behind a mutex so that drillers running
//! on different threads can write to the same point.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::trace;
use parking_lot::{Mutex, MutexGuard};

use crate::coordinate::{BufferUnit, BufferedPoint, CoordinateSystem, CoordinateTransformer};
use crate::errors::{DrillError, DrillResult};
use crate::extractor::RoiShape;
use crate::item::Item;
use crate::stats::{PointStats, StdStat, UserStat};

/// Longitudes this close to 180 are wrapped to -180
const ANTIMERIDIAN_TOLERANCE: f64 = 1e-9;

/// Parses a survey timestamp
///
/// Accepts RFC 3339, or `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DDTHH:MM:SS` which are taken to be UTC.
pub fn parse_time(value: &str) -> DrillResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| DrillError::Configuration(format!("Unrecognised timestamp: {}", value)))
}

/// A located, timestamped observation with a region of interest
#[derive(Debug)]
pub struct SurveyPoint {
    id: String,
    x: f64,
    y: f64,
    crs: CoordinateSystem,
    lon: f64,
    lat: f64,
    time: DateTime<Utc>,
    t_delta: Duration,
    buffer: f64,
    unit: BufferUnit,
    shape: RoiShape,
    other_attrs: BTreeMap<String, serde_json::Value>,
    stats: Mutex<PointStats>,
}

impl SurveyPoint {
    /// Creates a point with a zero buffer, a square region and no time window
    ///
    /// # Arguments
    /// * `id` - Caller's identifier for the point
    /// * `x`, `y` - Location in `crs`
    /// * `crs` - Coordinate system of the location
    /// * `time` - Survey time
    ///
    /// # Returns
    /// The point, or a reprojection error if the location cannot be
    /// expressed in WGS 84
    pub fn new(id: &str, x: f64, y: f64, crs: CoordinateSystem, time: DateTime<Utc>) -> DrillResult<Self> {
        let (mut lon, lat) = CoordinateTransformer::new(crs, CoordinateSystem::WGS84)?.transform(x, y)?;
        if (lon - 180.0).abs() < ANTIMERIDIAN_TOLERANCE {
            lon = -180.0;
        }
        trace!("Point '{}' at lon {}, lat {}", id, lon, lat);
        Ok(SurveyPoint {
            id: id.to_string(),
            x,
            y,
            crs,
            lon,
            lat,
            time,
            t_delta: Duration::zero(),
            buffer: 0.0,
            unit: BufferUnit::default(),
            shape: RoiShape::default(),
            other_attrs: BTreeMap::new(),
            stats: Mutex::new(PointStats::new()),
        })
    }

    /// Sets the buffer distance and its unit
    pub fn with_buffer(mut self, buffer: f64, unit: BufferUnit) -> Self {
        self.buffer = buffer.max(0.0);
        self.unit = unit;
        self
    }

    pub fn with_shape(mut self, shape: RoiShape) -> Self {
        self.shape = shape;
        self
    }

    /// Sets the half-width of the acquisition window
    pub fn with_time_delta(mut self, t_delta: Duration) -> Self {
        self.t_delta = t_delta.abs();
        self
    }

    /// Attaches a caller attribute
    pub fn with_attr(mut self, name: &str, value: serde_json::Value) -> Self {
        self.other_attrs.insert(name.to_string(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Location in the point's own coordinate system
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    /// Location in WGS 84
    pub fn lonlat(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn t_delta(&self) -> Duration {
        self.t_delta
    }

    /// Start of the acquisition window, clamped to the earliest representable time
    pub fn start_date(&self) -> DateTime<Utc> {
        self.time.checked_sub_signed(self.t_delta).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// End of the acquisition window, clamped to the latest representable time
    pub fn end_date(&self) -> DateTime<Utc> {
        self.time.checked_add_signed(self.t_delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    pub fn unit(&self) -> BufferUnit {
        self.unit
    }

    pub fn shape(&self) -> RoiShape {
        self.shape
    }

    pub fn other_attrs(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.other_attrs
    }

    /// Location and buffer as needed to build a footprint
    pub fn buffered(&self) -> BufferedPoint {
        BufferedPoint {
            x: self.x,
            y: self.y,
            crs: self.crs,
            lon: self.lon,
            lat: self.lat,
            buffer: self.buffer,
            unit: self.unit,
        }
    }

    /// Locks the statistics accumulator
    pub fn stats(&self) -> MutexGuard<'_, PointStats> {
        self.stats.lock()
    }

    /// Computes statistics for one item from its stored arrays
    ///
    /// Items that failed to read, or that hold no arrays, are skipped. User
    /// functions run without the accumulator locked and their errors are
    /// returned as `DrillError::UserStat`. Multi-band arrays fail the
    /// standard statistics with `UnsupportedBandCount` after the user
    /// statistics have been computed.
    pub fn calc_stats(&self, item: &Item, std_stats: &[StdStat], user_stats: &[UserStat]) -> DrillResult<()> {
        let item_id = item.id();
        let (std_result, arrays) = {
            let mut stats = self.stats.lock();
            if !stats.has_arrays(item_id) {
                return Ok(());
            }
            let names = std_stats.iter().map(|s| s.name()).chain(user_stats.iter().map(|u| u.name()));
            ensure_distinct(names.clone())?;
            stats.ensure_uncomputed(item_id, names)?;
            let std_result = stats.calc_std_stats(item_id, std_stats);
            if user_stats.is_empty() {
                return std_result;
            }
            (std_result, stats.arrays(item_id).map(|a| a.to_vec()).unwrap_or_default())
        };

        for user_stat in user_stats {
            let value = user_stat.call(&arrays, item, self).map_err(|source| DrillError::UserStat {
                stat_name: user_stat.name().to_string(),
                source,
            })?;
            self.stats.lock().insert_stat(item_id, user_stat.name(), value)?;
        }
        std_result
    }

    /// Clears every stored array and statistic
    pub fn reset_stats(&self) {
        self.stats.lock().reset();
    }
}

/// Rejects a statistic name requested twice in one computation
fn ensure_distinct<'a>(names: impl Iterator<Item = &'a str>) -> DrillResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DrillError::Configuration(format!("Statistic '{}' requested more than once", name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ArrayInfo, MaskedArray};
    use crate::item::ImageItem;
    use crate::stats::StatValue;
    use chrono::TimeZone;
    use ndarray::array;

    fn point() -> SurveyPoint {
        let t = Utc.with_ymd_and_hms(2021, 6, 15, 0, 0, 0).unwrap();
        SurveyPoint::new("p1", 150.0, -30.0, CoordinateSystem::WGS84, t).unwrap()
    }

    fn store(point: &SurveyPoint, item_id: &str, data: ndarray::Array3<f64>) {
        let (_, rows, cols) = data.dim();
        point.stats().store_array(
            item_id,
            ArrayInfo {
                asset_id: "b1".to_string(),
                data: MaskedArray::new(data),
                xoff: 0,
                yoff: 0,
                win_xsize: cols as u32,
                win_ysize: rows as u32,
                ulx: 0.0,
                uly: 0.0,
                lrx: 0.0,
                lry: 0.0,
                x_res: 1.0,
                y_res: 1.0,
            },
        );
    }

    #[test]
    fn test_parse_time_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_time("2020-01-02T03:04:05Z").unwrap(), expected);
        assert_eq!(parse_time("2020-01-02T13:04:05+10:00").unwrap(), expected);
        assert_eq!(parse_time("2020-01-02 03:04:05").unwrap(), expected);
        assert_eq!(parse_time("2020-01-02").unwrap(), Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
        assert!(matches!(parse_time("yesterday"), Err(DrillError::Configuration(_))));
    }

    #[test]
    fn test_time_window() {
        let p = point().with_time_delta(Duration::days(-3));
        assert_eq!(p.t_delta(), Duration::days(3));
        assert_eq!(p.end_date() - p.start_date(), Duration::days(6));
    }

    #[test]
    fn test_zero_time_delta_window() {
        let p = point();
        assert_eq!(p.start_date(), p.time());
        assert_eq!(p.end_date(), p.time());
    }

    #[test]
    fn test_huge_time_delta_clamps_window() {
        let p = point().with_time_delta(Duration::days(100_000_000));
        assert_eq!(p.start_date(), DateTime::<Utc>::MIN_UTC);
        assert_eq!(p.end_date(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_longitude_180_normalised() {
        let t = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let p = SurveyPoint::new("dateline", 180.0, 0.0, CoordinateSystem::WGS84, t).unwrap();
        assert_eq!(p.lonlat(), (-180.0, 0.0));

        let p = SurveyPoint::new("near", 180.0 - 1e-12, 0.0, CoordinateSystem::WGS84, t).unwrap();
        assert_eq!(p.lonlat().0, -180.0);
        let p = SurveyPoint::new("east", 179.9, 0.0, CoordinateSystem::WGS84, t).unwrap();
        assert!((p.lonlat().0 - 179.9).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_names_rejected_before_computing() {
        let p = point();
        let item = Item::from(ImageItem::new("a.tif", None));
        store(&p, item.id(), array![[[1.0, 2.0], [3.0, 4.0]]]);

        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&calls);
        let shadow = UserStat::new("mean", move |_, _, _| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(StatValue::Number(0.0))
        });
        let result = p.calc_stats(&item, &[StdStat::Mean], &[shadow.clone()]);
        assert!(matches!(result, Err(DrillError::Configuration(_))));

        let result = p.calc_stats(&item, &[], &[shadow.clone(), shadow]);
        assert!(matches!(result, Err(DrillError::Configuration(_))));

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert!(p.stats().get_stats(Some(item.id()), None).is_empty());
    }

    #[test]
    fn test_calc_stats_with_user_stat() {
        let p = point();
        let item = Item::from(ImageItem::new("a.tif", None));
        store(&p, item.id(), array![[[1.0, 2.0], [3.0, 4.0]]]);

        let pixels = UserStat::new("pixels", |arrays, _item, point| {
            assert_eq!(point.id(), "p1");
            Ok(StatValue::Number(arrays[0].data.count_valid() as f64))
        });
        p.calc_stats(&item, &[StdStat::Mean], &[pixels]).unwrap();

        let stats = p.stats().get_stats(Some(item.id()), None);
        assert_eq!(stats[item.id()]["mean"], StatValue::Floats(vec![2.5]));
        assert_eq!(stats[item.id()]["pixels"], StatValue::Number(4.0));
    }

    #[test]
    fn test_user_stat_handles_multiband() {
        let p = point();
        let item = Item::from(ImageItem::new("rgb.tif", None));
        store(&p, item.id(), ndarray::Array3::ones((3, 2, 2)));

        let bands = UserStat::new("bands", |arrays, _, _| Ok(StatValue::Number(arrays[0].data.band_count() as f64)));
        p.calc_stats(&item, &[], &[bands.clone()]).unwrap();
        assert_eq!(p.stats().get_stat(item.id(), "bands"), Some(&StatValue::Number(3.0)));

        p.reset_stats();
        store(&p, item.id(), ndarray::Array3::ones((3, 2, 2)));
        assert!(matches!(
            p.calc_stats(&item, &[StdStat::Mean], &[]),
            Err(DrillError::UnsupportedBandCount { bands: 3, .. })
        ));

        p.reset_stats();
        store(&p, item.id(), ndarray::Array3::ones((3, 2, 2)));
        assert!(p.calc_stats(&item, &[StdStat::Mean], &[bands]).is_err());
        assert_eq!(p.stats().get_stat(item.id(), "bands"), Some(&StatValue::Number(3.0)));
        assert!(p.stats().get_stat(item.id(), "mean").is_none());
    }

    #[test]
    fn test_user_stat_error_propagates() {
        let p = point();
        let item = Item::from(ImageItem::new("a.tif", None));
        store(&p, item.id(), array![[[1.0]]]);
        let failing = UserStat::new("boom", |_, _, _| Err("no good".into()));
        match p.calc_stats(&item, &[], &[failing]) {
            Err(DrillError::UserStat { stat_name, .. }) => assert_eq!(stat_name, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_second_calc_without_reset_rejected() {
        let p = point();
        let item = Item::from(ImageItem::new("a.tif", None));
        store(&p, item.id(), array![[[1.0]]]);
        p.calc_stats(&item, &[StdStat::Count], &[]).unwrap();
        assert!(matches!(
            p.calc_stats(&item, &[StdStat::Count], &[]),
            Err(DrillError::StatAlreadyComputed { .. })
        ));
    }
}
