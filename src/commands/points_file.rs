//! Points CSV input and statistics JSON output
//!
//! Points are read from CSV with the header
//! `id,x,y,epsg,time,days,buffer,shape,unit`; `days`, `buffer`, `shape` and
//! `unit` may be left empty.

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use log::info;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::coordinate::{BufferUnit, CoordinateSystemFactory};
use crate::errors::{DrillError, DrillResult};
use crate::extractor::RoiShape;
use crate::point::{parse_time, SurveyPoint};

/// One row of the points file
#[derive(Debug, Deserialize)]
struct PointRecord {
    id: String,
    x: f64,
    y: f64,
    epsg: u32,
    time: String,
    #[serde(default)]
    days: Option<i64>,
    #[serde(default)]
    buffer: Option<f64>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default)]
    unit: Option<String>,
}

impl PointRecord {
    fn into_point(self) -> DrillResult<SurveyPoint> {
        let crs = CoordinateSystemFactory::from_epsg(self.epsg)?;
        let shape = match self.shape.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s.parse::<RoiShape>()?,
            None => RoiShape::default(),
        };
        let unit = match self.unit.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s.parse::<BufferUnit>()?,
            None => BufferUnit::default(),
        };
        let days = self.days.unwrap_or(0);
        let t_delta = Duration::try_days(days).ok_or_else(|| {
            DrillError::Configuration(format!("Point '{}': time delta of {} days is out of range", self.id, days))
        })?;
        Ok(SurveyPoint::new(&self.id, self.x, self.y, crs, parse_time(&self.time)?)?
            .with_time_delta(t_delta)
            .with_buffer(self.buffer.unwrap_or(0.0), unit)
            .with_shape(shape))
    }
}

fn csv_error(e: csv::Error) -> DrillError {
    DrillError::Configuration(format!("Invalid points file: {}", e))
}

/// Parses points from CSV text
pub fn parse_points<R: std::io::Read>(reader: R) -> DrillResult<Vec<Arc<SurveyPoint>>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv_reader
        .deserialize::<PointRecord>()
        .map(|record| record.map_err(csv_error)?.into_point().map(Arc::new))
        .collect()
}

/// Reads points from a CSV file
pub fn read_points(path: &Path) -> DrillResult<Vec<Arc<SurveyPoint>>> {
    let file = std::fs::File::open(path)?;
    let points = parse_points(file)?;
    info!("Read {} points from {}", points.len(), path.display());
    Ok(points)
}

/// Statistics of every point as JSON: point id, then item id, then name
///
/// Items that failed to read appear with an `error` entry.
pub fn stats_to_json(points: &[Arc<SurveyPoint>]) -> Value {
    let mut out = Map::new();
    for point in points {
        let stats = point.stats();
        let mut items = Map::new();
        for item_id in stats.item_ids() {
            let mut entry = Map::new();
            if let Some(reason) = stats.failure(item_id) {
                entry.insert("error".to_string(), Value::String(reason.to_string()));
            }
            if let Some(item_stats) = stats.get_stats(Some(item_id), None).remove(item_id) {
                for (name, value) in item_stats {
                    entry.insert(name, value.to_json());
                }
            }
            items.insert(item_id.clone(), Value::Object(entry));
        }
        out.insert(point.id().to_string(), Value::Object(items));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinateSystem;
    use crate::extractor::{ArrayInfo, MaskedArray};
    use crate::stats::StdStat;
    use ndarray::array;

    const POINTS: &str = "id,x,y,epsg,time,days,buffer,shape,unit
site-1, 149.1, -35.3, 4326, 2022-07-28, 8, 50, circle, metres
site-2, 600000, 6090000, 32755, 2022-08-01T10:30:00Z,,,,
";

    #[test]
    fn test_parse_points() {
        let points = parse_points(POINTS.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].shape(), RoiShape::Circle);
        assert_eq!(points[0].buffer(), 50.0);
        assert_eq!(points[0].t_delta(), Duration::days(8));
        assert_eq!(points[1].crs(), CoordinateSystem::UTM(55, false));
        assert_eq!(points[1].buffer(), 0.0);
        assert_eq!(points[1].unit(), BufferUnit::Metres);
    }

    #[test]
    fn test_bad_rows_rejected() {
        let bad_time = "id,x,y,epsg,time\np,1,2,4326,someday\n";
        assert!(matches!(parse_points(bad_time.as_bytes()), Err(DrillError::Configuration(_))));
        let bad_x = "id,x,y,epsg,time\np,east,2,4326,2020-01-01\n";
        assert!(parse_points(bad_x.as_bytes()).is_err());
        let bad_days = "id,x,y,epsg,time,days\np,149,-35,4326,2020-01-01,9223372036854775807\n";
        assert!(matches!(parse_points(bad_days.as_bytes()), Err(DrillError::Configuration(_))));
    }

    #[test]
    fn test_stats_json() {
        let points = parse_points(POINTS.as_bytes()).unwrap();
        points[0].stats().store_array(
            "img",
            ArrayInfo {
                asset_id: "img".to_string(),
                data: MaskedArray::new(array![[[1.0, 3.0]]]),
                xoff: 0,
                yoff: 0,
                win_xsize: 2,
                win_ysize: 1,
                ulx: 0.0,
                uly: 0.0,
                lrx: 0.0,
                lry: 0.0,
                x_res: 1.0,
                y_res: 1.0,
            },
        );
        points[0].stats().calc_std_stats("img", &[StdStat::Mean]).unwrap();
        points[1].stats().record_failure("img", "outside");

        let json = stats_to_json(&points);
        assert_eq!(json["site-1"]["img"]["mean"], serde_json::json!([2.0]));
        assert_eq!(json["site-2"]["img"]["error"], "outside");
    }
}
