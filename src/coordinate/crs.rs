//! Coordinate Reference System handling
//!
//! Systems are identified by EPSG code and resolved to PROJ.4 definitions
//! through the `crs-definitions` database.

use crate::errors::{DrillError, DrillResult};

/// EPSG code of WGS 84 geographic coordinates
pub const WGS84_EPSG: u32 = 4326;

/// Identifier for a coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM Zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    UTM(u8, bool),
    /// Other EPSG code
    Other(u32),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => WGS84_EPSG,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM(zone, is_northern) => {
                if *is_northern {
                    32600 + *zone as u32
                } else {
                    32700 + *zone as u32
                }
            }
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, is_northern) => {
                let hemisphere = if *is_northern { 'N' } else { 'S' };
                format!("UTM Zone {}{} (EPSG:{})", zone, hemisphere, self.epsg_code())
            }
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }

    /// PROJ.4 definition from the EPSG database
    pub fn proj_string(&self) -> DrillResult<&'static str> {
        let code = self.epsg_code();
        u16::try_from(code)
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4)
            .ok_or_else(|| DrillError::Reprojection(format!("EPSG:{} is not a known coordinate system", code)))
    }

    /// True for angular (longitude/latitude) systems
    pub fn is_geographic(&self) -> DrillResult<bool> {
        Ok(self.proj_string()?.contains("+proj=longlat"))
    }

    /// True for systems with linear units
    pub fn is_projected(&self) -> DrillResult<bool> {
        Ok(!self.is_geographic()?)
    }
}

impl std::fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    ///
    /// Fails with a reprojection error if the code is not in the database.
    pub fn from_epsg(epsg: u32) -> DrillResult<CoordinateSystem> {
        let crs = match epsg {
            WGS84_EPSG => CoordinateSystem::WGS84,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        };
        crs.proj_string()?;
        Ok(crs)
    }

    /// Parse a coordinate system from a string (e.g. "EPSG:4326")
    pub fn from_string(crs_str: &str) -> DrillResult<CoordinateSystem> {
        let upper = crs_str.trim().to_uppercase();
        let code = upper.strip_prefix("EPSG:").unwrap_or(&upper);
        match code.parse::<u32>() {
            Ok(epsg) => Self::from_epsg(epsg),
            Err(_) => Err(DrillError::Reprojection(format!("Unsupported CRS format: {}", crs_str))),
        }
    }

    /// UTM zone containing a WGS 84 location
    pub fn utm_for_location(lon: f64, lat: f64) -> CoordinateSystem {
        let zone = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u8;
        CoordinateSystem::UTM(zone, lat >= 0.0)
    }
}
