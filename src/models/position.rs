use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::models::updates::WatchId;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// One device position as accepted by the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    /// in m/s, absent when the device can't tell
    pub speed: Option<f64>,
    pub timestamp: Instant,
}

impl PositionSample {
    pub fn new(latitude: f64, longitude: f64, speed: Option<f64>) -> Self {
        Self { latitude, longitude, speed, timestamp: Instant::now() }
    }

    pub fn has_coordinates(&self) -> bool {
        !self.latitude.is_nan() && !self.longitude.is_nan()
    }

    pub fn distance_to(&self, other: &PositionSample) -> f64 {
        haversine_distance(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Position as posted by the browser for a given watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    pub watch_id: WatchId,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    /// epoch millis reported by the device
    #[serde(default)]
    pub timestamp: u64,
}

impl From<PositionReport> for PositionSample {
    fn from(report: PositionReport) -> Self {
        PositionSample::new(report.latitude, report.longitude, report.speed)
    }
}

/// Great-circle distance in meters between two points given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}
