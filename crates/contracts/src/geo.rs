//! Geographic position and route boundary

use serde::{Deserialize, Serialize};

/// Central London, the default journey origin
pub const LONDON: Position = Position::new(51.5074, -0.1278);

/// Central Birmingham, the default journey destination
pub const BIRMINGHAM: Position = Position::new(52.4862, -1.8904);

/// WGS84 position in decimal degrees
///
/// Serialized as a `[latitude, longitude]` pair, both on the wire and in config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Linear interpolation between `from` (t = 0) and `to` (t = 1)
    ///
    /// At `t == 1.0` the result is exactly `to`.
    pub fn lerp(from: Position, to: Position, t: f64) -> Position {
        Position {
            latitude: from.latitude * (1.0 - t) + to.latitude * t,
            longitude: from.longitude * (1.0 - t) + to.longitude * t,
        }
    }

    /// Shift by a per-axis offset
    pub fn offset(self, d_latitude: f64, d_longitude: f64) -> Position {
        Position {
            latitude: self.latitude + d_latitude,
            longitude: self.longitude + d_longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Whether coordinates lie inside the valid WGS84 ranges
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for Position {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<Position> for (f64, f64) {
    fn from(p: Position) -> Self {
        (p.latitude, p.longitude)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Destination boundary of a route
///
/// A position has arrived once it is at or past the destination on both axes,
/// "past" meaning further along the direction of travel from the origin. For
/// London -> Birmingham (heading north-west) this is
/// `latitude >= 52.4862 && longitude <= -1.8904`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteBoundary {
    destination: Position,
    northbound: bool,
    eastbound: bool,
}

impl RouteBoundary {
    pub fn new(origin: Position, destination: Position) -> Self {
        Self {
            destination,
            northbound: destination.latitude >= origin.latitude,
            eastbound: destination.longitude >= origin.longitude,
        }
    }

    pub fn destination(&self) -> Position {
        self.destination
    }

    pub fn has_arrived(&self, position: Position) -> bool {
        let lat_done = if self.northbound {
            position.latitude >= self.destination.latitude
        } else {
            position.latitude <= self.destination.latitude
        };
        let lon_done = if self.eastbound {
            position.longitude >= self.destination.longitude
        } else {
            position.longitude <= self.destination.longitude
        };
        lat_done && lon_done
    }
}
