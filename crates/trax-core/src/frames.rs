//! Coordinate frames and projections.
//!
//! Points arrive in one of four frames: geographic lat/long, projected UTM,
//! integer grid `(row, col)`, or planar metres from the grid's north-west
//! corner. The frame is part of the type ([`GeoPoint`]) rather than a string
//! key, so conversions are total functions and an unsupported conversion is
//! a typed error instead of a runtime lookup failure.
//!
//! The UTM forward/inverse transform is the standard WGS84 transverse
//! Mercator series (Snyder, *Map Projections — A Working Manual*, USGS PP
//! 1395), accurate to well under a metre inside a zone.

use crate::error::{TraxError, TraxResult};
use serde::{Deserialize, Serialize};

/// A UTM zone: number 1-60 plus hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub north: bool,
}

impl UtmZone {
    pub fn new(number: u8, north: bool) -> Self {
        UtmZone { number, north }
    }

    /// Central meridian of the zone, in degrees.
    pub fn central_meridian_deg(self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    /// Zone containing the given longitude (northern/southern per latitude).
    pub fn containing(lat_deg: f64, lon_deg: f64) -> Self {
        let number = (((lon_deg + 180.0) / 6.0).floor() as i32).clamp(0, 59) as u8 + 1;
        UtmZone { number, north: lat_deg >= 0.0 }
    }
}

impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, if self.north { 'N' } else { 'S' })
    }
}

/// Projection of a grid's origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Projected UTM coordinates in the given zone.
    Utm(UtmZone),
    /// Unit planar frame with origin (0, 0); geographic queries against it
    /// fail with `unsupported_projection`.
    LocalPlanar,
}

impl Projection {
    pub fn utm_zone(&self) -> Option<UtmZone> {
        match self {
            Projection::Utm(zone) => Some(*zone),
            Projection::LocalPlanar => None,
        }
    }
}

/// A point tagged with the frame it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeoPoint {
    /// Geographic WGS84 latitude/longitude in degrees.
    LatLon { lat: f64, lon: f64 },
    /// Projected UTM easting/northing in metres.
    Utm { easting: f64, northing: f64, zone: UtmZone },
    /// Integer grid indices.
    RowCol { row: usize, col: usize },
    /// Planar metres east (`x`) and south (`y`) of the grid's NW cell centre.
    GridXY { x: f64, y: f64 },
}

// WGS84 ellipsoid.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

fn e2() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

fn ep2() -> f64 {
    let e2 = e2();
    e2 / (1.0 - e2)
}

/// Meridional arc length from the equator to latitude `phi`.
fn meridional_arc(phi: f64) -> f64 {
    let e2 = e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// Forward transform: WGS84 lat/long (degrees) to UTM easting/northing in
/// the given zone.
pub fn latlon_to_utm(lat_deg: f64, lon_deg: f64, zone: UtmZone) -> (f64, f64) {
    let phi = lat_deg.to_radians();
    let lambda = lon_deg.to_radians();
    let lambda0 = zone.central_meridian_deg().to_radians();

    let e2 = e2();
    let ep2 = ep2();
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * (lambda - lambda0);
    let m = meridional_arc(phi);

    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let a5 = a4 * a;
    let a6 = a5 * a;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a3 / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
        + FALSE_EASTING;
    let mut northing = K0
        * (m + n
            * tan_phi
            * (a2 / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));
    if !zone.north {
        northing += FALSE_NORTHING_SOUTH;
    }
    (easting, northing)
}

/// Inverse transform: UTM easting/northing in a zone back to WGS84 lat/long
/// in degrees.
pub fn utm_to_latlon(easting: f64, northing: f64, zone: UtmZone) -> (f64, f64) {
    let e2 = e2();
    let ep2 = ep2();

    let x = easting - FALSE_EASTING;
    let y = if zone.north { northing } else { northing - FALSE_NORTHING_SOUTH };

    let m = y / K0;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let e1_2 = e1 * e1;
    let e1_3 = e1_2 * e1;
    let e1_4 = e1_3 * e1;
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let d2 = d * d;
    let d3 = d2 * d;
    let d4 = d3 * d;
    let d5 = d4 * d;
    let d6 = d5 * d;

    let phi = phi1
        - (n1 * tan_phi1 / r1)
            * (d2 / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d6
                    / 720.0);
    let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5 / 120.0)
        / cos_phi1;

    let lat = phi.to_degrees();
    let lon = zone.central_meridian_deg() + lambda.to_degrees();
    (lat, lon)
}

/// Re-express a UTM point in a different zone (via geographic coordinates).
pub fn utm_rezone(easting: f64, northing: f64, from: UtmZone, to: UtmZone) -> (f64, f64) {
    if from == to {
        return (easting, northing);
    }
    let (lat, lon) = utm_to_latlon(easting, northing, from);
    latlon_to_utm(lat, lon, to)
}

/// Project a [`GeoPoint`] to UTM coordinates in `zone`.
///
/// `RowCol`/`GridXY` points are grid-relative and cannot be projected here;
/// the grid owns those conversions.
pub fn to_utm(point: GeoPoint, zone: UtmZone) -> TraxResult<(f64, f64)> {
    match point {
        GeoPoint::LatLon { lat, lon } => Ok(latlon_to_utm(lat, lon, zone)),
        GeoPoint::Utm { easting, northing, zone: from } => {
            Ok(utm_rezone(easting, northing, from, zone))
        }
        GeoPoint::RowCol { .. } | GeoPoint::GridXY { .. } => Err(TraxError::Parse(
            "grid-relative point has no absolute projection".into(),
        )),
    }
}
