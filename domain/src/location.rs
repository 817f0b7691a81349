//! Coordinates and the proximity check used to verify asset returns.
//!
//! Device GPS readings arrive as floating-point degrees; reference points are
//! stored and transmitted as fixed-point integers (degrees × 1,000,000).

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Maximum distance from the reference point at which a return is accepted.
pub const MAX_RETURN_DISTANCE_METERS: f64 = 15.0;

/// Scale between degrees and the fixed-point wire format.
pub const FIXED_POINT_SCALE: f64 = 1_000_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Validate a reading before it reaches [`verify`].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(Error::invalid_input("coordinates must be finite numbers"));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_input("latitude must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_input("longitude must be within [-180, 180]"));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn to_fixed_point(self) -> FixedPointCoordinate {
        FixedPointCoordinate {
            latitude: degrees_to_fixed(self.latitude),
            longitude: degrees_to_fixed(self.longitude),
        }
    }
}

/// Coordinate in the wire/storage format: integer degrees × 1,000,000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPointCoordinate {
    pub latitude: i64,
    pub longitude: i64,
}

impl FixedPointCoordinate {
    pub fn new(latitude: i64, longitude: i64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn to_degrees(self) -> Result<Coordinate, Error> {
        Coordinate::new(fixed_to_degrees(self.latitude), fixed_to_degrees(self.longitude))
    }
}

/// `round(degrees × 1,000,000)`, rounding half away from zero.
pub fn degrees_to_fixed(degrees: f64) -> i64 {
    (degrees * FIXED_POINT_SCALE).round() as i64
}

pub fn fixed_to_degrees(fixed: i64) -> f64 {
    fixed as f64 / FIXED_POINT_SCALE
}

/// Outcome of a proximity check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProximityCheck {
    pub distance_meters: f64,
    pub within_range: bool,
}

/// Great-circle distance between two points given in degrees.
pub fn haversine_distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Decide whether the user's reading is within `max_meters` of the reference point.
///
/// Inputs must be finite; validate them with [`Coordinate::new`] first.
pub fn verify(
    user_lat: f64,
    user_lng: f64,
    ref_lat: f64,
    ref_lng: f64,
    max_meters: f64,
) -> ProximityCheck {
    debug_assert!(
        [user_lat, user_lng, ref_lat, ref_lng, max_meters]
            .iter()
            .all(|v| v.is_finite()),
        "proximity inputs must be finite"
    );
    let distance_meters = haversine_distance_meters(user_lat, user_lng, ref_lat, ref_lng);
    ProximityCheck {
        distance_meters,
        within_range: distance_meters <= max_meters,
    }
}

/// [`verify`] against the default return threshold.
pub fn verify_coordinates(user: Coordinate, reference: Coordinate) -> ProximityCheck {
    verify(
        user.latitude,
        user.longitude,
        reference.latitude,
        reference.longitude,
        MAX_RETURN_DISTANCE_METERS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_point_is_zero_distance() {
        let check = verify(37.4598, 126.9526, 37.4598, 126.9526, 15.0);
        assert!(check.distance_meters.abs() < 1e-6);
        assert!(check.within_range);
    }

    #[test]
    fn test_one_kilometer_along_meridian() {
        let check = verify(37.4598, 126.9526, 37.4598 + 0.008983, 126.9526, 15.0);
        assert!(
            (check.distance_meters - 1000.0).abs() < 10.0,
            "got {}",
            check.distance_meters
        );
        assert!(!check.within_range);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // Move ten meters north and use that exact distance as the threshold.
        let d_lat = (10.0 / EARTH_RADIUS_METERS).to_degrees();
        let distance = haversine_distance_meters(37.0, 127.0, 37.0 + d_lat, 127.0);
        let check = verify(37.0, 127.0, 37.0 + d_lat, 127.0, distance);
        assert!(check.within_range);
    }

    #[test]
    fn test_fourteen_and_sixteen_meters() {
        let reference = Coordinate::new(37.4598, 126.9526).unwrap();
        let step = |meters: f64| {
            Coordinate::new(
                reference.latitude + (meters / EARTH_RADIUS_METERS).to_degrees(),
                reference.longitude,
            )
            .unwrap()
        };

        assert!(verify_coordinates(step(14.0), reference).within_range);
        assert!(!verify_coordinates(step(16.0), reference).within_range);
    }

    #[test]
    fn test_distance_is_symmetric_across_antimeridian() {
        let east = haversine_distance_meters(0.0, 179.9999, 0.0, -179.9999);
        let west = haversine_distance_meters(0.0, -179.9999, 0.0, 179.9999);
        assert!((east - west).abs() < 1e-6);
        assert!(east < 30.0, "got {}", east);
    }

    #[test]
    fn test_antipodal_points_give_half_circumference() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_METERS;
        let pairs = [
            (-12.0, -180.0, 12.0, 0.0),
            (0.0, 0.0, 0.0, 180.0),
            (90.0, 0.0, -90.0, 0.0),
            (37.4598, 126.9526, -37.4598, -53.0474),
            (45.5, 10.0, -45.5, -170.0),
        ];
        for (lat1, lng1, lat2, lng2) in pairs {
            let check = verify(lat1, lng1, lat2, lng2, MAX_RETURN_DISTANCE_METERS);
            assert!(
                check.distance_meters.is_finite(),
                "NaN for {:?}",
                (lat1, lng1, lat2, lng2)
            );
            assert!(
                (check.distance_meters - half_circumference).abs() < 1.0,
                "got {}",
                check.distance_meters
            );
            assert!(!check.within_range);
        }
    }

    #[test]
    fn test_near_antipodal_grid_is_always_finite() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lng = -180.0;
            while lng <= 180.0 {
                let antipode_lng = if lng > 0.0 { lng - 180.0 } else { lng + 180.0 };
                for offset in [0.0, 1e-9, 1e-6] {
                    let d = haversine_distance_meters(lat, lng, -lat + offset, antipode_lng);
                    assert!(d.is_finite(), "NaN at ({}, {})", lat, lng);
                    assert!(d <= std::f64::consts::PI * EARTH_RADIUS_METERS + 1e-6);
                }
                lng += 1.0;
            }
            lat += 0.5;
        }
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(degrees_to_fixed(37.459800), 37_459_800);
        assert_eq!(fixed_to_degrees(37_459_800), 37.4598);
        assert_eq!(degrees_to_fixed(-126.9526), -126_952_600);
    }

    #[test]
    fn test_fixed_point_rounds_to_nearest_micro_degree() {
        assert_eq!(degrees_to_fixed(0.0000006), 1);
        assert_eq!(degrees_to_fixed(-0.0000006), -1);
        assert_eq!(degrees_to_fixed(0.0000004), 0);
        assert_eq!(degrees_to_fixed(-37.4598), -37_459_800);
    }

    #[test]
    fn test_coordinate_fixed_point_round_trip() {
        let coordinate = Coordinate::new(37.4598, 126.9526).unwrap();
        let fixed = coordinate.to_fixed_point();
        assert_eq!(fixed, FixedPointCoordinate::new(37_459_800, 126_952_600));
        assert_eq!(fixed.to_degrees().unwrap(), coordinate);
    }

    #[test]
    fn test_fixed_point_wire_format() {
        let fixed: FixedPointCoordinate =
            serde_json::from_str(r#"{"latitude":37459800,"longitude":126952600}"#).unwrap();
        assert_eq!(fixed, FixedPointCoordinate::new(37_459_800, 126_952_600));
    }

    #[test]
    fn test_coordinate_rejects_invalid_readings() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(90.5, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }
}
