//! Great-circle distance helpers for the nearby-store queries.
//!
//! The store prefilters candidates with a latitude/longitude bounding
//! box (cheap, index-friendly) and the caller confirms each candidate
//! with the exact haversine distance.

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A latitude/longitude rectangle enclosing a circle of `radius_meters`
/// around a center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Compute the box around `(lat, lon)`.
    ///
    /// Longitude spread widens toward the poles; near the poles the box
    /// degenerates to the full longitude range, which is safe because
    /// the exact distance check runs afterwards.
    pub fn around(lat: f64, lon: f64, radius_meters: f64) -> Self {
        let lat_delta = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
        let cos_lat = lat.to_radians().cos();
        let lon_delta = if cos_lat.abs() < 1e-9 {
            180.0
        } else {
            lat_delta / cos_lat
        };

        BoundingBox {
            min_lat: (lat - lat_delta).max(-90.0),
            max_lat: (lat + lat_delta).min(90.0),
            min_lon: (lon - lon_delta).max(-180.0),
            max_lon: (lon + lon_delta).min(180.0),
        }
    }
}

/// Haversine distance between two points, in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        assert_eq!(haversine_meters(12.97, 77.59, 12.97, 77.59), 0.0);
    }

    #[test]
    fn known_distance_delhi_to_mumbai() {
        // New Delhi to Mumbai is roughly 1150 km as the crow flies.
        let d = haversine_meters(28.6139, 77.2090, 19.0760, 72.8777);
        assert!((1_100_000.0..1_200_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn bounding_box_contains_points_within_radius() {
        let center = (12.9716, 77.5946); // Bengaluru
        let bbox = BoundingBox::around(center.0, center.1, 10_000.0);

        // A point ~5 km north of the center.
        let north = (center.0 + 0.045, center.1);
        assert!(north.0 <= bbox.max_lat && north.0 >= bbox.min_lat);
        assert!(north.1 <= bbox.max_lon && north.1 >= bbox.min_lon);
        assert!(haversine_meters(center.0, center.1, north.0, north.1) < 10_000.0);
    }

    #[test]
    fn bounding_box_clamps_at_the_poles() {
        let bbox = BoundingBox::around(89.9, 0.0, 50_000.0);
        assert!(bbox.max_lat <= 90.0);
        assert!(bbox.min_lon >= -180.0 && bbox.max_lon <= 180.0);
    }
}
