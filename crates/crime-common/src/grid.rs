//! Grid cell geometry and bounding-box computation.

use serde::{Deserialize, Serialize};

/// Physical edge length of one grid cell, in feet.
pub const GRID_EDGE_FEET: f64 = 500.0;

/// Feet per degree of latitude (flat-earth approximation).
///
/// Longitude scales by cos(latitude); latitude is treated as constant.
/// Polar latitudes are out of scope for this dataset.
pub const FEET_PER_DEGREE_LAT: f64 = 364_000.0;

/// A spatial grid cell: integer id, centroid, and bounding-box corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub grid_id: i64,
    pub center_longitude: f64,
    pub center_latitude: f64,
    pub southwest_lat: f64,
    pub southwest_lng: f64,
    pub northeast_lat: f64,
    pub northeast_lng: f64,
}

impl GridCell {
    /// Build a cell from its centroid, deriving the four corner coordinates
    /// from the fixed physical edge length.
    pub fn from_centroid(grid_id: i64, longitude: f64, latitude: f64) -> Self {
        let half_edge = GRID_EDGE_FEET / 2.0;
        let half_lat = half_edge / FEET_PER_DEGREE_LAT;
        let half_lng = half_edge / (FEET_PER_DEGREE_LAT * latitude.to_radians().cos());

        Self {
            grid_id,
            center_longitude: longitude,
            center_latitude: latitude,
            southwest_lat: latitude - half_lat,
            southwest_lng: longitude - half_lng,
            northeast_lat: latitude + half_lat,
            northeast_lng: longitude + half_lng,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_bracket_centroid() {
        // Sarasota-ish coordinates
        let cell = GridCell::from_centroid(42, -82.53, 27.33);

        assert!(cell.southwest_lat < cell.center_latitude);
        assert!(cell.center_latitude < cell.northeast_lat);
        assert!(cell.southwest_lng < cell.center_longitude);
        assert!(cell.center_longitude < cell.northeast_lng);
    }

    #[test]
    fn test_box_is_square_in_feet() {
        let cell = GridCell::from_centroid(1, -82.53, 27.33);

        let lat_extent_feet = (cell.northeast_lat - cell.southwest_lat) * FEET_PER_DEGREE_LAT;
        let lng_extent_feet = (cell.northeast_lng - cell.southwest_lng)
            * FEET_PER_DEGREE_LAT
            * cell.center_latitude.to_radians().cos();

        assert!((lat_extent_feet - GRID_EDGE_FEET).abs() < 1e-6);
        assert!((lng_extent_feet - GRID_EDGE_FEET).abs() < 1e-6);
    }

    #[test]
    fn test_longitude_extent_widens_toward_poles() {
        let equatorial = GridCell::from_centroid(1, 0.0, 0.0);
        let northern = GridCell::from_centroid(2, 0.0, 60.0);

        let eq_width = equatorial.northeast_lng - equatorial.southwest_lng;
        let north_width = northern.northeast_lng - northern.southwest_lng;

        assert!(north_width > eq_width);
    }
}
