/// Mean Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates, in kilometers.
///
/// The radius primitive of the profile directory does the coarse geospatial
/// cut; this is the precise per-candidate distance used for the hard
/// max-distance filter and the scoring tiers.
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let d = haversine_distance(25.033, 121.5654, 25.033, 121.5654);
        assert!(d < 0.01);
    }

    #[test]
    fn test_taipei_to_kaohsiung() {
        // Roughly 300 km apart
        let d = haversine_distance(25.033, 121.5654, 22.6273, 120.3014);
        assert!((d - 300.0).abs() < 20.0, "expected ~300km, got {}", d);
    }

    #[test]
    fn test_symmetry() {
        let a = haversine_distance(25.033, 121.5654, 24.1477, 120.6736);
        let b = haversine_distance(24.1477, 120.6736, 25.033, 121.5654);
        assert!((a - b).abs() < 1e-9);
    }
}
