// utils/geo.rs
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two lat/lng points (Haversine).
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert_eq!(distance_km(40.71, -74.00, 40.71, -74.00), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = distance_km(40.71, -74.00, 51.5074, -0.1278);
        let b = distance_km(51.5074, -0.1278, 40.71, -74.00);
        assert_eq!(a, b);
    }

    #[test]
    fn manhattan_block_pair_is_roughly_a_kilometer() {
        // Lower Manhattan, about 1.3-1.4 km apart
        let km = distance_km(40.71, -74.00, 40.72, -74.01);
        assert!(km > 1.0 && km < 2.0, "got {}", km);
    }

    #[test]
    fn london_to_paris() {
        let km = distance_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(km > 330.0 && km < 360.0, "got {}", km);
    }
}
