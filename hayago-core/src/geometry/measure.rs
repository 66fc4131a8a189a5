//! Great-circle measures and human readable formatting

use geo::{Bearing, Distance, Haversine};

use crate::{Coordinate, config::FareConfig};

/// Great-circle distance in kilometres
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    Haversine.distance(from.to_point(), to.to_point()) / 1000.0
}

/// Initial bearing from `from` to `to`, degrees in [0, 360)
pub fn bearing_deg(from: Coordinate, to: Coordinate) -> f64 {
    Haversine
        .bearing(from.to_point(), to.to_point())
        .rem_euclid(360.0)
}

/// Length of a path following the given points, in kilometres
pub fn path_length_km(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Trip price from distance and duration
pub fn fare(distance_km: f64, duration_min: f64, config: &FareConfig) -> f64 {
    distance_km * config.cost_per_km + duration_min * config.cost_per_minute
}

/// "850m" under a kilometre, "12.3km" above
#[allow(clippy::cast_possible_truncation)]
pub fn format_distance(kilometers: f64) -> String {
    if kilometers <= 0.0 || !kilometers.is_finite() {
        return "0 km".to_string();
    }
    if kilometers < 1.0 {
        format!("{}m", (kilometers * 1000.0) as i64)
    } else {
        format!("{kilometers:.1}km")
    }
}

/// "1h 5m", or "45m" under an hour
#[allow(clippy::cast_possible_truncation)]
pub fn format_duration(minutes: f64) -> String {
    if minutes <= 0.0 || !minutes.is_finite() {
        return "0 minutes".to_string();
    }
    let hours = (minutes / 60.0).floor() as i64;
    let mins = (minutes % 60.0).floor() as i64;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn one_degree_of_latitude() {
        let km = haversine_km(coord(0.0, 0.0), coord(1.0, 0.0));
        assert!((km - 111.19).abs() < 0.1, "got {km}");
    }

    #[test]
    fn bearing_points_east_and_north() {
        let origin = coord(0.0, 0.0);
        assert!((bearing_deg(origin, coord(0.0, 1.0)) - 90.0).abs() < 1e-6);
        assert!(bearing_deg(origin, coord(1.0, 0.0)).abs() < 1e-6);
        let west = bearing_deg(origin, coord(0.0, -1.0));
        assert!((west - 270.0).abs() < 1e-6, "got {west}");
    }

    #[test]
    fn path_length_sums_segments() {
        let path = [coord(0.0, 0.0), coord(1.0, 0.0), coord(2.0, 0.0)];
        let direct = haversine_km(path[0], path[2]);
        assert!((path_length_km(&path) - direct).abs() < 1e-6);
        assert_eq!(path_length_km(&path[..1]), 0.0);
    }

    #[test]
    fn fare_combines_distance_and_time() {
        let config = FareConfig::default();
        assert!((fare(10.0, 20.0, &config) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn formats_like_the_dashboard() {
        assert_eq!(format_distance(0.0), "0 km");
        assert_eq!(format_distance(0.85), "850m");
        assert_eq!(format_distance(12.34), "12.3km");
        assert_eq!(format_duration(0.0), "0 minutes");
        assert_eq!(format_duration(45.5), "45m");
        assert_eq!(format_duration(65.0), "1h 5m");
    }
}
