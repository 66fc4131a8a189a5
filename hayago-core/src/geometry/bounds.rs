use geo::{BoundingRect, MultiPoint, Rect};

use crate::Coordinate;

/// Rough km per degree of latitude, used for coarse radius boxes
const KM_PER_DEGREE: f64 = 111.0;

/// Latitude/longitude aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Smallest box covering all coordinates, `None` for an empty input
    pub fn from_coordinates<'a, I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let points: MultiPoint<f64> = coordinates.into_iter().map(|c| c.to_point()).collect();
        points.bounding_rect().map(Self::from)
    }

    /// Box of `radius_km` around a centre, flat-earth approximation
    pub fn around(center: Coordinate, radius_km: f64) -> Self {
        let lat_offset = radius_km / KM_PER_DEGREE;
        let lng_offset = radius_km / (KM_PER_DEGREE * center.latitude.to_radians().cos());
        Self {
            south: (center.latitude - lat_offset).max(-90.0),
            west: (center.longitude - lng_offset).max(-180.0),
            north: (center.latitude + lat_offset).min(90.0),
            east: (center.longitude + lng_offset).min(180.0),
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        (self.south..=self.north).contains(&coordinate.latitude)
            && (self.west..=self.east).contains(&coordinate.longitude)
    }

    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.south <= other.south
            && self.west <= other.west
            && self.north >= other.north
            && self.east >= other.east
    }

    /// Grows the box by the given margins in degrees, clamped to the globe
    #[must_use]
    pub fn padded(&self, lat_margin: f64, lng_margin: f64) -> Self {
        Self {
            south: (self.south - lat_margin).max(-90.0),
            west: (self.west - lng_margin).max(-180.0),
            north: (self.north + lat_margin).min(90.0),
            east: (self.east + lng_margin).min(180.0),
        }
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Self {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        }
    }
}

impl From<Bounds> for Rect<f64> {
    fn from(bounds: Bounds) -> Self {
        Rect::new(
            geo::coord! { x: bounds.west, y: bounds.south },
            geo::coord! { x: bounds.east, y: bounds.north },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn covers_all_points() {
        let points = [coord(0.0, 0.0), coord(10.0, 10.0), coord(-5.0, 3.0)];
        let bounds = Bounds::from_coordinates(&points).unwrap();
        assert_eq!(bounds.south, -5.0);
        assert_eq!(bounds.north, 10.0);
        assert_eq!(bounds.west, 0.0);
        assert_eq!(bounds.east, 10.0);
        assert!(points.iter().all(|p| bounds.contains(*p)));
        assert_eq!(bounds.center(), coord(2.5, 5.0));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert!(Bounds::from_coordinates(&Vec::<Coordinate>::new()).is_none());
    }

    #[test]
    fn radius_box_is_wider_away_from_equator() {
        let equator = Bounds::around(coord(0.0, 0.0), 10.0);
        let north = Bounds::around(coord(60.0, 0.0), 10.0);
        assert!((equator.lat_span() - north.lat_span()).abs() < 1e-9);
        assert!(north.lng_span() > equator.lng_span() * 1.9);
    }

    #[test]
    fn padding_is_clamped() {
        let bounds = Bounds::from_coordinates(&[coord(89.0, 179.0)])
            .unwrap()
            .padded(5.0, 5.0);
        assert_eq!(bounds.north, 90.0);
        assert_eq!(bounds.east, 180.0);
        assert_eq!(bounds.south, 84.0);
    }
}
