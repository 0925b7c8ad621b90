use geo_types::Point;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let (a, b): (Point<f64>, Point<f64>) = ((*self).into(), (*other).into());

        let dlat = (b.y() - a.y()).to_radians();
        let dlon = (b.x() - a.x()).to_radians();
        let h = (dlat / 2.0).sin().powi(2)
            + a.y().to_radians().cos() * b.y().to_radians().cos() * (dlon / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(coordinate: Coordinate) -> Self {
        Point::new(coordinate.longitude, coordinate.latitude)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(point: Point<f64>) -> Self {
        Coordinate::new(point.y(), point.x())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_degrees() {
        assert!(Coordinate::new(3.1390, 101.6869).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn point_uses_longitude_as_x() {
        let point: Point<f64> = Coordinate::new(1.5, 103.8).into();

        assert_eq!(point.x(), 103.8);
        assert_eq!(point.y(), 1.5);
        assert_eq!(Coordinate::from(point), Coordinate::new(1.5, 103.8));
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = Coordinate::new(0.0, 0.0).distance_to(&Coordinate::new(1.0, 0.0));

        assert!((distance - 111_195.0).abs() < 100.0);
    }
}
