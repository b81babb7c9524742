//! Emprises des géométries pour le cadrage de la vue

use geo::{BoundingRect, Coord, Geometry, Rect};

/// Emprise d'une géométrie, si elle porte au moins une coordonnée
pub fn geometry_bounds(geometry: &Geometry<f64>) -> Option<Rect<f64>> {
    geometry.bounding_rect()
}

/// Fusionne deux emprises
pub fn merge_bounds(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Emprise totale d'un ensemble de géométries
pub fn combined_bounds<'a, I>(geometries: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut acc: Option<Rect<f64>> = None;
    for geometry in geometries {
        if let Some(rect) = geometry_bounds(geometry) {
            acc = Some(match acc {
                Some(prev) => merge_bounds(prev, rect),
                None => rect,
            });
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Point};

    #[test]
    fn test_point_bounds() {
        let rect = geometry_bounds(&Geometry::Point(Point::new(3.0, 4.0))).unwrap();
        assert_eq!(rect.min(), Coord { x: 3.0, y: 4.0 });
        assert_eq!(rect.max(), Coord { x: 3.0, y: 4.0 });
    }

    #[test]
    fn test_merge_bounds() {
        let a = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 2.0, y: 2.0 });
        let b = Rect::new(Coord { x: 1.0, y: -1.0 }, Coord { x: 5.0, y: 1.0 });
        let merged = merge_bounds(a, b);
        assert_eq!(merged.min(), Coord { x: 0.0, y: -1.0 });
        assert_eq!(merged.max(), Coord { x: 5.0, y: 2.0 });
    }

    #[test]
    fn test_combined_bounds() {
        let geoms = vec![
            Geometry::Point(Point::new(10.0, 10.0)),
            Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 0.0),
            ]),
        ];
        let rect = combined_bounds(geoms.iter()).unwrap();
        assert_eq!(rect.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(rect.max(), Coord { x: 10.0, y: 10.0 });
    }

    #[test]
    fn test_combined_bounds_empty() {
        assert!(combined_bounds(std::iter::empty()).is_none());
    }
}
