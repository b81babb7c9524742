//! Calcul du point d'ancrage des étiquettes
//!
//! Un point fournit directement son ancre. Pour une ligne on prend le milieu
//! curviligne (toujours sur la ligne). Pour un polygone le centroïde peut
//! tomber hors de la forme (polygones concaves, en L, en U) : on approche le
//! pôle d'inaccessibilité par une recherche en grille avec raffinement, qui
//! garantit un point intérieur et un résultat déterministe.

use std::collections::BinaryHeap;

use geo::{Area, BoundingRect, Centroid, Contains, Coord, Geometry, LineString, Point, Polygon};
use tracing::warn;

use crate::GeocellError;

/// Précision relative de la recherche du pôle (fraction du petit côté du bbox)
const POLE_PRECISION: f64 = 1e-3;

/// Retourne la coordonnée d'ancrage de l'étiquette d'une géométrie.
///
/// Les géométries multiples sont résolues sur un membre unique, choisi de
/// façon stable : le plus long pour les lignes, le plus étendu pour les
/// polygones, le premier pour les points et les collections.
pub fn label_anchor(geometry: &Geometry<f64>) -> Result<Coord<f64>, GeocellError> {
    match geometry {
        Geometry::Point(p) => Ok(p.0),
        Geometry::MultiPoint(mp) => mp
            .0
            .first()
            .map(|p| p.0)
            .ok_or(GeocellError::EmptyGeometry),
        Geometry::Line(line) => Ok(Coord {
            x: (line.start.x + line.end.x) / 2.0,
            y: (line.start.y + line.end.y) / 2.0,
        }),
        Geometry::LineString(ls) => line_midpoint(ls),
        Geometry::MultiLineString(mls) => {
            let longest = mls
                .0
                .iter()
                .max_by(|a, b| line_length(a).total_cmp(&line_length(b)))
                .ok_or(GeocellError::EmptyGeometry)?;
            line_midpoint(longest)
        }
        Geometry::Polygon(poly) => pole_of_inaccessibility(poly),
        Geometry::MultiPolygon(mp) => {
            let largest = mp
                .0
                .iter()
                .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
                .ok_or(GeocellError::EmptyGeometry)?;
            pole_of_inaccessibility(largest)
        }
        Geometry::Rect(r) => Ok(r.center()),
        Geometry::Triangle(t) => Ok(t.centroid().0),
        Geometry::GeometryCollection(gc) => gc
            .0
            .first()
            .ok_or(GeocellError::EmptyGeometry)
            .and_then(label_anchor),
    }
}

/// Point au milieu curviligne d'une ligne (garanti sur la ligne)
fn line_midpoint(ls: &LineString<f64>) -> Result<Coord<f64>, GeocellError> {
    let coords = &ls.0;
    if coords.is_empty() {
        return Err(GeocellError::EmptyGeometry);
    }
    if coords.len() == 1 {
        return Ok(coords[0]);
    }

    let total = line_length(ls);
    if total == 0.0 {
        return Ok(coords[0]);
    }

    let half = total / 2.0;
    let mut walked = 0.0;
    for pair in coords.windows(2) {
        let len = segment_length(pair[0], pair[1]);
        if walked + len >= half {
            let t = if len == 0.0 { 0.0 } else { (half - walked) / len };
            return Ok(Coord {
                x: pair[0].x + (pair[1].x - pair[0].x) * t,
                y: pair[0].y + (pair[1].y - pair[0].y) * t,
            });
        }
        walked += len;
    }

    Ok(coords[coords.len() - 1])
}

fn line_length(ls: &LineString<f64>) -> f64 {
    ls.0.windows(2)
        .map(|pair| segment_length(pair[0], pair[1]))
        .sum()
}

fn segment_length(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Cellule de la recherche en grille
#[derive(Debug, Clone)]
struct Cell {
    x: f64,
    y: f64,
    /// Demi-côté de la cellule
    h: f64,
    /// Distance signée du centre au bord du polygone (négative dehors)
    dist: f64,
    /// Meilleure distance atteignable dans la cellule
    max: f64,
}

impl Cell {
    fn new(x: f64, y: f64, h: f64, polygon: &Polygon<f64>) -> Self {
        let dist = signed_distance(x, y, polygon);
        Self {
            x,
            y,
            h,
            dist,
            max: dist + h * std::f64::consts::SQRT_2,
        }
    }
}

// Ordre sur `max` pour le tas binaire (les cellules prometteuses d'abord)
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.max == other.max
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.max.total_cmp(&other.max)
    }
}

/// Pôle d'inaccessibilité approché d'un polygone.
///
/// Recherche en grille avec raffinement par quadrants : on part d'une grille
/// couvrant le bbox, on garde la meilleure distance intérieure connue et on ne
/// subdivise que les cellules qui peuvent encore la battre. Le parcours est
/// entièrement déterministe pour une géométrie donnée.
fn pole_of_inaccessibility(polygon: &Polygon<f64>) -> Result<Coord<f64>, GeocellError> {
    let bbox = polygon
        .bounding_rect()
        .ok_or(GeocellError::EmptyGeometry)?;

    let width = bbox.width();
    let height = bbox.height();
    let cell_size = width.min(height);
    if cell_size == 0.0 {
        // Polygone dégénéré (aplati sur un segment ou un point)
        warn!(width, height, "Degenerate polygon, anchoring on bbox corner");
        return Ok(bbox.min());
    }

    let precision = cell_size * POLE_PRECISION;
    let h = cell_size / 2.0;

    // Grille initiale couvrant le bbox
    let mut queue = BinaryHeap::new();
    let mut x = bbox.min().x;
    while x < bbox.max().x {
        let mut y = bbox.min().y;
        while y < bbox.max().y {
            queue.push(Cell::new(x + h, y + h, h, polygon));
            y += cell_size;
        }
        x += cell_size;
    }

    // Candidats initiaux : centroïde puis centre du bbox
    let center = bbox.center();
    let mut best = match polygon.centroid() {
        Some(c) => Cell::new(c.x(), c.y(), 0.0, polygon),
        None => Cell::new(center.x, center.y, 0.0, polygon),
    };
    let center_cell = Cell::new(center.x, center.y, 0.0, polygon);
    if center_cell.dist > best.dist {
        best = center_cell;
    }

    while let Some(cell) = queue.pop() {
        if cell.dist > best.dist {
            best = cell.clone();
        }

        if cell.max - best.dist <= precision {
            // Plus aucune cellule ne peut améliorer le résultat
            break;
        }

        let h2 = cell.h / 2.0;
        queue.push(Cell::new(cell.x - h2, cell.y - h2, h2, polygon));
        queue.push(Cell::new(cell.x + h2, cell.y - h2, h2, polygon));
        queue.push(Cell::new(cell.x - h2, cell.y + h2, h2, polygon));
        queue.push(Cell::new(cell.x + h2, cell.y + h2, h2, polygon));
    }

    Ok(Coord {
        x: best.x,
        y: best.y,
    })
}

/// Distance signée d'un point au bord du polygone (positive à l'intérieur)
fn signed_distance(x: f64, y: f64, polygon: &Polygon<f64>) -> f64 {
    let point = Point::new(x, y);
    let mut min_dist = f64::MAX;

    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        for pair in ring.0.windows(2) {
            let d = point_segment_distance(point.0, pair[0], pair[1]);
            if d < min_dist {
                min_dist = d;
            }
        }
    }

    if polygon.contains(&point) {
        min_dist
    } else {
        -min_dist
    }
}

fn point_segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len2 = dx * dx + dy * dy;

    let t = if len2 == 0.0 {
        0.0
    } else {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    };

    let proj = Coord {
        x: a.x + dx * t,
        y: a.y + dy * t,
    };
    segment_length(p, proj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, polygon, MultiPolygon};

    #[test]
    fn test_point_anchor_is_the_point() {
        let geom = Geometry::Point(Point::new(10.0, 20.0));
        let anchor = label_anchor(&geom).unwrap();
        assert_eq!(anchor, Coord { x: 10.0, y: 20.0 });
    }

    #[test]
    fn test_square_anchor_is_near_center() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let anchor = label_anchor(&Geometry::Polygon(poly.clone())).unwrap();
        assert!((anchor.x - 5.0).abs() < 0.1);
        assert!((anchor.y - 5.0).abs() < 0.1);
        assert!(poly.contains(&Point::new(anchor.x, anchor.y)));
    }

    #[test]
    fn test_concave_anchor_stays_inside() {
        // Polygone en U : le centroïde tombe dans le creux, hors de la forme
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 8.0, y: 10.0),
            (x: 8.0, y: 2.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let anchor = label_anchor(&Geometry::Polygon(poly.clone())).unwrap();
        assert!(poly.contains(&Point::new(anchor.x, anchor.y)));
    }

    #[test]
    fn test_anchor_deterministic() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 7.0, y: 1.0),
            (x: 9.0, y: 6.0),
            (x: 3.0, y: 9.0),
            (x: -1.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ];
        let a = label_anchor(&Geometry::Polygon(poly.clone())).unwrap();
        let b = label_anchor(&Geometry::Polygon(poly)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_linestring_anchor_on_segment() {
        let ls = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
        ];
        let anchor = label_anchor(&Geometry::LineString(ls)).unwrap();
        assert_eq!(anchor, Coord { x: 5.0, y: 0.0 });
    }

    #[test]
    fn test_linestring_midpoint_walks_segments() {
        // Longueurs 10 + 10 : le milieu est au coude
        let ls = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
        ];
        let anchor = label_anchor(&Geometry::LineString(ls)).unwrap();
        assert!((anchor.x - 10.0).abs() < 1e-9);
        assert!(anchor.y.abs() < 1e-9);
    }

    #[test]
    fn test_multipolygon_uses_largest_member() {
        let small = polygon![
            (x: 100.0, y: 100.0),
            (x: 101.0, y: 100.0),
            (x: 101.0, y: 101.0),
            (x: 100.0, y: 100.0),
        ];
        let large = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let geom = Geometry::MultiPolygon(MultiPolygon(vec![small, large]));
        let anchor = label_anchor(&geom).unwrap();
        assert!(anchor.x < 50.0, "Should anchor in the large member");
    }

    #[test]
    fn test_empty_geometry_is_an_error() {
        let geom = Geometry::MultiPoint(geo::MultiPoint(vec![]));
        assert!(matches!(
            label_anchor(&geom),
            Err(GeocellError::EmptyGeometry)
        ));
    }
}
