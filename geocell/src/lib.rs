//! # geocell
//!
//! Décodage des cellules géométrie d'un jeu d'enregistrements tabulaire et
//! calculs géométriques purs pour l'affichage cartographique.
//!
//! ## Features
//!
//! - Décodage GeoJSON des cellules texte (objet géométrie nu, jamais une Feature)
//! - Ancre d'étiquette déterministe, pôle d'inaccessibilité pour les polygones
//! - Emprises et fusion d'emprises pour le cadrage de la vue
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! let cell = geocell::parse_cell(r#"{"type":"Point","coordinates":[10.0,20.0]}"#)?;
//! println!("ancre: {:?}", cell.anchor);
//! ```

pub mod anchor;
pub mod bounds;
pub mod error;
pub mod parse;

pub use anchor::label_anchor;
pub use bounds::{combined_bounds, geometry_bounds, merge_bounds};
pub use error::GeocellError;
pub use parse::parse_geometry;

use geo::{Coord, Geometry};

/// Cellule géométrie décodée, prête pour la construction d'une feature
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCell {
    /// Géométrie décodée
    pub geometry: Geometry<f64>,

    /// Ancre de l'étiquette
    pub anchor: Coord<f64>,
}

/// Décode une cellule et calcule son ancre d'étiquette.
///
/// # Errors
///
/// Retourne `GeocellError` si la cellule est vide, n'est pas du JSON, contient
/// `null`, n'est pas un objet géométrie, ou ne porte aucune coordonnée.
pub fn parse_cell(raw: &str) -> Result<ParsedCell, GeocellError> {
    let geometry = parse::parse_geometry(raw)?;
    let anchor = anchor::label_anchor(&geometry)?;
    Ok(ParsedCell { geometry, anchor })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell_point() {
        let cell = parse_cell(r#"{"type":"Point","coordinates":[10.0,20.0]}"#).unwrap();
        assert_eq!(cell.anchor, Coord { x: 10.0, y: 20.0 });
    }

    #[test]
    fn test_parse_cell_bad_json() {
        assert!(parse_cell("{bad json").is_err());
    }
}
