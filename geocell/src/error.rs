//! Types d'erreurs pour le crate geocell

use thiserror::Error;

/// Erreurs pouvant survenir lors du décodage d'une cellule géométrie
#[derive(Debug, Error)]
pub enum GeocellError {
    /// Cellule vide (aucune forme)
    #[error("Empty geometry cell")]
    EmptyCell,

    /// La cellule ne contient pas du JSON valide
    #[error("Invalid geometry JSON: {0}")]
    InvalidJson(String),

    /// La cellule contient le littéral JSON `null`
    #[error("Geometry cell holds JSON null")]
    NullGeometry,

    /// L'objet JSON n'est pas une géométrie GeoJSON
    #[error("Not a GeoJSON geometry object: {0}")]
    NotAGeometry(String),

    /// Géométrie sans aucune coordonnée
    #[error("Geometry has no coordinates")]
    EmptyGeometry,
}
