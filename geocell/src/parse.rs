//! Décodage des cellules géométrie (objet GeoJSON sérialisé)

use geo::Geometry;

use crate::GeocellError;

/// Décode la géométrie stockée dans une cellule texte.
///
/// La cellule contient un objet géométrie GeoJSON nu (jamais une `Feature`
/// complète). Une cellule vide ou un littéral `null` ne décrivent aucune
/// forme et sont rejetés, au même titre qu'un JSON malformé.
pub fn parse_geometry(raw: &str) -> Result<Geometry<f64>, GeocellError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GeocellError::EmptyCell);
    }

    let value: serde_json::Value =
        serde_json::from_str(trimmed).map_err(|e| GeocellError::InvalidJson(e.to_string()))?;

    if value.is_null() {
        return Err(GeocellError::NullGeometry);
    }

    let geometry: geojson::Geometry =
        serde_json::from_value(value).map_err(|e| GeocellError::NotAGeometry(e.to_string()))?;

    Geometry::<f64>::try_from(geometry).map_err(|e| GeocellError::NotAGeometry(e.to_string()))
}
