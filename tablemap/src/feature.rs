//! Features dérivées des enregistrements et datasets GeoJSON du moteur

use geo::Geometry;
use geojson::{feature::Id, Feature, FeatureCollection, JsonObject};
use serde_json::json;

/// Couleur forcée des enregistrements hors de la vue filtrée
pub const MUTED_COLOR: &str = "#878787";

/// Feature dérivée d'un enregistrement, recalculée à chaque passe
#[derive(Debug, Clone, PartialEq)]
pub struct MapFeature {
    /// Identifiant (= id de l'enregistrement)
    pub id: String,

    /// Géométrie décodée
    pub geometry: Geometry<f64>,

    /// Texte de l'étiquette (vide quand les étiquettes sont masquées)
    pub name: String,

    /// L'enregistrement est dans la sélection
    pub selected: bool,

    /// Masquée du layer normal pendant l'édition de cet enregistrement
    pub invisible: bool,

    /// Ancre de l'étiquette
    pub label_point: [f64; 2],

    /// Couleur de remplacement (None = couleur par défaut du layer)
    pub color: Option<String>,
}

impl MapFeature {
    /// Feature GeoJSON complète pour le dataset détail
    pub fn to_geojson(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), json!(self.id));
        properties.insert("name".to_string(), json!(self.name));
        properties.insert("selected".to_string(), json!(self.selected));
        properties.insert("invisible".to_string(), json!(self.invisible));
        properties.insert("labelPoint".to_string(), json!(self.label_point));
        if let Some(color) = &self.color {
            properties.insert("color".to_string(), json!(color));
        }

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: Some(Id::String(self.id.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// Feature ponctuelle pour le dataset étiquettes (source clusterisée).
    ///
    /// La feature complète est embarquée sérialisée dans `original` : le
    /// réconciliateur la reconstruit depuis les membres rendus par le moteur.
    /// Pas d'id au niveau feature — le moteur n'attribue un id qu'aux
    /// clusters, ce qui permet de les distinguer des membres réels.
    pub fn to_label(&self) -> Feature {
        let original = serde_json::to_string(&self.to_geojson()).unwrap_or_default();

        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), json!(self.id));
        properties.insert("name".to_string(), json!(self.name));
        properties.insert("selected".to_string(), json!(self.selected));
        properties.insert("original".to_string(), json!(original));

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![
                self.label_point[0],
                self.label_point[1],
            ]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Dataset détail (source non clusterisée)
pub fn detail_collection(features: &[MapFeature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(MapFeature::to_geojson).collect(),
        foreign_members: None,
    }
}

/// Dataset étiquettes (source clusterisée)
pub fn label_collection(features: &[MapFeature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(MapFeature::to_label).collect(),
        foreign_members: None,
    }
}

/// Collection vide — les sources sont créées avant l'arrivée des données
pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn sample() -> MapFeature {
        MapFeature {
            id: "rec1".to_string(),
            geometry: Geometry::Point(Point::new(10.0, 20.0)),
            name: "Lyon".to_string(),
            selected: true,
            invisible: false,
            label_point: [10.0, 20.0],
            color: Some("#ff0000".to_string()),
        }
    }

    #[test]
    fn test_to_geojson_carries_properties() {
        let feature = sample().to_geojson();
        let props = feature.properties.unwrap();
        assert_eq!(props.get("id").unwrap(), "rec1");
        assert_eq!(props.get("name").unwrap(), "Lyon");
        assert_eq!(props.get("selected").unwrap(), true);
        assert_eq!(props.get("color").unwrap(), "#ff0000");
        assert_eq!(feature.id, Some(Id::String("rec1".to_string())));
    }

    #[test]
    fn test_to_geojson_omits_absent_color() {
        let mut feature = sample();
        feature.color = None;
        let props = feature.to_geojson().properties.unwrap();
        assert!(!props.contains_key("color"));
    }

    #[test]
    fn test_label_has_no_feature_id() {
        let label = sample().to_label();
        assert!(label.id.is_none(), "Only engine clusters may carry an id");
    }

    #[test]
    fn test_label_embeds_readable_original() {
        let label = sample().to_label();
        let props = label.properties.unwrap();
        let original = props.get("original").unwrap().as_str().unwrap();
        let rebuilt: Feature = serde_json::from_str(original).unwrap();
        assert_eq!(rebuilt.id, Some(Id::String("rec1".to_string())));
    }

    #[test]
    fn test_label_geometry_is_the_anchor() {
        let label = sample().to_label();
        match label.geometry.unwrap().value {
            geojson::Value::Point(coords) => assert_eq!(coords, vec![10.0, 20.0]),
            other => panic!("Expected Point, got {:?}", other),
        }
    }
}
