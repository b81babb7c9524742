//! Sources et layers cartographiques du système
//!
//! Les données ne sont généralement pas disponibles au premier rendu : les
//! sources GeoJSON sont créées vides puis alimentées par les passes de
//! synchronisation. L'installation est idempotente, car elle est rejouée
//! après chaque rechargement de style.

use serde_json::json;
use tracing::debug;

use crate::engine::{ClusterSpec, EngineError, LayerKind, LayerSpec, MapEngine, SourceSpec};
use crate::feature::empty_collection;

/// Source GeoJSON détail (features complètes, non clusterisée)
pub const PLACES_SOURCE: &str = "places";

/// Source GeoJSON des étiquettes (clusterisée)
pub const LABELS_SOURCE: &str = "labels";

/// Source vectorielle des structures (frontières, routes, bâtiments)
pub const STREETS_SOURCE: &str = "streets";

/// Layer cliquable des formes
pub const PLACES_FILL_LAYER: &str = "places-fill";

/// Contour des formes
pub const PLACES_LINE_LAYER: &str = "places-line";

/// Layer texte des étiquettes non clusterisées
pub const LABELS_TEXT_LAYER: &str = "labels-text";

/// Cercles des clusters d'étiquettes
pub const CLUSTERS_LAYER: &str = "labels-clusters";

/// Compteur affiché sur les clusters
pub const CLUSTER_COUNT_LAYER: &str = "labels-cluster-count";

/// Fond uni de la variante « plain »
pub const WHITE_LAYER: &str = "white-backdrop";

/// Layers de structures, pilotés par la variante de fond de carte
pub const STRUCTURE_LAYERS: [&str; 4] = [
    "structures-admin",
    "structures-aeroway",
    "structures-building",
    "structures-road",
];

const STREETS_URL: &str = "mapbox://mapbox.mapbox-streets-v8";

/// Ajoute les sources absentes
pub fn add_custom_sources<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    if !engine.has_source(STREETS_SOURCE) {
        engine.add_source(
            STREETS_SOURCE,
            SourceSpec::Vector {
                url: STREETS_URL.to_string(),
            },
        )?;
    }

    if !engine.has_source(PLACES_SOURCE) {
        engine.add_source(
            PLACES_SOURCE,
            SourceSpec::GeoJson {
                data: empty_collection(),
                cluster: None,
            },
        )?;
    }

    if !engine.has_source(LABELS_SOURCE) {
        engine.add_source(
            LABELS_SOURCE,
            SourceSpec::GeoJson {
                data: empty_collection(),
                cluster: Some(ClusterSpec {
                    max_zoom: 14,
                    radius: 25,
                }),
            },
        )?;
    }

    Ok(())
}

/// Retire un layer s'il existe
pub fn remove_if_exists<E: MapEngine>(layer: &str, engine: &mut E) {
    if engine.has_layer(layer) {
        if let Err(e) = engine.remove_layer(layer) {
            debug!(layer, error = %e, "Layer removal failed");
        }
    }
}

/// Ajoute l'ensemble des layers du système : structures, fond uni, formes,
/// étiquettes et clusters
pub fn add_custom_layers<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    add_structure_layers(engine)?;
    add_white_layer(engine)?;
    add_places_layers(engine)?;
    add_label_layers(engine)?;
    Ok(())
}

/// Bascule la visibilité des layers de structures
pub fn set_structure_visibility<E: MapEngine>(
    engine: &mut E,
    visible: bool,
) -> Result<(), EngineError> {
    let value = if visible { "visible" } else { "none" };
    for layer in STRUCTURE_LAYERS {
        engine.set_layout_property(layer, "visibility", json!(value))?;
    }
    Ok(())
}

/// Bascule la visibilité du fond uni
pub fn set_white_visibility<E: MapEngine>(
    engine: &mut E,
    visible: bool,
) -> Result<(), EngineError> {
    let value = if visible { "visible" } else { "none" };
    engine.set_layout_property(WHITE_LAYER, "visibility", json!(value))
}

fn add_structure_layers<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    remove_if_exists("structures-admin", engine);
    engine.add_layer(LayerSpec {
        id: "structures-admin".to_string(),
        kind: LayerKind::Line,
        source: Some(STREETS_SOURCE.to_string()),
        source_layer: Some("admin".to_string()),
        layout: json!({ "visibility": "none" }),
        paint: json!({ "line-color": "rgba(255, 187, 0, 1)", "line-width": 2 }),
        filter: Some(json!(["==", ["get", "admin_level"], 0])),
    })?;

    remove_if_exists("structures-aeroway", engine);
    engine.add_layer(LayerSpec {
        id: "structures-aeroway".to_string(),
        kind: LayerKind::Line,
        source: Some(STREETS_SOURCE.to_string()),
        source_layer: Some("aeroway".to_string()),
        layout: json!({ "visibility": "none" }),
        paint: json!({ "line-color": "#ffffff" }),
        filter: None,
    })?;

    remove_if_exists("structures-building", engine);
    engine.add_layer(LayerSpec {
        id: "structures-building".to_string(),
        kind: LayerKind::Fill,
        source: Some(STREETS_SOURCE.to_string()),
        source_layer: Some("building".to_string()),
        layout: json!({ "visibility": "none" }),
        paint: json!({}),
        filter: None,
    })?;

    remove_if_exists("structures-road", engine);
    engine.add_layer(LayerSpec {
        id: "structures-road".to_string(),
        kind: LayerKind::Line,
        source: Some(STREETS_SOURCE.to_string()),
        source_layer: Some("road".to_string()),
        layout: json!({ "visibility": "none" }),
        paint: json!({ "line-color": "#ffffff" }),
        filter: None,
    })?;

    Ok(())
}

fn add_white_layer<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    remove_if_exists(WHITE_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: WHITE_LAYER.to_string(),
        kind: LayerKind::Background,
        source: None,
        source_layer: None,
        layout: json!({ "visibility": "none" }),
        paint: json!({ "background-color": "white" }),
        filter: None,
    })
}

fn add_places_layers<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    // Couleur : sélection, sinon couleur par enregistrement, sinon défaut.
    // Une feature `invisible` (édition en cours) reste dans le dataset mais
    // s'efface par opacité.
    let color_expr = json!([
        "case",
        ["boolean", ["get", "selected"], false],
        "#e55e5e",
        ["coalesce", ["get", "color"], "#627bc1"]
    ]);
    let hidden = json!(["boolean", ["get", "invisible"], false]);

    remove_if_exists(PLACES_FILL_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: PLACES_FILL_LAYER.to_string(),
        kind: LayerKind::Fill,
        source: Some(PLACES_SOURCE.to_string()),
        source_layer: None,
        layout: json!({}),
        paint: json!({
            "fill-color": color_expr,
            "fill-opacity": ["case", hidden, 0.0, 0.45],
        }),
        filter: None,
    })?;

    remove_if_exists(PLACES_LINE_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: PLACES_LINE_LAYER.to_string(),
        kind: LayerKind::Line,
        source: Some(PLACES_SOURCE.to_string()),
        source_layer: None,
        layout: json!({}),
        paint: json!({
            "line-color": color_expr,
            "line-width": ["case", ["boolean", ["get", "selected"], false], 3, 1.5],
            "line-opacity": ["case", hidden, 0.0, 1.0],
        }),
        filter: None,
    })?;

    Ok(())
}

fn add_label_layers<E: MapEngine>(engine: &mut E) -> Result<(), EngineError> {
    remove_if_exists(LABELS_TEXT_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: LABELS_TEXT_LAYER.to_string(),
        kind: LayerKind::Symbol,
        source: Some(LABELS_SOURCE.to_string()),
        source_layer: None,
        layout: json!({
            "text-field": ["get", "name"],
            "text-variable-anchor": ["center"],
            "text-justify": "auto",
            "text-allow-overlap": true,
            "text-size": 14,
        }),
        paint: json!({}),
        filter: Some(json!(["!", ["has", "point_count"]])),
    })?;

    remove_if_exists(CLUSTERS_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: CLUSTERS_LAYER.to_string(),
        kind: LayerKind::Circle,
        source: Some(LABELS_SOURCE.to_string()),
        source_layer: None,
        layout: json!({}),
        paint: json!({
            "circle-color": "#51bbd6",
            "circle-radius": ["step", ["get", "point_count"], 15, 10, 20, 50, 25],
        }),
        filter: Some(json!(["has", "point_count"])),
    })?;

    remove_if_exists(CLUSTER_COUNT_LAYER, engine);
    engine.add_layer(LayerSpec {
        id: CLUSTER_COUNT_LAYER.to_string(),
        kind: LayerKind::Symbol,
        source: Some(LABELS_SOURCE.to_string()),
        source_layer: None,
        layout: json!({
            "text-field": ["get", "point_count_abbreviated"],
            "text-size": 12,
        }),
        paint: json!({}),
        filter: Some(json!(["has", "point_count"])),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::trace::TraceEngine;
    use crate::engine::StyleSpec;

    fn engine() -> TraceEngine {
        TraceEngine::new(StyleSpec {
            name: "Thematic".to_string(),
            url: "https://example.test/style.json".to_string(),
        })
    }

    #[test]
    fn test_add_custom_sources_is_idempotent() {
        let mut engine = engine();
        add_custom_sources(&mut engine).unwrap();
        add_custom_sources(&mut engine).unwrap();

        assert!(engine.has_source(PLACES_SOURCE));
        assert!(engine.has_source(LABELS_SOURCE));
        assert!(engine.has_source(STREETS_SOURCE));
        let adds = engine
            .ops
            .iter()
            .filter(|op| matches!(op, crate::engine::trace::EngineOp::AddSource(_)))
            .count();
        assert_eq!(adds, 3);
    }

    #[test]
    fn test_add_custom_layers_installs_everything() {
        let mut engine = engine();
        add_custom_sources(&mut engine).unwrap();
        add_custom_layers(&mut engine).unwrap();

        for layer in STRUCTURE_LAYERS {
            assert!(engine.has_layer(layer), "missing {layer}");
        }
        for layer in [
            WHITE_LAYER,
            PLACES_FILL_LAYER,
            PLACES_LINE_LAYER,
            LABELS_TEXT_LAYER,
            CLUSTERS_LAYER,
            CLUSTER_COUNT_LAYER,
        ] {
            assert!(engine.has_layer(layer), "missing {layer}");
        }
    }

    #[test]
    fn test_add_custom_layers_replays_after_reload() {
        let mut engine = engine();
        add_custom_sources(&mut engine).unwrap();
        add_custom_layers(&mut engine).unwrap();
        // Rejouer l'installation ne doit pas échouer sur des doublons
        add_custom_layers(&mut engine).unwrap();
        assert!(engine.has_layer(PLACES_FILL_LAYER));
    }

    #[test]
    fn test_structure_visibility_toggle() {
        let mut engine = engine();
        add_custom_sources(&mut engine).unwrap();
        add_custom_layers(&mut engine).unwrap();

        set_structure_visibility(&mut engine, true).unwrap();
        for layer in STRUCTURE_LAYERS {
            assert_eq!(
                engine.layout_value(layer, "visibility").unwrap(),
                serde_json::json!("visible")
            );
        }

        set_structure_visibility(&mut engine, false).unwrap();
        for layer in STRUCTURE_LAYERS {
            assert_eq!(
                engine.layout_value(layer, "visibility").unwrap(),
                serde_json::json!("none")
            );
        }
    }
}
