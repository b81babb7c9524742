//! Moteur de trace : implémentation en mémoire du contrat moteur
//!
//! Tient l'état (style, sources, layers) comme le ferait le moteur réel —
//! y compris la destruction des ajouts lors d'un rechargement de style — et
//! journalise chaque opération reçue. Les requêtes de rendu répondent avec
//! des réponses scriptées. Utilisé par les tests d'intégration et la
//! commande `replay`.

use std::collections::HashMap;

use geojson::FeatureCollection;

use super::{EngineError, LayerSpec, MapEngine, RenderedFeature, SourceSpec, StyleSpec};

/// Opération journalisée par le moteur de trace
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    AddSource(String),
    RemoveSource(String),
    AddLayer(String),
    RemoveLayer(String),
    SetLayout {
        layer: String,
        name: String,
        value: serde_json::Value,
    },
    SetData {
        source: String,
        features: usize,
    },
    SetStyle(String),
    FitBounds {
        min: [f64; 2],
        max: [f64; 2],
    },
}

/// Moteur en mémoire qui journalise les opérations
pub struct TraceEngine {
    style: StyleSpec,
    sources: HashMap<String, SourceSpec>,
    layers: Vec<LayerSpec>,

    /// Journal des opérations, dans l'ordre d'émission
    pub ops: Vec<EngineOp>,

    rendered: Vec<RenderedFeature>,
    source_features: HashMap<String, Vec<RenderedFeature>>,
    fail_source_queries: bool,
}

impl TraceEngine {
    /// Crée un moteur affichant déjà le style donné
    pub fn new(style: StyleSpec) -> Self {
        Self {
            style,
            sources: HashMap::new(),
            layers: Vec::new(),
            ops: Vec::new(),
            rendered: Vec::new(),
            source_features: HashMap::new(),
            fail_source_queries: false,
        }
    }

    /// Scripte les features rendues sous le curseur
    pub fn script_rendered(&mut self, features: Vec<RenderedFeature>) {
        self.rendered = features;
    }

    /// Scripte les features rendues d'une source
    pub fn script_source_features(&mut self, source: &str, features: Vec<RenderedFeature>) {
        self.source_features.insert(source.to_string(), features);
    }

    /// Simule un moteur momentanément incohérent
    pub fn set_fail_source_queries(&mut self, fail: bool) {
        self.fail_source_queries = fail;
    }

    /// Données GeoJSON actuelles d'une source
    pub fn source_data(&self, id: &str) -> Option<&FeatureCollection> {
        match self.sources.get(id) {
            Some(SourceSpec::GeoJson { data, .. }) => Some(data),
            _ => None,
        }
    }

    /// Ids des layers présents, dans l'ordre d'ajout
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.id.as_str()).collect()
    }

    /// Valeur de layout courante d'un layer
    pub fn layout_value(&self, layer: &str, name: &str) -> Option<serde_json::Value> {
        self.layers
            .iter()
            .find(|l| l.id == layer)
            .and_then(|l| l.layout.get(name))
            .cloned()
    }

    /// Vide le journal d'opérations
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl MapEngine for TraceEngine {
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError> {
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), spec);
        self.ops.push(EngineOp::AddSource(id.to_string()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        if self.sources.remove(id).is_none() {
            return Err(EngineError::UnknownSource(id.to_string()));
        }
        self.ops.push(EngineOp::RemoveSource(id.to_string()));
        Ok(())
    }

    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), EngineError> {
        if self.has_layer(&spec.id) {
            return Err(EngineError::DuplicateLayer(spec.id));
        }
        self.ops.push(EngineOp::AddLayer(spec.id.clone()));
        self.layers.push(spec);
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        if self.layers.len() == before {
            return Err(EngineError::UnknownLayer(id.to_string()));
        }
        self.ops.push(EngineOp::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        layer: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError> {
        let Some(spec) = self.layers.iter_mut().find(|l| l.id == layer) else {
            return Err(EngineError::UnknownLayer(layer.to_string()));
        };
        if !spec.layout.is_object() {
            spec.layout = serde_json::json!({});
        }
        if let Some(layout) = spec.layout.as_object_mut() {
            layout.insert(name.to_string(), value.clone());
        }
        self.ops.push(EngineOp::SetLayout {
            layer: layer.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn set_source_data(
        &mut self,
        source: &str,
        data: FeatureCollection,
    ) -> Result<(), EngineError> {
        match self.sources.get_mut(source) {
            Some(SourceSpec::GeoJson { data: current, .. }) => {
                self.ops.push(EngineOp::SetData {
                    source: source.to_string(),
                    features: data.features.len(),
                });
                *current = data;
                Ok(())
            }
            Some(_) => Err(EngineError::Transient(format!(
                "source {source} is not geojson"
            ))),
            None => Err(EngineError::UnknownSource(source.to_string())),
        }
    }

    fn set_style(&mut self, style: &StyleSpec) {
        // Un rechargement de style détruit toutes les sources et layers ajoutés
        self.sources.clear();
        self.layers.clear();
        self.style = style.clone();
        self.ops.push(EngineOp::SetStyle(style.name.clone()));
    }

    fn style_name(&self) -> &str {
        &self.style.name
    }

    fn query_rendered_features(
        &self,
        _point: [f64; 2],
        layers: Option<&[&str]>,
    ) -> Result<Vec<RenderedFeature>, EngineError> {
        let features = match layers {
            None => self.rendered.clone(),
            Some(wanted) => self
                .rendered
                .iter()
                .filter(|f| f.layer.as_deref().is_some_and(|l| wanted.contains(&l)))
                .cloned()
                .collect(),
        };
        Ok(features)
    }

    fn query_source_features(&self, source: &str) -> Result<Vec<RenderedFeature>, EngineError> {
        if self.fail_source_queries {
            return Err(EngineError::Transient("render state inconsistent".to_string()));
        }
        Ok(self
            .source_features
            .get(source)
            .cloned()
            .unwrap_or_default())
    }

    fn fit_bounds(&mut self, bounds: geo::Rect<f64>, _padding: f64) {
        self.ops.push(EngineOp::FitBounds {
            min: [bounds.min().x, bounds.min().y],
            max: [bounds.max().x, bounds.max().y],
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::empty_collection;

    fn style() -> StyleSpec {
        StyleSpec {
            name: "Thematic".to_string(),
            url: "https://example.test/style.json".to_string(),
        }
    }

    #[test]
    fn test_style_reload_destroys_additions() {
        let mut engine = TraceEngine::new(style());
        engine
            .add_source(
                "places",
                SourceSpec::GeoJson {
                    data: empty_collection(),
                    cluster: None,
                },
            )
            .unwrap();
        assert!(engine.has_source("places"));

        engine.set_style(&StyleSpec {
            name: "Outdoors".to_string(),
            url: "scheme://outdoors".to_string(),
        });

        assert!(!engine.has_source("places"));
        assert_eq!(engine.style_name(), "Outdoors");
    }

    #[test]
    fn test_set_data_requires_existing_source() {
        let mut engine = TraceEngine::new(style());
        let result = engine.set_source_data("places", empty_collection());
        assert!(matches!(result, Err(EngineError::UnknownSource(_))));
    }

    #[test]
    fn test_transient_query_failure() {
        let mut engine = TraceEngine::new(style());
        engine.set_fail_source_queries(true);
        assert!(matches!(
            engine.query_source_features("labels"),
            Err(EngineError::Transient(_))
        ));
    }
}
