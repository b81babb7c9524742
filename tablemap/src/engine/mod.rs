//! Contrat de capacités du moteur de rendu cartographique
//!
//! Le moteur (sources, layers, clustering, caméra) est consommé uniquement à
//! travers le trait [`MapEngine`] ; le moteur réel comme le moteur de trace
//! des tests l'implémentent. Les événements entrent dans la session sous
//! forme de valeurs [`MapEvent`] relayées par l'hôte — le cœur n'installe
//! jamais de callback dans le moteur.

pub mod trace;

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Erreurs du moteur de rendu
#[derive(Debug, Error)]
pub enum EngineError {
    /// Source inconnue
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    /// Layer inconnu
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    /// Source déjà présente
    #[error("Source already exists: {0}")]
    DuplicateSource(String),

    /// Layer déjà présent
    #[error("Layer already exists: {0}")]
    DuplicateLayer(String),

    /// État de rendu momentanément incohérent (requête pendant un chargement)
    #[error("Engine transient failure: {0}")]
    Transient(String),
}

/// Style de fond de carte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSpec {
    /// Nom du style, tel que rapporté par le moteur
    pub name: String,

    /// URL du document de style
    pub url: String,
}

/// Options de clustering d'une source GeoJSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Zoom maximal auquel les points sont agrégés
    pub max_zoom: u8,

    /// Rayon d'agrégation en pixels
    pub radius: u32,
}

/// Spécification d'une source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// Tuiles vectorielles
    Vector { url: String },

    /// Données GeoJSON, avec clustering optionnel
    GeoJson {
        data: FeatureCollection,
        cluster: Option<ClusterSpec>,
    },

    /// Image géoréférencée par ses quatre coins
    Image {
        url: String,
        coordinates: [[f64; 2]; 4],
    },
}

/// Genre de layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Background,
    Fill,
    Line,
    Symbol,
    Circle,
    Raster,
}

/// Spécification d'un layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    /// Identifiant du layer
    pub id: String,

    /// Genre de layer
    pub kind: LayerKind,

    /// Source référencée (None pour un layer background)
    pub source: Option<String>,

    /// Sous-couche d'une source vectorielle
    pub source_layer: Option<String>,

    /// Propriétés de layout, dont `visibility`
    pub layout: serde_json::Value,

    /// Propriétés de peinture
    pub paint: serde_json::Value,

    /// Filtre d'expression
    pub filter: Option<serde_json::Value>,
}

/// Feature rendue, telle que rapportée par les requêtes du moteur
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFeature {
    /// Id attribué par le moteur — présent sur les clusters, absent sur les
    /// membres individuels
    #[serde(default)]
    pub id: Option<u64>,

    /// Source d'origine
    pub source: String,

    /// Layer d'origine, si connu
    #[serde(default)]
    pub layer: Option<String>,

    /// Propriétés portées par la feature
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl RenderedFeature {
    /// Propriété `id` — l'identifiant d'enregistrement
    pub fn record_id(&self) -> Option<&str> {
        self.properties.get("id").and_then(|v| v.as_str())
    }
}

/// Événements émis par le moteur, relayés par l'hôte vers la session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    /// Chargement initial terminé
    Load,

    /// Nouveau style chargé, après un rechargement destructif
    StyleLoad,

    /// Clic sur la carte
    Click { point: [f64; 2] },

    /// Déplacement de la caméra en cours
    Move,

    /// Fin de zoom
    ZoomEnd,

    /// Fin de déplacement
    MoveEnd,

    /// Données d'une source modifiées
    SourceData { source_id: String },

    /// L'overlay de dessin signale un changement d'activité de tracé
    DrawStateChanged { drawing: bool },
}

/// Contrat de capacités du moteur de rendu
pub trait MapEngine {
    /// Ajoute une source nommée
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError>;

    /// Vrai si la source existe
    fn has_source(&self, id: &str) -> bool;

    /// Retire une source
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Ajoute un layer nommé
    fn add_layer(&mut self, spec: LayerSpec) -> Result<(), EngineError>;

    /// Vrai si le layer existe
    fn has_layer(&self, id: &str) -> bool;

    /// Retire un layer
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;

    /// Modifie une propriété de layout (`visibility` notamment)
    fn set_layout_property(
        &mut self,
        layer: &str,
        name: &str,
        value: serde_json::Value,
    ) -> Result<(), EngineError>;

    /// Remplace les données d'une source GeoJSON
    fn set_source_data(
        &mut self,
        source: &str,
        data: FeatureCollection,
    ) -> Result<(), EngineError>;

    /// Recharge le style de fond — destructif pour tout ce qui a été ajouté
    fn set_style(&mut self, style: &StyleSpec);

    /// Nom du style actuellement actif
    fn style_name(&self) -> &str;

    /// Features rendues sous un point écran, éventuellement filtrées par layer
    fn query_rendered_features(
        &self,
        point: [f64; 2],
        layers: Option<&[&str]>,
    ) -> Result<Vec<RenderedFeature>, EngineError>;

    /// Features actuellement rendues d'une source (membres et clusters)
    fn query_source_features(&self, source: &str) -> Result<Vec<RenderedFeature>, EngineError>;

    /// Cadre la vue sur une emprise
    fn fit_bounds(&mut self, bounds: geo::Rect<f64>, padding: f64);
}
