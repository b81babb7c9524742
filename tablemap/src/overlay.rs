//! Synchronisation des images géoréférencées
//!
//! Les ancres d'images viennent d'un jeu d'enregistrements secondaire,
//! indépendant de la table principale. Elles ne sont posées sur la carte que
//! quand l'affichage est activé, et le recalcul est conditionné à un vrai
//! changement de valeurs pour éviter le va-et-vient de sources.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ImagesConfig;
use crate::engine::{LayerKind, LayerSpec, MapEngine, SourceSpec};
use crate::record::Record;

/// Ancre d'image géoréférencée
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Id de l'enregistrement source
    pub id: String,

    /// URL de l'image
    pub url: String,

    /// Quatre coins : haut-gauche, haut-droit, bas-droit, bas-gauche
    pub corners: [[f64; 2]; 4],
}

/// Extrait les ancres d'images d'un jeu d'enregistrements bruts.
///
/// Les enregistrements incomplets — URL absente, coin manquant ou illisible —
/// sont ignorés.
pub fn records_from_cells(records: &[Record], config: &ImagesConfig) -> Vec<ImageRecord> {
    records
        .iter()
        .filter_map(|record| {
            let url = record.cell(&config.url_field)?.trim().to_string();
            if url.is_empty() {
                return None;
            }
            let mut corners = [[0.0; 2]; 4];
            for (i, field) in config.corner_fields.iter().enumerate() {
                corners[i] = parse_corner(record.cell(field)?)?;
            }
            Some(ImageRecord {
                id: record.id.clone(),
                url,
                corners,
            })
        })
        .collect()
}

/// Décode un coin « lon,lat »
fn parse_corner(raw: &str) -> Option<[f64; 2]> {
    let mut parts = raw.split(',');
    let x = parts.next()?.trim().parse().ok()?;
    let y = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some([x, y])
}

/// Synchronise les sources d'images avec le moteur
#[derive(Debug, Default)]
pub struct ImageOverlay {
    shown: bool,
    last: Vec<ImageRecord>,
    /// Ids des enregistrements dont la source est actuellement posée
    added: Vec<String>,
}

impl ImageOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vrai si l'overlay est affiché
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Synchronise l'état des sources d'images.
    ///
    /// Affichage coupé : toutes les sources posées sont retirées. Affichage
    /// actif : les sources ne sont reconstruites que si le jeu
    /// d'enregistrements a réellement changé.
    pub fn sync<E: MapEngine>(&mut self, engine: &mut E, records: &[ImageRecord], show: bool) {
        if !show {
            if !self.added.is_empty() {
                self.remove_all(engine);
            }
            self.shown = false;
            return;
        }

        if self.shown && self.last == records {
            debug!(count = records.len(), "Image records unchanged, skipping");
            return;
        }

        self.remove_all(engine);
        for record in records {
            let source_id = image_source_id(&record.id);
            if let Err(e) = engine.add_source(
                &source_id,
                SourceSpec::Image {
                    url: record.url.clone(),
                    coordinates: record.corners,
                },
            ) {
                warn!(record = %record.id, error = %e, "Image source rejected");
                continue;
            }
            if let Err(e) = engine.add_layer(LayerSpec {
                id: image_layer_id(&record.id),
                kind: LayerKind::Raster,
                source: Some(source_id),
                source_layer: None,
                layout: serde_json::json!({}),
                paint: serde_json::json!({ "raster-opacity": 0.85 }),
                filter: None,
            }) {
                warn!(record = %record.id, error = %e, "Image layer rejected");
            }
            self.added.push(record.id.clone());
        }
        self.last = records.to_vec();
        self.shown = true;
    }

    /// Repose les sources après un rechargement de style destructif
    pub fn reapply<E: MapEngine>(&mut self, engine: &mut E) {
        if !self.shown {
            return;
        }
        // Les sources n'ont pas survécu au rechargement
        self.added.clear();
        self.shown = false;
        let records = std::mem::take(&mut self.last);
        self.sync(engine, &records, true);
    }

    fn remove_all<E: MapEngine>(&mut self, engine: &mut E) {
        for record_id in self.added.drain(..) {
            let layer_id = image_layer_id(&record_id);
            let source_id = image_source_id(&record_id);
            if engine.has_layer(&layer_id) {
                engine.remove_layer(&layer_id).ok();
            }
            if engine.has_source(&source_id) {
                engine.remove_source(&source_id).ok();
            }
        }
    }
}

fn image_source_id(record_id: &str) -> String {
    format!("image-{record_id}")
}

fn image_layer_id(record_id: &str) -> String {
    format!("image-{record_id}-raster")
}
