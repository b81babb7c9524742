//! Réconciliation du layer d'étiquettes clusterisé avec le layer détail
//!
//! Le moteur agrège les étiquettes en clusters selon le zoom et sait
//! rapporter quels membres individuels sont réellement rendus. À chaque
//! déclenchement débouncé — données d'étiquettes, fin de zoom, fin de
//! déplacement — le dataset détail est reconstruit à partir de ces membres.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use geojson::{Feature, FeatureCollection};
use tracing::debug;

use crate::engine::MapEngine;
use crate::layers::{LABELS_SOURCE, PLACES_SOURCE};

/// Délai de coalescence des déclenchements de réconciliation
pub const LABEL_DEBOUNCE: Duration = Duration::from_millis(500);

/// Coalesce une rafale de déclenchements en une action différée unique
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Arme ou repousse l'échéance
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Vrai si une action est en attente
    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consomme l'échéance si elle est atteinte
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Reconstruit le dataset détail depuis les membres d'étiquettes rendus.
///
/// Les clusters portent un id moteur et sont écartés ; les membres réels
/// n'en ont pas. Les tuiles voisines peuvent rapporter plusieurs fois le
/// même membre : on ne garde que la première occurrence de chaque id.
///
/// Tout échec est avalé — moteur momentanément incohérent, feature embarquée
/// illisible — et le dataset détail précédent reste affiché tel quel.
/// Retourne le nombre de features poussées, None si la passe a été abandonnée.
pub fn reconcile<E: MapEngine>(engine: &mut E) -> Option<usize> {
    let rendered = match engine.query_source_features(LABELS_SOURCE) {
        Ok(rendered) => rendered,
        Err(e) => {
            debug!(error = %e, "Label query failed, keeping previous detail dataset");
            return None;
        }
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut features: Vec<Feature> = Vec::new();
    for rendered_feature in rendered {
        if rendered_feature.id.is_some() {
            continue;
        }
        let Some(record_id) = rendered_feature.record_id() else {
            continue;
        };
        if !seen.insert(record_id.to_string()) {
            continue;
        }

        let Some(original) = rendered_feature
            .properties
            .get("original")
            .and_then(|v| v.as_str())
        else {
            continue;
        };
        match serde_json::from_str::<Feature>(original) {
            Ok(feature) => features.push(feature),
            Err(e) => {
                debug!(record = record_id, error = %e, "Unreadable embedded feature, aborting pass");
                return None;
            }
        }
    }

    let count = features.len();
    let data = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    match engine.set_source_data(PLACES_SOURCE, data) {
        Ok(()) => Some(count),
        Err(e) => {
            debug!(error = %e, "Detail dataset push failed");
            None
        }
    }
}
