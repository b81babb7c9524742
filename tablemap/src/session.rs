//! Session de synchronisation : possession du moteur et orchestration
//!
//! La session détient le moteur de rendu pour toute sa durée de vie —
//! acquis par [`MapSession::init`], rendu par [`MapSession::dispose`] sur
//! tous les chemins, y compris un échec d'initialisation (le moteur déplacé
//! est alors détruit par le drop). Tout le travail est coopératif et
//! mono-thread : passes de synchronisation, événements relayés par l'hôte,
//! pompe [`MapSession::poll`] pour les travaux débouncés.

use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::backdrop::{BackdropController, BackdropVariant};
use crate::builder::{build_features, BuildOptions};
use crate::config::MapConfig;
use crate::edit::{EditSession, EditState, DRAW_SOURCE_PREFIX};
use crate::engine::{MapEngine, MapEvent};
use crate::feature::{detail_collection, label_collection, MapFeature};
use crate::labels::{reconcile, Debouncer, LABEL_DEBOUNCE};
use crate::layers::{self, LABELS_SOURCE, PLACES_FILL_LAYER, PLACES_SOURCE};
use crate::overlay::{ImageOverlay, ImageRecord};
use crate::record::{ColorSource, Record, TableInfo};
use crate::viewport::{fit_target, FIT_PADDING};

/// Entrées d'une passe de synchronisation
#[derive(Debug, Clone, Copy)]
pub struct SyncInput<'a> {
    /// Jeu complet d'enregistrements
    pub records: &'a [Record],

    /// Ids visibles dans la vue filtrée courante
    pub view_ids: &'a HashSet<String>,

    /// Sélection courante, ordonnée
    pub selection: &'a [String],

    /// Description de la table hôte
    pub table: &'a TableInfo,

    /// Mode édition
    pub edit_mode: bool,

    /// Étiquettes visibles
    pub show_labels: bool,
}

/// Résumé d'une passe de synchronisation
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Ids des enregistrements à géométrie inutilisable, à afficher par l'hôte
    pub error_ids: Vec<String>,

    /// Nombre de features construites
    pub feature_count: usize,

    /// Les datasets ont été re-poussés au moteur
    pub refreshed: bool,

    /// La vue a été recadrée
    pub fitted: bool,
}

/// Action que l'hôte doit appliquer
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Sélectionner un enregistrement (None = tout désélectionner)
    SelectRecord(Option<String>),
}

/// Session de synchronisation carte ↔ enregistrements
pub struct MapSession<E: MapEngine> {
    engine: E,
    config: MapConfig,
    backdrop: BackdropController,
    edit: EditSession,
    overlay: ImageOverlay,
    label_debounce: Debouncer,
    features: Vec<MapFeature>,
    error_ids: Vec<String>,
    style_ready: bool,
    pending_push: bool,
    first_sync: bool,
}

impl<E: MapEngine> MapSession<E> {
    /// Acquiert le moteur et prépare la session.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si la configuration est invalide ; le moteur,
    /// déjà déplacé dans l'appel, est alors détruit normalement.
    pub fn init(engine: E, config: MapConfig) -> Result<Self> {
        config.validate()?;
        let backdrop = BackdropController::new(config.thematic_style_url());
        info!(geometry_field = %config.geometry_field, "Map session initialized");

        Ok(Self {
            engine,
            config,
            backdrop,
            edit: EditSession::new(),
            overlay: ImageOverlay::new(),
            label_debounce: Debouncer::new(LABEL_DEBOUNCE),
            features: Vec::new(),
            error_ids: Vec::new(),
            style_ready: false,
            pending_push: false,
            first_sync: true,
        })
    }

    /// Libère la session et rend le moteur à l'hôte
    pub fn dispose(self) -> E {
        info!("Map session disposed");
        self.engine
    }

    /// Features de la dernière passe
    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }

    /// Ids en erreur de la dernière passe
    pub fn error_ids(&self) -> &[String] {
        &self.error_ids
    }

    /// État de la session d'édition
    pub fn edit_state(&self) -> &EditState {
        self.edit.state()
    }

    /// Variante de fond de carte active
    pub fn backdrop(&self) -> BackdropVariant {
        self.backdrop.active()
    }

    /// Vrai si le style courant est prêt à recevoir sources et layers
    pub fn is_style_ready(&self) -> bool {
        self.style_ready
    }

    /// Accès au moteur
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Accès mutable au moteur
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Passe de synchronisation complète.
    ///
    /// La transition d'édition et la reconstruction des features se font dans
    /// la même passe, sur le même instantané d'entrées : l'indicateur
    /// `invisible` et l'état d'édition ne peuvent pas diverger, même le temps
    /// d'une frame.
    pub fn sync(&mut self, input: &SyncInput<'_>, colors: &dyn ColorSource) -> SyncSummary {
        let mut summary = SyncSummary::default();

        // 1. Transition de la session d'édition
        self.edit.update(
            input.selection,
            input.edit_mode,
            input.records,
            &self.config.geometry_field,
        );

        // 2. Construction des features
        let label_field = input
            .table
            .resolve_label_field(self.config.label_field.as_deref());
        let options = BuildOptions {
            geometry_field: &self.config.geometry_field,
            label_field,
            show_labels: input.show_labels,
            color_by_view: self.config.color_by_view,
            edit_mode: input.edit_mode,
        };
        let (features, error_ids) =
            build_features(input.records, input.view_ids, input.selection, options, colors);
        summary.feature_count = features.len();
        summary.error_ids = error_ids.clone();
        self.error_ids = error_ids;

        // 3. Remplacement conditionné à un vrai changement de valeurs
        if features != self.features {
            self.features = features;
            summary.refreshed = self.push_datasets();
        } else if self.pending_push {
            summary.refreshed = self.push_datasets();
        }

        // 4. Cadrage éventuel de la vue
        if let Some(bounds) = fit_target(
            &self.features,
            input.selection,
            input.edit_mode,
            self.first_sync,
        ) {
            self.engine.fit_bounds(bounds, FIT_PADDING);
            summary.fitted = true;
            self.first_sync = false;
        }

        debug!(
            features = summary.feature_count,
            errors = summary.error_ids.len(),
            refreshed = summary.refreshed,
            fitted = summary.fitted,
            "Sync pass"
        );
        summary
    }

    /// Traite un événement relayé du moteur. Retourne les actions que l'hôte
    /// doit appliquer.
    pub fn handle_event(&mut self, event: &MapEvent, now: Instant) -> Vec<HostAction> {
        match event {
            MapEvent::Load | MapEvent::StyleLoad => {
                self.install();
                Vec::new()
            }
            MapEvent::Click { point } => self.handle_click(*point),
            MapEvent::SourceData { source_id } if source_id == LABELS_SOURCE => {
                self.label_debounce.trigger(now);
                Vec::new()
            }
            MapEvent::ZoomEnd | MapEvent::MoveEnd => {
                self.label_debounce.trigger(now);
                Vec::new()
            }
            MapEvent::DrawStateChanged { drawing } => {
                self.edit.set_drawing(*drawing);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Pompe les travaux différés. Retourne vrai si une réconciliation
    /// d'étiquettes a été tentée.
    pub fn poll(&mut self, now: Instant) -> bool {
        // Tant que le style n'est pas prêt, l'échéance reste armée
        if self.style_ready && self.label_debounce.fire_due(now) {
            let outcome = reconcile(&mut self.engine);
            debug!(?outcome, "Label reconciliation pass");
            return true;
        }
        false
    }

    /// Bascule de variante de fond de carte
    pub fn set_backdrop(&mut self, variant: BackdropVariant) {
        match self.backdrop.switch(&mut self.engine, variant) {
            Ok(true) => {
                // Rechargement destructif : tout sera réinstallé sur `style.load`
                self.style_ready = false;
                self.pending_push = true;
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Backdrop switch failed"),
        }
    }

    /// Synchronise l'overlay d'images
    pub fn sync_images(&mut self, records: &[ImageRecord], show: bool) {
        self.overlay.sync(&mut self.engine, records, show);
    }

    /// Installe sources, layers, visibilités et données après `load` ou
    /// `style.load`.
    ///
    /// Un rechargement de style détruit tout ce qui a été ajouté : l'ordre —
    /// signal de style prêt, puis sources, puis layers, puis visibilités,
    /// puis données — est une garantie du système.
    fn install(&mut self) {
        self.style_ready = true;

        if let Err(e) = layers::add_custom_sources(&mut self.engine) {
            warn!(error = %e, "Source installation failed");
            return;
        }
        if let Err(e) = layers::add_custom_layers(&mut self.engine) {
            warn!(error = %e, "Layer installation failed");
            return;
        }
        if let Err(e) = self.backdrop.apply_visibility(&mut self.engine) {
            warn!(error = %e, "Backdrop visibility failed");
        }
        self.overlay.reapply(&mut self.engine);

        if !self.features.is_empty() || self.pending_push {
            self.push_datasets();
        }
    }

    /// Pousse les datasets étiquettes et détail ; différé tant que le style
    /// n'est pas prêt.
    fn push_datasets(&mut self) -> bool {
        if !self.style_ready {
            self.pending_push = true;
            return false;
        }

        if let Err(e) = self
            .engine
            .set_source_data(LABELS_SOURCE, label_collection(&self.features))
        {
            warn!(error = %e, "Labels dataset push failed");
            self.pending_push = true;
            return false;
        }
        if let Err(e) = self
            .engine
            .set_source_data(PLACES_SOURCE, detail_collection(&self.features))
        {
            warn!(error = %e, "Detail dataset push failed");
            self.pending_push = true;
            return false;
        }

        self.pending_push = false;
        true
    }

    fn handle_click(&mut self, point: [f64; 2]) -> Vec<HostAction> {
        let places = self
            .engine
            .query_rendered_features(point, Some(&[PLACES_FILL_LAYER]))
            .unwrap_or_default();

        if let Some(hit) = places.first() {
            // Un clic retombant sur l'overlay de dessin n'est jamais une
            // sélection, pas plus qu'un clic pendant un tracé de sommets
            let on_draw_overlay = self.edit.is_active()
                && self
                    .engine
                    .query_rendered_features(point, None)
                    .unwrap_or_default()
                    .iter()
                    .any(|f| f.source.starts_with(DRAW_SOURCE_PREFIX));

            if !self.edit.is_drawing() && !on_draw_overlay {
                if let Some(id) = hit.record_id() {
                    return vec![HostAction::SelectRecord(Some(id.to_string()))];
                }
            }
            return Vec::new();
        }

        // Zone vide : efface la sélection, hors édition et hors tracé
        if !self.edit.is_drawing() && !self.edit.is_active() {
            return vec![HostAction::SelectRecord(None)];
        }
        Vec::new()
    }
}
