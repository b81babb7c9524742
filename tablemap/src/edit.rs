//! Session d'édition de polygone
//!
//! Machine à états à deux états : `Idle` et `Editing`. L'édition ne démarre
//! que pour une sélection d'exactement un enregistrement, en mode édition,
//! avec une géométrie décodable ; toute autre situation ramène totalement la
//! session à `Idle`. Il n'existe pas d'état d'édition partiellement défait.

use geo::Geometry;
use tracing::debug;

use crate::record::Record;

/// Préfixe des sources de l'overlay de dessin. Un clic qui retombe sur une
/// de ces sources ne doit jamais être traité comme une sélection.
pub const DRAW_SOURCE_PREFIX: &str = "draw-overlay-";

/// Feature transitoire en cours d'édition
#[derive(Debug, Clone, PartialEq)]
pub struct EditFeature {
    /// Id synthétique de la feature éditable, jamais un id d'enregistrement
    pub edit_id: u64,

    /// Enregistrement dont la géométrie a été clonée
    pub record_id: String,

    /// Clone éditable de la géométrie
    pub geometry: Geometry<f64>,
}

/// État de la session d'édition
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditFeature),
}

/// Résultat d'une transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTransition {
    Unchanged,
    Started,
    Cleared,
}

/// Machine à états de l'édition mono-feature
#[derive(Debug, Default)]
pub struct EditSession {
    state: EditState,
    drawing: bool,
    next_edit_id: u64,
}

impl EditSession {
    pub fn new() -> Self {
        Self {
            state: EditState::Idle,
            drawing: false,
            next_edit_id: 1,
        }
    }

    /// État courant
    pub fn state(&self) -> &EditState {
        &self.state
    }

    /// Vrai si une feature est sous édition
    pub fn is_active(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    /// Vrai si un tracé de sommets est en cours
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// L'overlay de dessin signale le début ou la fin d'un tracé
    pub fn set_drawing(&mut self, drawing: bool) {
        // Aucun tracé possible hors édition
        self.drawing = drawing && self.is_active();
    }

    /// Feature en cours d'édition
    pub fn editing(&self) -> Option<&EditFeature> {
        match &self.state {
            EditState::Editing(feature) => Some(feature),
            EditState::Idle => None,
        }
    }

    /// Applique la sélection et le mode courants à la session.
    ///
    /// Une géométrie indécodable force le retour à `Idle` : jamais de feature
    /// éditable périmée. Démarrer une nouvelle édition remplace entièrement
    /// l'éventuelle édition précédente — une seule feature sous édition à la
    /// fois.
    pub fn update(
        &mut self,
        selection: &[String],
        edit_mode: bool,
        records: &[Record],
        geometry_field: &str,
    ) -> EditTransition {
        let target = if edit_mode && selection.len() == 1 {
            Some(selection[0].as_str())
        } else {
            None
        };

        let Some(record_id) = target else {
            return self.reset();
        };

        let raw = records
            .iter()
            .find(|r| r.id == record_id)
            .and_then(|r| r.cell(geometry_field))
            .unwrap_or_default();

        let geometry = match geocell::parse_geometry(raw) {
            Ok(geometry) => geometry,
            Err(e) => {
                debug!(record = record_id, error = %e, "Edit geometry rejected");
                return self.reset();
            }
        };

        if let EditState::Editing(current) = &self.state {
            if current.record_id == record_id && current.geometry == geometry {
                return EditTransition::Unchanged;
            }
        }

        let edit_id = self.next_edit_id;
        self.next_edit_id += 1;
        self.drawing = false;
        self.state = EditState::Editing(EditFeature {
            edit_id,
            record_id: record_id.to_string(),
            geometry,
        });
        EditTransition::Started
    }

    fn reset(&mut self) -> EditTransition {
        self.drawing = false;
        if matches!(self.state, EditState::Idle) {
            EditTransition::Unchanged
        } else {
            self.state = EditState::Idle;
            EditTransition::Cleared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLYGON: &str =
        r#"{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,4],[0,0]]]}"#;

    fn records() -> Vec<Record> {
        vec![
            Record::new("a", &[("geom", POLYGON)]),
            Record::new("b", &[("geom", "{bad json")]),
        ]
    }

    #[test]
    fn test_edit_starts_on_single_valid_selection() {
        let mut session = EditSession::new();
        let selection = vec!["a".to_string()];
        let transition = session.update(&selection, true, &records(), "geom");

        assert_eq!(transition, EditTransition::Started);
        let feature = session.editing().unwrap();
        assert_eq!(feature.record_id, "a");
        assert!(feature.edit_id > 0);
    }

    #[test]
    fn test_no_edit_without_edit_mode() {
        let mut session = EditSession::new();
        let selection = vec!["a".to_string()];
        assert_eq!(
            session.update(&selection, false, &records(), "geom"),
            EditTransition::Unchanged
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_no_edit_on_multi_selection() {
        let mut session = EditSession::new();
        let selection = vec!["a".to_string(), "b".to_string()];
        session.update(&selection, true, &records(), "geom");
        assert!(!session.is_active());
    }

    #[test]
    fn test_unparseable_geometry_forces_idle() {
        let mut session = EditSession::new();
        let selection = vec!["a".to_string()];
        session.update(&selection, true, &records(), "geom");
        assert!(session.is_active());

        // L'enregistrement sélectionné devient indécodable : reset total
        let selection = vec!["b".to_string()];
        let transition = session.update(&selection, true, &records(), "geom");
        assert_eq!(transition, EditTransition::Cleared);
        assert!(!session.is_active());
    }

    #[test]
    fn test_selection_change_replaces_edit_feature() {
        let mut session = EditSession::new();
        let more = vec![
            Record::new("a", &[("geom", POLYGON)]),
            Record::new(
                "c",
                &[("geom", r#"{"type":"Point","coordinates":[1.0,2.0]}"#)],
            ),
        ];

        session.update(&["a".to_string()], true, &more, "geom");
        let first_id = session.editing().unwrap().edit_id;

        session.update(&["c".to_string()], true, &more, "geom");
        let feature = session.editing().unwrap();
        assert_eq!(feature.record_id, "c");
        assert_ne!(feature.edit_id, first_id, "Each edit gets a fresh id");
    }

    #[test]
    fn test_stable_inputs_leave_session_unchanged() {
        let mut session = EditSession::new();
        let selection = vec!["a".to_string()];
        session.update(&selection, true, &records(), "geom");
        assert_eq!(
            session.update(&selection, true, &records(), "geom"),
            EditTransition::Unchanged
        );
    }

    #[test]
    fn test_drawing_flag_follows_session() {
        let mut session = EditSession::new();

        // Hors édition, le tracé est impossible
        session.set_drawing(true);
        assert!(!session.is_drawing());

        session.update(&["a".to_string()], true, &records(), "geom");
        session.set_drawing(true);
        assert!(session.is_drawing());

        // La sortie d'édition coupe le tracé
        session.update(&[], true, &records(), "geom");
        assert!(!session.is_drawing());
    }
}
