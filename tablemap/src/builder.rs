//! Construction des features à partir des enregistrements
//!
//! Chaque enregistrement dont la cellule géométrie est non vide finit soit
//! dans la liste des features, soit dans la liste des ids en erreur — jamais
//! les deux, jamais aucun. Aucune erreur par enregistrement ne remonte à
//! l'appelant.

use std::collections::HashSet;

use tracing::debug;

use crate::feature::{MapFeature, MUTED_COLOR};
use crate::record::{ColorSource, Record};

/// Entrées d'une passe de construction
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    /// Champ contenant la cellule géométrie
    pub geometry_field: &'a str,

    /// Champ étiquette résolu (après repli sur le champ principal)
    pub label_field: &'a str,

    /// Étiquettes visibles
    pub show_labels: bool,

    /// Couleurs dérivées de la vue activées
    pub color_by_view: bool,

    /// Mode édition actif
    pub edit_mode: bool,
}

/// Construit les features d'une passe de synchronisation.
///
/// Retourne la liste des features et la liste des ids dont la cellule
/// géométrie est inutilisable.
pub fn build_features(
    records: &[Record],
    view_ids: &HashSet<String>,
    selection: &[String],
    options: BuildOptions<'_>,
    colors: &dyn ColorSource,
) -> (Vec<MapFeature>, Vec<String>) {
    let mut features = Vec::new();
    let mut error_ids = Vec::new();

    // L'enregistrement en cours d'édition est masqué du layer normal :
    // l'overlay de dessin l'affiche à sa place
    let editing_id = if options.edit_mode && selection.len() == 1 {
        Some(selection[0].as_str())
    } else {
        None
    };

    for record in records {
        let Some(raw) = record.cell(options.geometry_field) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }

        let cell = match geocell::parse_cell(raw) {
            Ok(cell) => cell,
            Err(e) => {
                debug!(record = %record.id, error = %e, "Unusable geometry cell");
                error_ids.push(record.id.clone());
                continue;
            }
        };

        let selected = selection.iter().any(|id| id == &record.id);
        let name = if options.show_labels {
            record
                .cell(options.label_field)
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };

        let mut color = None;
        if options.color_by_view {
            // Un échec de résolution retombe sur la couleur par défaut du layer
            match colors.view_color(&record.id) {
                Ok(c) => color = c,
                Err(e) => debug!(record = %record.id, error = %e, "Color lookup failed"),
            }
        }
        if !view_ids.contains(&record.id) {
            color = Some(MUTED_COLOR.to_string());
        }

        features.push(MapFeature {
            id: record.id.clone(),
            geometry: cell.geometry,
            name,
            selected,
            invisible: editing_id == Some(record.id.as_str()),
            label_point: [cell.anchor.x, cell.anchor.y],
            color,
        });
    }

    (features, error_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ColorError, NoColors, StaticColors};

    const POINT: &str = r#"{"type":"Point","coordinates":[10.0,20.0]}"#;
    const POLYGON: &str =
        r#"{"type":"Polygon","coordinates":[[[0,0],[4,0],[4,4],[0,4],[0,0]]]}"#;

    fn options(geometry_field: &'static str) -> BuildOptions<'static> {
        BuildOptions {
            geometry_field,
            label_field: "name",
            show_labels: true,
            color_by_view: false,
            edit_mode: false,
        }
    }

    fn view_of(records: &[Record]) -> HashSet<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_every_nonempty_cell_lands_in_exactly_one_list() {
        let records = vec![
            Record::new("ok", &[("geom", POINT), ("name", "A")]),
            Record::new("bad", &[("geom", "{bad json"), ("name", "B")]),
            Record::new("empty", &[("geom", ""), ("name", "C")]),
            Record::new("absent", &[("name", "D")]),
        ];
        let view = view_of(&records);
        let (features, errors) =
            build_features(&records, &view, &[], options("geom"), &NoColors);

        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "ok");
        assert_eq!(errors, vec!["bad".to_string()]);
    }

    #[test]
    fn test_null_geometry_is_an_error() {
        let records = vec![Record::new("n", &[("geom", "null")])];
        let view = view_of(&records);
        let (features, errors) =
            build_features(&records, &view, &[], options("geom"), &NoColors);
        assert!(features.is_empty());
        assert_eq!(errors, vec!["n".to_string()]);
    }

    #[test]
    fn test_output_is_a_pure_function_of_inputs() {
        let records = vec![
            Record::new("a", &[("geom", POINT), ("name", "A")]),
            Record::new("b", &[("geom", POLYGON), ("name", "B")]),
        ];
        let view = view_of(&records);
        let selection = vec!["b".to_string()];

        let first = build_features(&records, &view, &selection, options("geom"), &NoColors);
        let second = build_features(&records, &view, &selection, options("geom"), &NoColors);
        assert_eq!(first, second);
    }

    #[test]
    fn test_label_point_for_point_geometry() {
        let records = vec![Record::new("a", &[("geom", POINT)])];
        let view = view_of(&records);
        let (features, errors) =
            build_features(&records, &view, &[], options("geom"), &NoColors);
        assert!(errors.is_empty());
        assert_eq!(features[0].label_point, [10.0, 20.0]);
    }

    #[test]
    fn test_invisible_only_during_single_record_edit() {
        let records = vec![
            Record::new("a", &[("geom", POLYGON)]),
            Record::new("b", &[("geom", POINT)]),
        ];
        let view = view_of(&records);
        let selection = vec!["a".to_string()];

        let mut opts = options("geom");
        opts.edit_mode = true;
        let (features, _) = build_features(&records, &view, &selection, opts, &NoColors);
        assert!(features[0].invisible);
        assert!(features[0].selected);
        assert!(!features[1].invisible);

        // Sélection multiple : plus personne n'est masqué
        let selection = vec!["a".to_string(), "b".to_string()];
        let (features, _) = build_features(&records, &view, &selection, opts, &NoColors);
        assert!(features.iter().all(|f| !f.invisible));

        // Mode édition coupé
        let selection = vec!["a".to_string()];
        opts.edit_mode = false;
        let (features, _) = build_features(&records, &view, &selection, opts, &NoColors);
        assert!(features.iter().all(|f| !f.invisible));
    }

    #[test]
    fn test_labels_hidden_when_switched_off() {
        let records = vec![Record::new("a", &[("geom", POINT), ("name", "Lyon")])];
        let view = view_of(&records);

        let mut opts = options("geom");
        let (features, _) = build_features(&records, &view, &[], opts, &NoColors);
        assert_eq!(features[0].name, "Lyon");

        opts.show_labels = false;
        let (features, _) = build_features(&records, &view, &[], opts, &NoColors);
        assert_eq!(features[0].name, "");
    }

    #[test]
    fn test_records_outside_view_are_muted() {
        let records = vec![
            Record::new("in", &[("geom", POINT)]),
            Record::new("out", &[("geom", POLYGON)]),
        ];
        let view: HashSet<String> = ["in".to_string()].into_iter().collect();

        let mut opts = options("geom");
        opts.color_by_view = true;
        let colors = StaticColors(
            [("out".to_string(), "#00ff00".to_string())]
                .into_iter()
                .collect(),
        );
        let (features, _) = build_features(&records, &view, &[], opts, &colors);

        // La couleur « hors vue » l'emporte sur la couleur de vue
        assert_eq!(features[0].color, None);
        assert_eq!(features[1].color, Some(MUTED_COLOR.to_string()));
    }

    #[test]
    fn test_color_lookup_failure_is_swallowed() {
        struct FailingColors;
        impl ColorSource for FailingColors {
            fn view_color(&self, record_id: &str) -> Result<Option<String>, ColorError> {
                Err(ColorError {
                    record_id: record_id.to_string(),
                    reason: "store offline".to_string(),
                })
            }
        }

        let records = vec![Record::new("a", &[("geom", POINT)])];
        let view = view_of(&records);
        let mut opts = options("geom");
        opts.color_by_view = true;

        let (features, errors) = build_features(&records, &view, &[], opts, &FailingColors);
        assert!(errors.is_empty());
        assert_eq!(features[0].color, None);
    }
}
