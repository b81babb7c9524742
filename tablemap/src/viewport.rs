//! Décision de cadrage automatique de la vue

use geo::Rect;

use crate::feature::MapFeature;

/// Marge de cadrage en pixels
pub const FIT_PADDING: f64 = 40.0;

/// Emprise à cadrer pour cette passe, s'il y a lieu.
///
/// Le cadrage n'a lieu qu'à la toute première synchronisation — sur
/// l'ensemble des features — ou quand la sélection est non vide — sur les
/// seules features sélectionnées. Effacer la sélection ne recadre jamais la
/// vue : l'asymétrie est volontaire, une désélection ne doit pas déplacer la
/// caméra.
pub fn fit_target(
    features: &[MapFeature],
    selection: &[String],
    edit_mode: bool,
    first_sync: bool,
) -> Option<Rect<f64>> {
    if features.is_empty() || edit_mode {
        return None;
    }

    if !selection.is_empty() {
        // Seuls les enregistrements sélectionnés porteurs d'une géométrie
        // comptent ; sans eux on ne cadre rien
        let selected: Vec<&MapFeature> = features.iter().filter(|f| f.selected).collect();
        if selected.is_empty() {
            return None;
        }
        return geocell::combined_bounds(selected.iter().map(|f| &f.geometry));
    }

    if first_sync {
        return geocell::combined_bounds(features.iter().map(|f| &f.geometry));
    }

    None
}
