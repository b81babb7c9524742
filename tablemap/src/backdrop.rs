//! Variantes de fond de carte mutuellement exclusives
//!
//! Certaines variantes exigent un rechargement complet du style, destructif
//! pour toutes les sources et layers ajoutés. Dans ce cas la session ne
//! réinstalle sources, layers et visibilités qu'après le signal `style.load`
//! du moteur. Les autres variantes ne font que basculer des visibilités,
//! de façon synchrone.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::{EngineError, MapEngine, StyleSpec};
use crate::layers;

/// Nom du style thématique, tel que rapporté par le moteur
pub const THEMATIC_STYLE_NAME: &str = "Thematic";

/// Nom du style extérieur
pub const OUTDOOR_STYLE_NAME: &str = "Outdoors";

const OUTDOOR_STYLE_URL: &str = "mapbox://styles/mapbox/outdoors-v11";

/// Variante de fond de carte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackdropVariant {
    /// Style extérieur standard
    Outdoor,

    /// Style thématique, structures masquées
    Thematic,

    /// Style thématique, structures visibles
    Structures,

    /// Fond uni blanc par-dessus le style courant
    Plain,
}

/// Pilote les variantes de fond de carte de la session.
///
/// L'état vit dans la session, jamais dans une globale : il est recalculé et
/// appliqué à chaque bascule.
#[derive(Debug, Clone)]
pub struct BackdropController {
    active: BackdropVariant,
    thematic: StyleSpec,
    outdoor: StyleSpec,
}

impl BackdropController {
    /// Construit le contrôleur ; `thematic_url` embarque déjà le jeton d'accès
    pub fn new(thematic_url: String) -> Self {
        Self {
            active: BackdropVariant::Thematic,
            thematic: StyleSpec {
                name: THEMATIC_STYLE_NAME.to_string(),
                url: thematic_url,
            },
            outdoor: StyleSpec {
                name: OUTDOOR_STYLE_NAME.to_string(),
                url: OUTDOOR_STYLE_URL.to_string(),
            },
        }
    }

    /// Variante active
    pub fn active(&self) -> BackdropVariant {
        self.active
    }

    /// Style attendu pour une variante. La variante unie recouvre le style
    /// courant sans le changer.
    fn style_for(&self, variant: BackdropVariant) -> Option<&StyleSpec> {
        match variant {
            BackdropVariant::Outdoor => Some(&self.outdoor),
            BackdropVariant::Thematic | BackdropVariant::Structures => Some(&self.thematic),
            BackdropVariant::Plain => None,
        }
    }

    /// Active une variante. Retourne `true` si un rechargement de style a été
    /// déclenché : les visibilités seront appliquées après `style.load`, une
    /// fois sources et layers réinstallés.
    pub fn switch<E: MapEngine>(
        &mut self,
        engine: &mut E,
        variant: BackdropVariant,
    ) -> Result<bool, EngineError> {
        self.active = variant;

        if let Some(style) = self.style_for(variant) {
            if engine.style_name() != style.name {
                info!(style = %style.name, "Backdrop style reload");
                engine.set_style(style);
                return Ok(true);
            }
        }

        self.apply_visibility(engine)?;
        Ok(false)
    }

    /// Applique les visibilités de la variante active : exactement une
    /// variante reste visible, jamais de layers résiduels.
    pub fn apply_visibility<E: MapEngine>(&self, engine: &mut E) -> Result<(), EngineError> {
        layers::set_structure_visibility(engine, self.active == BackdropVariant::Structures)?;
        layers::set_white_visibility(engine, self.active == BackdropVariant::Plain)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::trace::{EngineOp, TraceEngine};
    use crate::layers::{
        add_custom_layers, add_custom_sources, STRUCTURE_LAYERS, WHITE_LAYER,
    };
    use serde_json::json;

    fn installed_engine() -> TraceEngine {
        let mut engine = TraceEngine::new(StyleSpec {
            name: THEMATIC_STYLE_NAME.to_string(),
            url: "https://example.test/style.json".to_string(),
        });
        add_custom_sources(&mut engine).unwrap();
        add_custom_layers(&mut engine).unwrap();
        engine
    }

    fn controller() -> BackdropController {
        BackdropController::new("https://example.test/style.json".to_string())
    }

    #[test]
    fn test_same_style_switch_is_synchronous() {
        let mut engine = installed_engine();
        let mut backdrop = controller();

        let reloaded = backdrop
            .switch(&mut engine, BackdropVariant::Structures)
            .unwrap();
        assert!(!reloaded);
        assert_eq!(backdrop.active(), BackdropVariant::Structures);

        for layer in STRUCTURE_LAYERS {
            assert_eq!(
                engine.layout_value(layer, "visibility").unwrap(),
                json!("visible")
            );
        }
        assert_eq!(
            engine.layout_value(WHITE_LAYER, "visibility").unwrap(),
            json!("none")
        );
    }

    #[test]
    fn test_plain_overrides_without_reload() {
        let mut engine = installed_engine();
        let mut backdrop = controller();

        let reloaded = backdrop.switch(&mut engine, BackdropVariant::Plain).unwrap();
        assert!(!reloaded);
        assert_eq!(
            engine.layout_value(WHITE_LAYER, "visibility").unwrap(),
            json!("visible")
        );
        for layer in STRUCTURE_LAYERS {
            assert_eq!(
                engine.layout_value(layer, "visibility").unwrap(),
                json!("none")
            );
        }
    }

    #[test]
    fn test_exactly_one_variant_visible_after_switches() {
        let mut engine = installed_engine();
        let mut backdrop = controller();

        backdrop
            .switch(&mut engine, BackdropVariant::Structures)
            .unwrap();
        backdrop.switch(&mut engine, BackdropVariant::Plain).unwrap();
        backdrop
            .switch(&mut engine, BackdropVariant::Thematic)
            .unwrap();

        // Retour au thématique nu : ni structures, ni fond uni
        for layer in STRUCTURE_LAYERS {
            assert_eq!(
                engine.layout_value(layer, "visibility").unwrap(),
                json!("none")
            );
        }
        assert_eq!(
            engine.layout_value(WHITE_LAYER, "visibility").unwrap(),
            json!("none")
        );
    }

    #[test]
    fn test_style_change_triggers_destructive_reload() {
        let mut engine = installed_engine();
        let mut backdrop = controller();

        let reloaded = backdrop.switch(&mut engine, BackdropVariant::Outdoor).unwrap();
        assert!(reloaded);
        assert!(engine
            .ops
            .iter()
            .any(|op| matches!(op, EngineOp::SetStyle(name) if name == OUTDOOR_STYLE_NAME)));
        // Le rechargement a détruit les ajouts
        assert!(!engine.has_layer(WHITE_LAYER));
    }

    #[test]
    fn test_switch_back_to_current_style_does_not_reload() {
        let mut engine = installed_engine();
        let mut backdrop = controller();

        // Déjà sur le style thématique
        let reloaded = backdrop
            .switch(&mut engine, BackdropVariant::Thematic)
            .unwrap();
        assert!(!reloaded);
    }
}
