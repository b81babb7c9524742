//! Configuration du système

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_STYLE_URL: &str =
    "https://api.mapbox.com/styles/v1/tablemap/thematic?access_token={token}";

/// Configuration principale, fournie par l'hôte (lecture seule pour le cœur)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Champ contenant la cellule géométrie
    pub geometry_field: String,

    /// Champ étiquette (défaut : champ principal de la table)
    #[serde(default)]
    pub label_field: Option<String>,

    /// Jeton d'accès au service de tuiles
    #[serde(default)]
    pub access_token: String,

    /// Dériver les couleurs de la vue courante
    #[serde(default)]
    pub color_by_view: bool,

    /// URL du style thématique ; `{token}` y est substitué
    #[serde(default)]
    pub style_url: Option<String>,

    /// Overlay d'images géoréférencées
    #[serde(default)]
    pub images: Option<ImagesConfig>,
}

/// Configuration de l'overlay d'images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Table source des ancres d'images
    pub table: String,

    /// Champ contenant l'URL de l'image
    pub url_field: String,

    /// Champs des quatre coins (« lon,lat »)
    pub corner_fields: [String; 4],
}

impl MapConfig {
    /// Charge une configuration depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Vérifie les invariants de configuration
    pub fn validate(&self) -> Result<()> {
        if self.geometry_field.trim().is_empty() {
            anyhow::bail!("geometry_field must not be empty");
        }
        Ok(())
    }

    /// URL du style thématique, jeton substitué
    pub fn thematic_style_url(&self) -> String {
        let template = self.style_url.as_deref().unwrap_or(DEFAULT_STYLE_URL);
        template.replace("{token}", &self.access_token)
    }
}
