//! Enregistrements tabulaires vus par le moteur de synchronisation
//!
//! Le magasin de données hôte reste propriétaire des enregistrements : le
//! moteur n'en lit que des instantanés. La capacité « couleur dérivée de la
//! vue » est consommée à travers le trait [`ColorSource`], jamais en accédant
//! au magasin lui-même.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Un enregistrement du jeu de données hôte (lecture seule pour le moteur)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifiant de l'enregistrement
    pub id: String,

    /// Valeurs texte des cellules, indexées par nom de champ
    #[serde(default)]
    pub cells: HashMap<String, String>,
}

impl Record {
    /// Crée un enregistrement à partir de paires champ → valeur
    pub fn new(id: impl Into<String>, cells: &[(&str, &str)]) -> Self {
        Self {
            id: id.into(),
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Valeur texte d'une cellule
    pub fn cell(&self, field: &str) -> Option<&str> {
        self.cells.get(field).map(String::as_str)
    }

    /// Vrai si la cellule existe et n'est pas vide
    pub fn has_cell(&self, field: &str) -> bool {
        self.cell(field).is_some_and(|v| !v.trim().is_empty())
    }
}

/// Description de la table hôte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Champ principal de la table
    pub primary_field: String,

    /// Champs connus de la table
    #[serde(default)]
    pub fields: Vec<String>,
}

impl TableInfo {
    /// Champ étiquette effectif : le champ configuré s'il existe dans la
    /// table, sinon le champ principal.
    pub fn resolve_label_field<'a>(&'a self, configured: Option<&'a str>) -> &'a str {
        match configured {
            Some(name) if self.fields.iter().any(|f| f == name) => name,
            _ => &self.primary_field,
        }
    }
}

/// Échec d'une résolution de couleur par vue
#[derive(Debug, Error)]
#[error("Color lookup failed for {record_id}: {reason}")]
pub struct ColorError {
    /// Enregistrement concerné
    pub record_id: String,
    /// Cause rapportée par le magasin hôte
    pub reason: String,
}

/// Capacité « couleur dérivée de la vue » du magasin de données hôte
pub trait ColorSource {
    /// Couleur hexadécimale de l'enregistrement dans la vue courante
    fn view_color(&self, record_id: &str) -> Result<Option<String>, ColorError>;
}

/// Source de couleurs vide (aucune coloration par vue)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoColors;

impl ColorSource for NoColors {
    fn view_color(&self, _record_id: &str) -> Result<Option<String>, ColorError> {
        Ok(None)
    }
}

/// Table de couleurs en mémoire (tests et rejeu de scénarios)
#[derive(Debug, Default, Clone)]
pub struct StaticColors(pub HashMap<String, String>);

impl ColorSource for StaticColors {
    fn view_color(&self, record_id: &str) -> Result<Option<String>, ColorError> {
        Ok(self.0.get(record_id).cloned())
    }
}
