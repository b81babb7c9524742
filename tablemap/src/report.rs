//! Rapport d'exécution de synchronisation
//!
//! Collecte les compteurs d'une exécution — passes, features, recadrages,
//! réconciliations, erreurs par enregistrement — pour l'affichage console et
//! l'export JSON de la commande `replay`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::session::SyncSummary;

/// Statut global d'une exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Aucune erreur par enregistrement en fin d'exécution
    Clean,
    /// Des enregistrements à géométrie inutilisable subsistent
    PartialErrors,
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Nom du scénario
    pub scenario: String,

    /// Durée de l'exécution
    pub duration_secs: f64,

    /// Statut global
    pub status: RunStatus,

    // Compteurs globaux
    /// Nombre de passes de synchronisation
    pub passes: usize,

    /// Nombre de passes ayant re-poussé les datasets
    pub refreshes: usize,

    /// Nombre de recadrages de vue
    pub fits: usize,

    /// Nombre de réconciliations d'étiquettes
    pub reconciles: usize,

    /// Nombre de changements de sélection
    pub selection_changes: usize,

    /// Nombre total d'opérations moteur émises
    pub engine_ops: usize,

    /// Features construites par la dernière passe
    pub features_built: usize,

    /// Événements traités, par type
    pub events: HashMap<String, usize>,

    /// Ids en erreur de la dernière passe
    pub error_records: Vec<String>,
}

impl Default for SyncReport {
    fn default() -> Self {
        Self {
            scenario: String::new(),
            duration_secs: 0.0,
            status: RunStatus::Clean,
            passes: 0,
            refreshes: 0,
            fits: 0,
            reconciles: 0,
            selection_changes: 0,
            engine_ops: 0,
            features_built: 0,
            events: HashMap::new(),
            error_records: Vec::new(),
        }
    }
}

impl SyncReport {
    /// Crée un rapport pour un scénario
    pub fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            ..Default::default()
        }
    }

    /// Enregistre une passe de synchronisation
    pub fn record_pass(&mut self, summary: &SyncSummary) {
        self.passes += 1;
        if summary.refreshed {
            self.refreshes += 1;
        }
        if summary.fitted {
            self.fits += 1;
        }
        self.features_built = summary.feature_count;
        self.error_records = summary.error_ids.clone();
    }

    /// Enregistre un événement traité
    pub fn record_event(&mut self, name: &str) {
        *self.events.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Enregistre une réconciliation d'étiquettes
    pub fn record_reconcile(&mut self) {
        self.reconciles += 1;
    }

    /// Enregistre un changement de sélection
    pub fn record_selection_change(&mut self) {
        self.selection_changes += 1;
    }

    /// Fixe le nombre total d'opérations moteur
    pub fn set_engine_ops(&mut self, count: usize) {
        self.engine_ops = count;
    }

    /// Fixe la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.error_records.is_empty() {
            RunStatus::Clean
        } else {
            RunStatus::PartialErrors
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("SYNC REPORT - {}", self.scenario);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Passes: {} ({} refreshes, {} fits)",
            self.passes, self.refreshes, self.fits
        );
        println!(
            "Reconciles: {}, selection changes: {}, engine ops: {}",
            self.reconciles, self.selection_changes, self.engine_ops
        );
        println!("Features built (last pass): {}", self.features_built);

        if !self.events.is_empty() {
            println!("\n--- EVENTS ---");
            let mut events: Vec<_> = self.events.iter().collect();
            events.sort_by_key(|(k, _)| k.as_str());
            for (name, count) in events {
                println!("  {}: {}", name, count);
            }
        }

        if !self.error_records.is_empty() {
            println!("\n--- ERROR RECORDS ({}) ---", self.error_records.len());
            for id in self.error_records.iter().take(20) {
                println!("  {}", id);
            }
            if self.error_records.len() > 20 {
                println!("  ... and {} more", self.error_records.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Résumé compact
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passes, {} refreshes, {} fits, {} error records",
            self.scenario,
            self.passes,
            self.refreshes,
            self.fits,
            self.error_records.len()
        )
    }
}
