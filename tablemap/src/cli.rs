//! Définition et implémentation des commandes CLI
//!
//! CLI simplifiée :
//! - `replay` : rejoue un scénario JSON contre le moteur de trace et affiche
//!   le rapport de synchronisation

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Deserialize;
use tracing::{debug, info};

use tablemap::backdrop::{BackdropVariant, THEMATIC_STYLE_NAME};
use tablemap::config::MapConfig;
use tablemap::engine::trace::TraceEngine;
use tablemap::engine::{MapEvent, StyleSpec};
use tablemap::overlay;
use tablemap::record::{Record, StaticColors, TableInfo};
use tablemap::report::SyncReport;
use tablemap::session::{HostAction, MapSession, SyncInput};

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a synchronization scenario against the trace engine
    Replay {
        /// Path to the scenario JSON file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Write the report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Scénario de rejeu
#[derive(Debug, Deserialize)]
struct Scenario {
    /// Configuration de la session
    config: MapConfig,

    /// Description de la table hôte
    table: TableInfo,

    /// Jeu complet d'enregistrements
    #[serde(default)]
    records: Vec<Record>,

    /// Ids visibles dans la vue filtrée (défaut : tous)
    #[serde(default)]
    view_ids: Option<Vec<String>>,

    /// Enregistrements bruts de la table d'images
    #[serde(default)]
    image_records: Vec<Record>,

    /// Couleurs par vue, par id d'enregistrement
    #[serde(default)]
    colors: HashMap<String, String>,

    /// Étapes du scénario, dans l'ordre
    steps: Vec<Step>,
}

/// Étape d'un scénario
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Step {
    /// Remplace la sélection
    Select { ids: Vec<String> },

    /// Bascule le mode édition
    EditMode { on: bool },

    /// Bascule l'affichage des étiquettes
    ShowLabels { on: bool },

    /// Bascule l'overlay d'images
    ShowImages { on: bool },

    /// Change la variante de fond de carte
    Backdrop { variant: BackdropVariant },

    /// Relaye un événement moteur
    Event { event: MapEvent },

    /// Avance l'horloge simulée et pompe les travaux différés
    Advance { ms: u64 },

    /// Force une passe de synchronisation
    Sync,
}

/// Exécute la commande replay
pub fn cmd_replay(scenario_path: &Path, output: Option<&Path>) -> Result<()> {
    let started = Instant::now();

    // 1. Charger le scénario
    let content = std::fs::read_to_string(scenario_path)
        .context(format!("Failed to read scenario: {}", scenario_path.display()))?;
    let scenario: Scenario =
        serde_json::from_str(&content).context("Failed to parse scenario JSON")?;

    let mut config = scenario.config.clone();
    if config.access_token.is_empty() {
        // Jeton via .env / environnement
        if let Ok(token) = std::env::var("TABLEMAP_ACCESS_TOKEN") {
            config.access_token = token;
        }
    }

    // 2. Préparer moteur, session et rapport
    let engine = TraceEngine::new(StyleSpec {
        name: THEMATIC_STYLE_NAME.to_string(),
        url: config.thematic_style_url(),
    });
    let mut session = MapSession::init(engine, config.clone())?;
    let colors = StaticColors(scenario.colors.clone());
    let mut report = SyncReport::new(&scenario_path.display().to_string());

    // État simulé de l'hôte
    let mut selection: Vec<String> = Vec::new();
    let mut edit_mode = false;
    let mut show_labels = true;
    let mut show_images = false;
    let mut now = started;

    let view_ids: HashSet<String> = match &scenario.view_ids {
        Some(ids) => ids.iter().cloned().collect(),
        None => scenario.records.iter().map(|r| r.id.clone()).collect(),
    };
    let image_records = config
        .images
        .as_ref()
        .map(|images| overlay::records_from_cells(&scenario.image_records, images))
        .unwrap_or_default();

    // 3. La carte signale son chargement initial avant la première passe
    session.handle_event(&MapEvent::Load, now);
    report.record_event("load");

    // 4. Dérouler les étapes
    for step in &scenario.steps {
        let mut needs_sync = false;

        match step {
            Step::Select { ids } => {
                selection = ids.clone();
                report.record_selection_change();
                needs_sync = true;
            }
            Step::EditMode { on } => {
                edit_mode = *on;
                needs_sync = true;
            }
            Step::ShowLabels { on } => {
                show_labels = *on;
                needs_sync = true;
            }
            Step::ShowImages { on } => {
                show_images = *on;
                session.sync_images(&image_records, show_images);
            }
            Step::Backdrop { variant } => {
                session.set_backdrop(*variant);
            }
            Step::Event { event } => {
                report.record_event(event_name(event));
                for action in session.handle_event(event, now) {
                    debug!(?action, "Host action");
                    let HostAction::SelectRecord(id) = action;
                    selection = id.into_iter().collect();
                    report.record_selection_change();
                    needs_sync = true;
                }
            }
            Step::Advance { ms } => {
                now += Duration::from_millis(*ms);
                if session.poll(now) {
                    report.record_reconcile();
                }
            }
            Step::Sync => needs_sync = true,
        }

        if needs_sync {
            let input = SyncInput {
                records: &scenario.records,
                view_ids: &view_ids,
                selection: &selection,
                table: &scenario.table,
                edit_mode,
                show_labels,
            };
            let summary = session.sync(&input, &colors);
            report.record_pass(&summary);
        }
    }

    // 5. Clore et afficher le rapport
    let engine = session.dispose();
    report.set_engine_ops(engine.ops.len());
    report.set_duration(started.elapsed());
    report.finalize();
    report.display();

    if let Some(path) = output {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn event_name(event: &MapEvent) -> &'static str {
    match event {
        MapEvent::Load => "load",
        MapEvent::StyleLoad => "style.load",
        MapEvent::Click { .. } => "click",
        MapEvent::Move => "move",
        MapEvent::ZoomEnd => "zoomend",
        MapEvent::MoveEnd => "moveend",
        MapEvent::SourceData { .. } => "sourcedata",
        MapEvent::DrawStateChanged { .. } => "drawstate",
    }
}
