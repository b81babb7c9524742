//! # tablemap
//!
//! Synchronisation d'un jeu d'enregistrements tabulaire avec un moteur de
//! carte interactive : chaque enregistrement peut porter une cellule
//! géométrie, et la session maintient sources, layers, étiquettes, clusters
//! et sélection alignés sur les données vivantes et les interactions.
//!
//! ## Features
//!
//! - Construction des features par passe, cellules invalides isolées dans
//!   une liste d'ids à afficher par l'hôte
//! - Layer d'étiquettes clusterisé réconcilié (débouncé) avec le layer détail
//! - Session d'édition de polygone mono-feature
//! - Cadrage automatique de la vue sur la sélection
//! - Variantes de fond de carte à travers les rechargements de style
//! - Overlay d'images géoréférencées piloté par un jeu d'enregistrements
//!   secondaire
//!
//! ## Usage CLI
//!
//! ```bash
//! # Rejouer un scénario contre le moteur de trace
//! tablemap replay --scenario ./demos/basic.json
//! tablemap replay --scenario ./demos/basic.json --output report.json
//! ```

pub mod backdrop;
pub mod builder;
pub mod config;
pub mod edit;
pub mod engine;
pub mod feature;
pub mod labels;
pub mod layers;
pub mod overlay;
pub mod record;
pub mod report;
pub mod session;
pub mod viewport;

pub use config::MapConfig;
pub use engine::{MapEngine, MapEvent};
pub use session::{HostAction, MapSession, SyncInput, SyncSummary};
