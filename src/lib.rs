//! Production Planner
//!
//! Resolves a flat list of recipe instances (a recipe plus a continuous
//! scale factor) into dependency-ordered tiers and the material flows
//! between them.
//!
//! The pipeline, leaves first:
//!
//! 1. [`natural`] -- items with unlimited external supply.
//! 2. [`models`] -- instances, nodes, flow edges and circular groups.
//! 3. [`preprocess`] -- catalyst netting and circular-dependency grouping.
//! 4. [`selector`] -- source selection and two-phase plan/commit allocation.
//! 5. [`solver`] -- the tier-by-tier orchestrator, [`solve`].
//!
//! Recipes come from a [`catalog::Catalog`]; [`db::SqliteCatalog`] reads
//! them from the SQLite tables filled by [`extract`].

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod natural;
pub mod preprocess;
pub mod report;
pub mod selector;
pub mod solver;

pub use catalog::{Catalog, MemoryCatalog};
pub use config::{DEFAULT_TOLERANCE, SolverConfig};
pub use error::{CatalogError, ConfigError, ParseError, SolveError};
pub use models::{FlowEdge, ItemAmount, NodeId, RecipeInstance, RecipeNode, SourceId};
pub use natural::NaturalResources;
pub use solver::{Solution, solve};
