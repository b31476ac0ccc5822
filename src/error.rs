//! Error types for catalog lookups, parsing and solving

use thiserror::Error;

use crate::models::{NodeId, PendingInstance};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown recipe: {0}")]
    UnknownRecipe(String),
    #[error("catalog storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: malformed instance descriptor {text:?}")]
    Descriptor { line: usize, text: String },
    #[error("line {line}: malformed recipe definition {text:?}")]
    Recipe { line: usize, text: String },
    #[error("line {line}: invalid amount {text:?}")]
    Amount { line: usize, text: String },
    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tolerance must be a finite, non-negative number, got {0}")]
    Tolerance(f64),
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("instance {node} ({recipe}) has invalid count {count}")]
    InvalidInstance {
        node: NodeId,
        recipe: String,
        count: f64,
    },

    #[error("no instance could be placed in tier {tier}:\n{}", format_pending(.pending))]
    Stalled {
        tier: usize,
        pending: Vec<PendingInstance>,
    },

    #[error("edge into {sink} draws {item} from {node}, which does not produce it")]
    MissingProduct {
        node: NodeId,
        sink: NodeId,
        item: String,
    },

    #[error("edge into {sink} references unknown source node {node}")]
    UnknownSource { node: NodeId, sink: NodeId },
}

fn format_pending(pending: &[PendingInstance]) -> String {
    pending
        .iter()
        .map(|p| format!("  {}", p))
        .collect::<Vec<_>>()
        .join("\n")
}
