//! Parsing of instance descriptors and recipe definition files
//!
//! Descriptors look like `1.7037x RecycledRubber`. Recipe files hold one
//! recipe per line, `IronIngot: 30 OreIron -> 30 IronIngot`, plus optional
//! `natural: OreIron, Water` lines. Files are discovered with a directory walk
//! and imported into the SQLite catalog.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::Connection;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::db;
use crate::error::ParseError;
use crate::models::{ItemAmount, RecipeDefinition, RecipeInstance};

/// Compiled line patterns, built once per parse call
struct Patterns {
    descriptor: Regex,
    recipe: Regex,
    term: Regex,
    natural: Regex,
}

impl Patterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            // 1.7037x RecycledRubber
            descriptor: Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)\s*[xX*×]\s*([A-Za-z_][\w\-]*)\s*$")?,
            // IronIngot [Smelter]: 30 OreIron -> 30 IronIngot
            recipe: Regex::new(r"^\s*([A-Za-z_][\w\-]*)\s*(?:\[([^\]]+)\])?\s*:\s*(.*?)\s*->\s*(.*?)\s*$")?,
            term: Regex::new(r"^\s*(\S+)\s+([A-Za-z_][\w\-]*)\s*$")?,
            natural: Regex::new(r"^\s*natural\s*:\s*(.*)$")?,
        })
    }
}

/// Strip `#` comments and surrounding whitespace
fn content_of(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

/// Parse a single `<count>x <Recipe>` descriptor
pub fn parse_descriptor(text: &str, line: usize) -> Result<RecipeInstance, ParseError> {
    descriptor_with(&Patterns::new()?, text, line)
}

fn descriptor_with(patterns: &Patterns, text: &str, line: usize) -> Result<RecipeInstance, ParseError> {
    let malformed = || ParseError::Descriptor {
        line,
        text: text.to_string(),
    };

    let cap = patterns.descriptor.captures(text).ok_or_else(malformed)?;
    let count: f64 = cap[1].parse().map_err(|_| malformed())?;
    if count <= 0.0 {
        return Err(ParseError::Amount {
            line,
            text: cap[1].to_string(),
        });
    }

    Ok(RecipeInstance::new(&cap[2], count))
}

/// Parse a plan: one descriptor per line, blank lines and comments skipped
pub fn parse_plan(content: &str) -> Result<Vec<RecipeInstance>, ParseError> {
    let patterns = Patterns::new()?;
    let mut instances = Vec::new();
    for (idx, raw) in content.lines().enumerate() {
        let text = content_of(raw);
        if text.is_empty() {
            continue;
        }
        instances.push(descriptor_with(&patterns, text, idx + 1)?);
    }
    Ok(instances)
}

/// Parse an `ITEM=AMOUNT` external input
pub fn parse_external(text: &str) -> Result<ItemAmount, ParseError> {
    let invalid = || ParseError::Amount {
        line: 0,
        text: text.to_string(),
    };
    let (item, amount) = text.split_once('=').ok_or_else(invalid)?;
    let amount: f64 = amount.trim().parse().map_err(|_| invalid())?;
    if item.trim().is_empty() || !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }
    Ok(ItemAmount::new(item.trim(), amount))
}

fn parse_terms(patterns: &Patterns, side: &str, line: usize) -> Result<Vec<ItemAmount>, ParseError> {
    if side.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut terms = Vec::new();
    for term in side.split('+') {
        let cap = patterns.term.captures(term).ok_or_else(|| ParseError::Recipe {
            line,
            text: term.trim().to_string(),
        })?;
        let amount: f64 = cap[1].parse().map_err(|_| ParseError::Amount {
            line,
            text: cap[1].to_string(),
        })?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(ParseError::Amount {
                line,
                text: cap[1].to_string(),
            });
        }
        terms.push(ItemAmount::new(&cap[2], amount));
    }
    Ok(terms)
}

/// Contents of one recipe definition file
#[derive(Debug, Default, PartialEq)]
pub struct RecipeFile {
    pub recipes: Vec<RecipeDefinition>,
    pub natural: Vec<String>,
}

/// Parse recipe definitions
///
/// `Id [Building]: 30 A + 10 B -> 20 C`; the building tag is optional and
/// either side of the arrow may be empty.
pub fn parse_recipe_file(content: &str) -> Result<RecipeFile, ParseError> {
    let patterns = Patterns::new()?;
    let mut file = RecipeFile::default();

    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let text = content_of(raw);
        if text.is_empty() {
            continue;
        }

        if let Some(cap) = patterns.natural.captures(text) {
            file.natural.extend(
                cap[1]
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
            continue;
        }

        let cap = patterns.recipe.captures(text).ok_or_else(|| ParseError::Recipe {
            line,
            text: text.to_string(),
        })?;

        let mut recipe = RecipeDefinition::new(&cap[1]);
        recipe.building = cap.get(2).map(|m| m.as_str().trim().to_string());
        recipe.ingredients = parse_terms(&patterns, &cap[3], line)?;
        recipe.products = parse_terms(&patterns, &cap[4], line)?;
        file.recipes.push(recipe);
    }

    Ok(file)
}

/// Find all `*.recipes` files below `dir`, sorted for a stable import order
pub fn find_recipe_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "recipes"))
        .collect();
    files.sort();
    Ok(files)
}

/// Import every recipe file below `dir` into the catalog
pub fn import_to_database(conn: &Connection, dir: &Path) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    let files = find_recipe_files(dir)?;
    debug!(dir = %dir.display(), files = files.len(), "scanning recipe files");

    for path in &files {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

        match parse_recipe_file(&content) {
            Ok(file) => {
                for recipe in &file.recipes {
                    db::upsert_recipe(conn, recipe)?;
                    stats.inputs += recipe.ingredients.len();
                    stats.outputs += recipe.products.len();
                }
                for item in &file.natural {
                    db::insert_natural_item(conn, item)?;
                }
                stats.recipes += file.recipes.len();
                stats.natural += file.natural.len();
                stats.files += 1;
                debug!(file = %path.display(), recipes = file.recipes.len(), "imported");
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unparseable recipe file");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default)]
pub struct ImportStats {
    pub files: usize,
    pub recipes: usize,
    pub inputs: usize,
    pub outputs: usize,
    pub natural: usize,
    pub errors: usize,
}

impl std::fmt::Display for ImportStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} recipes ({} inputs, {} outputs) and {} natural items from {} files. Errors: {}",
            self.recipes, self.inputs, self.outputs, self.natural, self.files, self.errors
        )
    }
}
