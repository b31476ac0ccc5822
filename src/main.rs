//! Production Planner
//!
//! Tiers a set of running recipe instances and lists the material flows.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;

use production_planner::config::{self, DEFAULT_TOLERANCE, SolverConfig};
use production_planner::db::{self, SqliteCatalog};
use production_planner::models::{ItemAmount, RecipeDefinition};
use production_planner::natural::NaturalResources;
use production_planner::{extract, logging, report, solve};

#[derive(Parser)]
#[command(name = "production-planner")]
#[command(about = "Tiered production planner for recipe instances")]
struct Cli {
    /// Path to the SQLite database
    #[arg(short, long, default_value = "planner.db")]
    database: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import recipe definitions from a directory of *.recipes files
    Import {
        /// Directory to scan recursively
        source_dir: PathBuf,

        /// Clear existing catalog before import
        #[arg(long)]
        clear: bool,
    },

    /// Resolve recipe instances into tiers and flows
    Solve {
        /// Instance descriptors (e.g., "3x IronIngot", "1.7037x RecycledRubber")
        descriptors: Vec<String>,

        /// Read additional descriptors from a plan file, one per line
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Bootstrap supply as ITEM=AMOUNT; may be repeated
        #[arg(short, long = "external")]
        external: Vec<String>,

        /// Epsilon for every sufficiency comparison
        #[arg(short, long, default_value_t = DEFAULT_TOLERANCE, value_parser = parse_tolerance)]
        tolerance: f64,

        /// Also print every flow edge
        #[arg(short, long)]
        verbose: bool,
    },

    /// List all recipes in the database
    ListRecipes,

    /// Show details for a specific recipe
    Recipe {
        /// Recipe ID
        id: String,
    },

    /// Initialize empty database with schema
    Init,

    /// Load sample recipes for testing
    LoadSample,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let conn = Connection::open(&cli.database)?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Import { source_dir, clear } => {
            if clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(&conn)?;
            }

            let stats = extract::import_to_database(&conn, &source_dir)?;
            println!("{}", stats);
        }

        Commands::Solve {
            descriptors,
            plan,
            external,
            tolerance,
            verbose,
        } => {
            let mut instances = Vec::new();
            for (idx, text) in descriptors.iter().enumerate() {
                instances.push(extract::parse_descriptor(text, idx + 1)?);
            }
            if let Some(path) = plan {
                let content =
                    fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
                instances.extend(extract::parse_plan(&content)?);
            }
            if instances.is_empty() {
                println!("Nothing to solve. Pass descriptors or --plan.");
                return Ok(());
            }

            let external: Vec<ItemAmount> = external
                .iter()
                .map(|text| extract::parse_external(text))
                .collect::<Result<_, _>>()?;

            let config = SolverConfig::default()
                .with_tolerance(tolerance)
                .with_natural(natural_resources(&conn)?);
            let catalog = SqliteCatalog::new(&conn);
            let solution = solve(&catalog, &instances, &external, &config)?;

            println!("{}", report::format_tiers(&solution));
            if verbose {
                println!("Flows:\n");
                println!("{}", report::format_edges(&solution));
            }
            println!("{}", report::summarize_plan(&solution));
        }

        Commands::ListRecipes => {
            let recipes = db::list_recipes(&conn)?;
            if recipes.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<30} {:<20}", "Recipe", "Building");
                println!("{}", "-".repeat(50));
                for r in recipes {
                    println!("{:<30} {:<20}", r.id, r.building.as_deref().unwrap_or("-"));
                }
            }
        }

        Commands::Recipe { id } => match db::get_recipe(&conn, &id)? {
            Some(recipe) => {
                println!("Recipe: {}", recipe.name);
                println!("  ID: {}", recipe.id);
                if let Some(building) = &recipe.building {
                    println!("  Building: {}", building);
                }
                if !recipe.ingredients.is_empty() {
                    println!("  Inputs:");
                    for i in &recipe.ingredients {
                        println!("    {} {}", i.amount, i.item);
                    }
                }
                if !recipe.products.is_empty() {
                    println!("  Outputs:");
                    for o in &recipe.products {
                        println!("    {} {}", o.amount, o.item);
                    }
                }
            }
            None => println!("Recipe '{}' not found", id),
        },

        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::LoadSample => {
            let loaded = load_sample_data(&conn)?;
            println!("Loaded {} sample recipes", loaded);
            println!("Try: solve \"1.7037x RecycledRubber\" \"1.85185x RecycledPlastic\" --external Fuel=120");
        }
    }

    Ok(())
}

/// Tolerance flag: must parse as a finite, non-negative number
fn parse_tolerance(text: &str) -> Result<f64, String> {
    let tolerance: f64 = text.trim().parse().map_err(|e| format!("{}", e))?;
    config::check_tolerance(tolerance).map_err(|e| e.to_string())
}

/// Built-in raw resources plus any marked natural in the catalog
fn natural_resources(conn: &Connection) -> Result<NaturalResources> {
    let extra = db::list_natural_items(conn)?;
    let standard = NaturalResources::standard();
    Ok(standard.iter().map(str::to_string).chain(extra).collect())
}

/// Load a handful of sample recipes for testing without an import tree
fn load_sample_data(conn: &Connection) -> Result<usize> {
    db::clear_catalog(conn)?;

    let recipes = [
        RecipeDefinition::new("IronIngot")
            .with_input("OreIron", 30.0)
            .with_output("IronIngot", 30.0),
        RecipeDefinition::new("IronPlate")
            .with_input("IronIngot", 30.0)
            .with_output("IronPlate", 20.0),
        RecipeDefinition::new("IronRod")
            .with_input("IronIngot", 15.0)
            .with_output("IronRod", 15.0),
        RecipeDefinition::new("Screw")
            .with_input("IronRod", 10.0)
            .with_output("Screw", 40.0),
        RecipeDefinition::new("ReinforcedIronPlate")
            .with_input("IronPlate", 30.0)
            .with_input("Screw", 60.0)
            .with_output("ReinforcedIronPlate", 5.0),
        RecipeDefinition::new("RecycledRubber")
            .with_input("Plastic", 30.0)
            .with_input("Fuel", 30.0)
            .with_output("Rubber", 60.0),
        RecipeDefinition::new("RecycledPlastic")
            .with_input("Rubber", 30.0)
            .with_input("Fuel", 30.0)
            .with_output("Plastic", 60.0),
        // Consumes more uranium cells than it yields back
        RecipeDefinition::new("CellReprocessing")
            .with_input("EncasedUraniumCell", 120.0)
            .with_output("EncasedUraniumCell", 60.0)
            .with_output("NuclearWaste", 10.0),
        RecipeDefinition::new("EncasedUraniumCell")
            .with_input("OreUranium", 50.0)
            .with_input("Sulfur", 30.0)
            .with_output("EncasedUraniumCell", 25.0),
    ];

    let loaded = recipes.len();
    for mut recipe in recipes {
        recipe.building = Some(
            match recipe.id.as_str() {
                "IronIngot" => "Smelter",
                "RecycledRubber" | "RecycledPlastic" => "Refinery",
                "CellReprocessing" | "EncasedUraniumCell" => "Blender",
                "ReinforcedIronPlate" => "Assembler",
                _ => "Constructor",
            }
            .to_string(),
        );
        db::upsert_recipe(conn, &recipe)?;
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_flag_rejects_nan_and_negatives() {
        assert_eq!(parse_tolerance("0.1"), Ok(0.1));
        assert!(parse_tolerance("NaN").is_err());
        assert!(parse_tolerance("-0.01").is_err());
        assert!(parse_tolerance("inf").is_err());
        assert!(Cli::try_parse_from(["production-planner", "solve", "--tolerance", "NaN", "1x IronIngot"]).is_err());
        assert!(Cli::try_parse_from(["production-planner", "solve", "--tolerance", "0.01", "1x IronIngot"]).is_ok());
    }
}
