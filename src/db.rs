//! Database schema and operations for the recipe catalog

use anyhow::Result;
use rusqlite::Connection;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::models::{ItemAmount, RecipeDefinition};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Items with unlimited external supply
        CREATE TABLE IF NOT EXISTS natural_items (
            id TEXT PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            building TEXT
        );

        -- Row ids keep declaration order, duplicates included
        CREATE TABLE IF NOT EXISTS recipe_inputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id TEXT NOT NULL,
            item_id TEXT NOT NULL,
            amount REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_inputs_recipe ON recipe_inputs(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_recipe ON recipe_outputs(recipe_id);
        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_item ON recipe_outputs(item_id);
        "#,
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its input and output lines
pub fn upsert_recipe(conn: &Connection, recipe: &RecipeDefinition) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT OR REPLACE INTO recipes (id, name, building) VALUES (?1, ?2, ?3)",
        (&recipe.id, &recipe.name, &recipe.building),
    )?;
    tx.execute("DELETE FROM recipe_inputs WHERE recipe_id = ?1", [&recipe.id])?;
    tx.execute("DELETE FROM recipe_outputs WHERE recipe_id = ?1", [&recipe.id])?;

    for input in &recipe.ingredients {
        tx.execute(
            "INSERT INTO recipe_inputs (recipe_id, item_id, amount) VALUES (?1, ?2, ?3)",
            (&recipe.id, &input.item, input.amount),
        )?;
    }
    for output in &recipe.products {
        tx.execute(
            "INSERT INTO recipe_outputs (recipe_id, item_id, amount) VALUES (?1, ?2, ?3)",
            (&recipe.id, &output.item, output.amount),
        )?;
    }

    tx.commit()?;
    Ok(())
}

pub fn insert_natural_item(conn: &Connection, item: &str) -> Result<()> {
    conn.execute("INSERT OR IGNORE INTO natural_items (id) VALUES (?1)", [item])?;
    Ok(())
}

/// Clear all catalog data (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM natural_items;
        "#,
    )?;
    Ok(())
}

fn item_lines(conn: &Connection, table: &str, recipe_id: &str) -> rusqlite::Result<Vec<ItemAmount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, amount FROM {} WHERE recipe_id = ?1 ORDER BY id",
        table
    ))?;

    let rows = stmt.query_map([recipe_id], |row| Ok(ItemAmount::new(row.get::<_, String>(0)?, row.get(1)?)))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn recipe_exists(conn: &Connection, recipe_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes WHERE id = ?1", [recipe_id], |row| {
        row.get(0)
    })?;
    Ok(count > 0)
}

/// Get all inputs for a recipe, in declaration order
pub fn get_recipe_inputs(conn: &Connection, recipe_id: &str) -> Result<Vec<ItemAmount>> {
    Ok(item_lines(conn, "recipe_inputs", recipe_id)?)
}

/// Get all outputs for a recipe, in declaration order
pub fn get_recipe_outputs(conn: &Connection, recipe_id: &str) -> Result<Vec<ItemAmount>> {
    Ok(item_lines(conn, "recipe_outputs", recipe_id)?)
}

/// Load one full recipe definition
pub fn get_recipe(conn: &Connection, recipe_id: &str) -> Result<Option<RecipeDefinition>> {
    let mut stmt = conn.prepare("SELECT id, name, building FROM recipes WHERE id = ?1")?;
    let mut rows = stmt.query_map([recipe_id], |row| {
        Ok(RecipeDefinition {
            id: row.get(0)?,
            name: row.get(1)?,
            building: row.get(2)?,
            ingredients: Vec::new(),
            products: Vec::new(),
        })
    })?;

    let Some(row) = rows.next() else {
        return Ok(None);
    };
    let mut recipe = row?;
    recipe.ingredients = get_recipe_inputs(conn, recipe_id)?;
    recipe.products = get_recipe_outputs(conn, recipe_id)?;
    Ok(Some(recipe))
}

/// List all recipes in the database (without their item lines)
pub fn list_recipes(conn: &Connection) -> Result<Vec<RecipeDefinition>> {
    let mut stmt = conn.prepare("SELECT id, name, building FROM recipes ORDER BY id")?;

    let rows = stmt.query_map([], |row| {
        Ok(RecipeDefinition {
            id: row.get(0)?,
            name: row.get(1)?,
            building: row.get(2)?,
            ingredients: Vec::new(),
            products: Vec::new(),
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn list_natural_items(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM natural_items ORDER BY id")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Catalog backed by the recipe tables
pub struct SqliteCatalog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn lines(&self, table: &str, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError> {
        let storage = |e: anyhow::Error| CatalogError::Storage(e.to_string());
        if !recipe_exists(self.conn, recipe).map_err(storage)? {
            return Err(CatalogError::UnknownRecipe(recipe.to_string()));
        }
        item_lines(self.conn, table, recipe).map_err(|e| CatalogError::Storage(e.to_string()))
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn ingredients_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError> {
        self.lines("recipe_inputs", recipe)
    }

    fn products_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError> {
        self.lines("recipe_outputs", recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn recipe_round_trips_through_tables() {
        let conn = memory_db();
        let recipe = RecipeDefinition::new("IronIngot")
            .with_input("OreIron", 30.0)
            .with_output("IronIngot", 30.0);
        upsert_recipe(&conn, &recipe).unwrap();

        assert_eq!(get_recipe(&conn, "IronIngot").unwrap(), Some(recipe));
        assert_eq!(get_recipe(&conn, "Missing").unwrap(), None);
    }

    #[test]
    fn upsert_replaces_previous_lines() {
        let conn = memory_db();
        upsert_recipe(&conn, &RecipeDefinition::new("Wire").with_input("CopperIngot", 15.0)).unwrap();
        upsert_recipe(&conn, &RecipeDefinition::new("Wire").with_input("IronIngot", 12.5)).unwrap();

        assert_eq!(
            get_recipe_inputs(&conn, "Wire").unwrap(),
            vec![ItemAmount::new("IronIngot", 12.5)]
        );
        assert_eq!(list_recipes(&conn).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_outputs_keep_declaration_order() {
        let conn = memory_db();
        upsert_recipe(
            &conn,
            &RecipeDefinition::new("Split").with_output("X", 4.0).with_output("X", 20.0),
        )
        .unwrap();

        let catalog = SqliteCatalog::new(&conn);
        assert_eq!(
            catalog.products_of("Split").unwrap(),
            vec![ItemAmount::new("X", 4.0), ItemAmount::new("X", 20.0)]
        );
    }

    #[test]
    fn sqlite_catalog_rejects_unknown_recipe() {
        let conn = memory_db();
        let catalog = SqliteCatalog::new(&conn);
        assert!(matches!(
            catalog.ingredients_of("Nope"),
            Err(CatalogError::UnknownRecipe(_))
        ));
    }

    #[test]
    fn clear_removes_everything() {
        let conn = memory_db();
        insert_natural_item(&conn, "Fuel").unwrap();
        upsert_recipe(&conn, &RecipeDefinition::new("Wire")).unwrap();
        assert_eq!(list_natural_items(&conn).unwrap(), vec!["Fuel".to_string()]);

        clear_catalog(&conn).unwrap();
        assert!(list_recipes(&conn).unwrap().is_empty());
        assert!(list_natural_items(&conn).unwrap().is_empty());
    }
}
