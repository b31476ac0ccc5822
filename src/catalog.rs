//! Recipe catalog lookups used during preprocessing

use std::collections::HashMap;

use crate::error::CatalogError;
use crate::models::ItemAmount;

/// Per-recipe ingredient and product lists, per instance
pub trait Catalog {
    fn ingredients_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError>;
    fn products_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError>;
}

#[derive(Debug, Clone, Default)]
struct RecipeEntry {
    ingredients: Vec<ItemAmount>,
    products: Vec<ItemAmount>,
}

/// In-memory catalog, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    recipes: HashMap<String, RecipeEntry>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a recipe from `(item, amount)` pairs
    pub fn with_recipe(mut self, recipe: &str, ingredients: &[(&str, f64)], products: &[(&str, f64)]) -> Self {
        self.insert(
            recipe,
            ingredients.iter().map(|(i, a)| ItemAmount::new(*i, *a)).collect(),
            products.iter().map(|(i, a)| ItemAmount::new(*i, *a)).collect(),
        );
        self
    }

    pub fn insert(&mut self, recipe: &str, ingredients: Vec<ItemAmount>, products: Vec<ItemAmount>) {
        self.recipes.insert(
            recipe.to_string(),
            RecipeEntry {
                ingredients,
                products,
            },
        );
    }

    fn entry(&self, recipe: &str) -> Result<&RecipeEntry, CatalogError> {
        self.recipes
            .get(recipe)
            .ok_or_else(|| CatalogError::UnknownRecipe(recipe.to_string()))
    }
}

impl Catalog for MemoryCatalog {
    fn ingredients_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError> {
        Ok(self.entry(recipe)?.ingredients.clone())
    }

    fn products_of(&self, recipe: &str) -> Result<Vec<ItemAmount>, CatalogError> {
        Ok(self.entry(recipe)?.products.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_catalog_returns_declared_lists() {
        let catalog = MemoryCatalog::new().with_recipe("IronIngot", &[("OreIron", 30.0)], &[("IronIngot", 30.0)]);
        assert_eq!(
            catalog.ingredients_of("IronIngot").unwrap(),
            vec![ItemAmount::new("OreIron", 30.0)]
        );
        assert_eq!(
            catalog.products_of("IronIngot").unwrap(),
            vec![ItemAmount::new("IronIngot", 30.0)]
        );
    }

    #[test]
    fn unknown_recipe_is_an_error() {
        let catalog = MemoryCatalog::new();
        assert!(matches!(
            catalog.products_of("Nope"),
            Err(CatalogError::UnknownRecipe(name)) if name == "Nope"
        ));
    }
}
