//! Registry of items with unlimited external supply

use std::collections::BTreeSet;

use crate::models::ItemId;

const STANDARD: &[&str] = &[
    "OreIron",
    "OreCopper",
    "Stone",
    "Coal",
    "OreGold",
    "RawQuartz",
    "Sulfur",
    "OreBauxite",
    "OreUranium",
    "SAM",
    "Water",
    "LiquidOil",
    "NitrogenGas",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalResources {
    items: BTreeSet<ItemId>,
}

impl NaturalResources {
    /// The built-in set of raw resources
    pub fn standard() -> Self {
        STANDARD.iter().copied().collect()
    }

    pub fn none() -> Self {
        Self {
            items: BTreeSet::new(),
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.contains(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

impl Default for NaturalResources {
    fn default() -> Self {
        Self::standard()
    }
}

impl<S: Into<ItemId>> FromIterator<S> for NaturalResources {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_contains_ores_and_fluids() {
        let natural = NaturalResources::standard();
        assert!(natural.contains("OreIron"));
        assert!(natural.contains("Water"));
        assert!(!natural.contains("IronIngot"));
    }

    #[test]
    fn custom_set_replaces_standard() {
        let natural: NaturalResources = ["Fuel"].into_iter().collect();
        assert!(natural.contains("Fuel"));
        assert!(!natural.contains("OreIron"));
        assert!(!NaturalResources::none().contains("Fuel"));
    }
}
