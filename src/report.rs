//! Views over a solved plan and their text formatting

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{FlowEdge, ItemId, NodeId, RecipeNode, SourceId};
use crate::solver::Solution;

impl Solution {
    pub fn node(&self, id: NodeId) -> Option<&RecipeNode> {
        self.nodes.get(id.0)
    }

    /// Every flow edge once, grouped by sink in node order
    pub fn edges(&self) -> Vec<&FlowEdge> {
        self.nodes.iter().flat_map(|n| n.inbound_edges.iter()).collect()
    }

    /// Node ids per tier, in input order within each tier
    pub fn tiers(&self) -> Vec<Vec<NodeId>> {
        let mut tiers: Vec<Vec<NodeId>> = Vec::new();
        for node in &self.nodes {
            if let Some(tier) = node.tier {
                if tiers.len() <= tier {
                    tiers.resize_with(tier + 1, Vec::new);
                }
                tiers[tier].push(node.id);
            }
        }
        tiers
    }

    /// Total drawn from each natural resource
    pub fn raw_resource_totals(&self) -> BTreeMap<ItemId, f64> {
        let mut totals = BTreeMap::new();
        for edge in self.edges() {
            if let SourceId::Natural(item) = &edge.source {
                *totals.entry(item.clone()).or_insert(0.0) += edge.amount;
            }
        }
        totals
    }

    /// Total drawn from the caller's external inputs
    pub fn external_totals(&self) -> BTreeMap<ItemId, f64> {
        let mut totals = BTreeMap::new();
        for edge in self.edges() {
            if edge.source == SourceId::External {
                *totals.entry(edge.item.clone()).or_insert(0.0) += edge.amount;
            }
        }
        totals
    }

    /// Yield left unconsumed once every instance is placed
    pub fn surplus(&self) -> BTreeMap<ItemId, f64> {
        let mut totals = BTreeMap::new();
        for node in &self.nodes {
            for (product, left) in node.products.iter().zip(&node.available_products) {
                if *left > 0.0 {
                    *totals.entry(product.item.clone()).or_insert(0.0) += *left;
                }
            }
        }
        totals
    }
}

fn source_label(solution: &Solution, source: &SourceId) -> String {
    match source {
        SourceId::Node(id) => match solution.node(*id) {
            Some(node) => format!("{} {}", id, node.instance.recipe),
            None => id.to_string(),
        },
        other => other.to_string(),
    }
}

/// Tier-by-tier listing with each node's inbound flows
pub fn format_tiers(solution: &Solution) -> String {
    let mut output = String::new();

    for (tier, ids) in solution.tiers().iter().enumerate() {
        output.push_str(&format!("Tier {}:\n", tier));
        for id in ids {
            let Some(node) = solution.node(*id) else {
                continue;
            };
            output.push_str(&format!("  {} {}\n", id, node.instance));
            for edge in &node.inbound_edges {
                let label = if edge.is_self_loop() {
                    "itself (catalyst)".to_string()
                } else {
                    source_label(solution, &edge.source)
                };
                output.push_str(&format!("    <- {:.3} {} from {}\n", edge.amount, edge.item, label));
            }
        }
    }

    output
}

/// Flat `source -> sink` edge listing
pub fn format_edges(solution: &Solution) -> String {
    let mut output = String::new();
    for edge in solution.edges() {
        output.push_str(&format!(
            "{} -> {}: {:.3} {}\n",
            source_label(solution, &edge.source),
            source_label(solution, &SourceId::Node(edge.sink)),
            edge.amount,
            edge.item
        ));
    }
    output
}

/// Summary of a solved plan
#[derive(Debug)]
pub struct PlanSummary {
    pub instances: usize,
    pub tiers: usize,
    pub edges: usize,
    pub raw_inputs: Vec<(String, f64)>,
    pub external_inputs: Vec<(String, f64)>,
    pub surplus: Vec<(String, f64)>,
}

pub fn summarize_plan(solution: &Solution) -> PlanSummary {
    PlanSummary {
        instances: solution.nodes.len(),
        tiers: solution.tiers().len(),
        edges: solution.edges().len(),
        raw_inputs: solution.raw_resource_totals().into_iter().collect(),
        external_inputs: solution.external_totals().into_iter().collect(),
        surplus: solution.surplus().into_iter().collect(),
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Plan Summary ===")?;
        writeln!(
            f,
            "{} instances in {} tiers, {} flows",
            self.instances, self.tiers, self.edges
        )?;

        if !self.raw_inputs.is_empty() {
            writeln!(f)?;
            writeln!(f, "Raw resources drawn:")?;
            for (item, amount) in &self.raw_inputs {
                writeln!(f, "  {:.3} {}", amount, item)?;
            }
        }

        if !self.external_inputs.is_empty() {
            writeln!(f)?;
            writeln!(f, "External inputs drawn:")?;
            for (item, amount) in &self.external_inputs {
                writeln!(f, "  {:.3} {}", amount, item)?;
            }
        }

        if !self.surplus.is_empty() {
            writeln!(f)?;
            writeln!(f, "Unconsumed output:")?;
            for (item, amount) in &self.surplus {
                writeln!(f, "  {:.3} {}", amount, item)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::config::SolverConfig;
    use crate::models::{ItemAmount, RecipeInstance};
    use crate::solver::solve;

    fn solved() -> Solution {
        let catalog = MemoryCatalog::new()
            .with_recipe("IronIngot", &[("OreIron", 30.0)], &[("IronIngot", 30.0)])
            .with_recipe("IronPlate", &[("IronIngot", 30.0), ("Coating", 5.0)], &[("IronPlate", 20.0)]);
        let instances = [RecipeInstance::new("IronIngot", 2.0), RecipeInstance::new("IronPlate", 1.0)];
        solve(
            &catalog,
            &instances,
            &[ItemAmount::new("Coating", 10.0)],
            &SolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn views_group_tiers_and_totals() {
        let solution = solved();
        assert_eq!(solution.tiers(), vec![vec![NodeId(0)], vec![NodeId(1)]]);
        assert_eq!(solution.edges().len(), 3);
        assert_eq!(solution.raw_resource_totals().get("OreIron"), Some(&60.0));
        assert_eq!(solution.external_totals().get("Coating"), Some(&5.0));
        assert_eq!(solution.surplus().get("IronIngot"), Some(&30.0));
        assert_eq!(solution.surplus().get("IronPlate"), Some(&20.0));
    }

    #[test]
    fn formatted_output_names_sources() {
        let solution = solved();
        let tiers = format_tiers(&solution);
        assert!(tiers.contains("Tier 1:"));
        assert!(tiers.contains("<- 30.000 IronIngot from #0 IronIngot"));

        let edges = format_edges(&solution);
        assert!(edges.contains("OreIron (natural) -> #0 IronIngot: 60.000 OreIron"));

        let summary = summarize_plan(&solution).to_string();
        assert!(summary.contains("2 instances in 2 tiers, 3 flows"));
    }
}
