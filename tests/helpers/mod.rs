//! Shared assertions over solved plans

#![allow(dead_code)]

use std::collections::BTreeMap;

use production_planner::models::CircularGroup;
use production_planner::{Catalog, RecipeInstance, SolverConfig, SourceId, Solution, preprocess};

pub const TOLERANCE: f64 = production_planner::DEFAULT_TOLERANCE;

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.01
}

/// Circular groups as the solver finds them before the first tier
pub fn circular_groups<C: Catalog + ?Sized>(catalog: &C, instances: &[RecipeInstance]) -> Vec<CircularGroup> {
    let nodes = preprocess::build_nodes(catalog, instances, &SolverConfig::default()).expect("nodes build");
    preprocess::find_circular_groups(&nodes)
}

/// Every edge from a placed node points to a later tier, or to the same tier
/// when source and sink belong to one circular group
pub fn assert_tiering(solution: &Solution, groups: &[CircularGroup]) {
    for edge in solution.edges() {
        if edge.is_self_loop() {
            continue;
        }
        if let SourceId::Node(source) = &edge.source {
            let from = solution.nodes[source.0].tier.expect("source placed");
            let to = solution.nodes[edge.sink.0].tier.expect("sink placed");
            let grouped = groups
                .iter()
                .any(|g| g.members.contains(source) && g.members.contains(&edge.sink));
            if grouped {
                assert_eq!(from, to, "group edge {:?} crosses tiers", edge);
            } else {
                assert!(from < to, "edge {:?} is not strictly forward", edge);
            }
        }
    }
}

/// No node ships more of an item than it makes
pub fn assert_conservation(solution: &Solution) {
    for node in &solution.nodes {
        let mut shipped: BTreeMap<&str, f64> = BTreeMap::new();
        for edge in node.outbound_edges.iter().filter(|e| !e.is_self_loop()) {
            *shipped.entry(edge.item.as_str()).or_insert(0.0) += edge.amount;
        }
        for (item, amount) in shipped {
            let made: f64 = node
                .products
                .iter()
                .filter(|p| p.item == item)
                .map(|p| p.amount * node.instance.count)
                .sum();
            assert!(
                amount <= made + TOLERANCE,
                "node {} ships {} {} but makes {}",
                node.id,
                amount,
                item,
                made
            );
        }
        assert!(node.available_products.iter().all(|a| *a >= 0.0));
    }
}

/// Each consumer receives what it needs, within tolerance
pub fn assert_needs_met(solution: &Solution) {
    for node in &solution.nodes {
        for need in node.scaled_ingredients() {
            let received: f64 = node
                .inbound_edges
                .iter()
                .filter(|e| e.item == need.item && !e.is_self_loop())
                .map(|e| e.amount)
                .sum();
            assert!(
                received >= need.amount - TOLERANCE,
                "node {} received {} of {} but needs {}",
                node.id,
                received,
                need.item,
                need.amount
            );
        }
    }
}
