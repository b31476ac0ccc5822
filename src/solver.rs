//! Batch orchestrator: places recipe instances tier by tier

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::models::{
    CircularGroup, FlowEdge, ItemAmount, NodeId, PendingInstance, RecipeInstance, RecipeNode,
};
use crate::preprocess::{self, MutualPass};
use crate::selector::{self, AllocationPlan, Overlay, Supply};

/// Fully placed node set with tiers and flow edges
#[derive(Debug, Clone)]
pub struct Solution {
    pub nodes: Vec<RecipeNode>,
}

/// Resolve `instances` into tiers and material flows
///
/// Each tier first places every pending instance whose ingredients are all
/// covered by earlier tiers, external inputs or natural resources, in input
/// order. Circular groups are then tried as a whole. Outputs of a tier only
/// become visible to the next one. A tier that places nothing is fatal.
pub fn solve<C: Catalog + ?Sized>(
    catalog: &C,
    instances: &[RecipeInstance],
    external_inputs: &[ItemAmount],
    config: &SolverConfig,
) -> Result<Solution, SolveError> {
    config.validate()?;
    let mut nodes = preprocess::build_nodes(catalog, instances, config)?;
    let mut groups = preprocess::find_circular_groups(&nodes);
    let mut supply = Supply::new(external_inputs);
    let mut tier = 0;

    info!(
        instances = nodes.len(),
        circular_groups = groups.len(),
        "solving production plan"
    );

    while nodes.iter().any(|n| !n.is_placed()) {
        let mut batch = place_ready(&mut nodes, &mut supply, tier, config)?;
        batch.extend(place_groups(&mut nodes, &mut supply, &groups, tier, config)?);

        if batch.is_empty() {
            let pending = pending_report(&nodes, &groups, &supply, config);
            warn!(tier, pending = pending.len(), "no progress, production plan stalled");
            return Err(SolveError::Stalled { tier, pending });
        }

        for id in &batch {
            supply.register(&nodes[id.0]);
        }
        groups.retain_mut(|group| group.retain_pending(|id| !nodes[id.0].is_placed()));

        info!(tier, placed = batch.len(), "tier complete");
        tier += 1;
    }

    Ok(Solution { nodes })
}

/// Ordinary placement: every pending node that can be fully supplied right now
fn place_ready(
    nodes: &mut [RecipeNode],
    supply: &mut Supply,
    tier: usize,
    config: &SolverConfig,
) -> Result<Vec<NodeId>, SolveError> {
    let mut batch = Vec::new();

    for idx in 0..nodes.len() {
        if nodes[idx].is_placed() {
            continue;
        }

        let id = nodes[idx].id;
        let needs = nodes[idx].scaled_ingredients();
        let mut overlay = Overlay::default();
        let Ok(plan) = selector::plan_needs(id, &needs, nodes, supply, &mut overlay, config) else {
            continue;
        };

        selector::commit_plan(nodes, supply, &plan, config)?;
        let yields = full_yield(&nodes[idx]);
        place(&mut nodes[idx], tier, plan.edges, yields, config);
        debug!(node = %id, instance = %nodes[idx].instance, tier, "placed");
        batch.push(id);
    }

    Ok(batch)
}

/// Joint placement of circular groups whose members are all still pending
fn place_groups(
    nodes: &mut [RecipeNode],
    supply: &mut Supply,
    groups: &[CircularGroup],
    tier: usize,
    config: &SolverConfig,
) -> Result<Vec<NodeId>, SolveError> {
    let mut batch = Vec::new();

    for group in groups {
        let members: Vec<NodeId> = group
            .members
            .iter()
            .copied()
            .filter(|id| !nodes[id.0].is_placed())
            .collect();
        if members.len() < 2 {
            continue;
        }

        let Some((pass, plans)) = resolve_group(nodes, supply, &members, config) else {
            debug!(members = ?members, tier, "circular group not yet satisfiable");
            continue;
        };

        for plan in &plans {
            selector::commit_plan(nodes, supply, plan, config)?;
        }

        for (plan, &id) in plans.into_iter().zip(&members) {
            let mut inbound: Vec<FlowEdge> = pass.edges_into(id).cloned().collect();
            inbound.extend(plan.edges);
            let yields = pass.yields.get(&id).cloned().unwrap_or_default();
            place(&mut nodes[id.0], tier, inbound, yields, config);
        }
        for &id in &members {
            nodes[id.0].outbound_edges.extend(pass.edges_from(id).cloned());
        }

        debug!(members = ?members, tier, links = pass.edges.len(), "placed circular group");
        batch.extend(members);
    }

    Ok(batch)
}

/// Mutual links first, then every member's leftover need against the supply.
/// `None` unless every member is covered.
fn resolve_group(
    nodes: &[RecipeNode],
    supply: &Supply,
    members: &[NodeId],
    config: &SolverConfig,
) -> Option<(MutualPass, Vec<AllocationPlan>)> {
    let pass = preprocess::mutual_links(nodes, members, config);

    // One overlay for the whole group so members never double-book a source
    let mut overlay = Overlay::default();
    let mut plans = Vec::with_capacity(members.len());
    for &id in members {
        let plan = selector::plan_needs(id, pass.needs_of(id), nodes, supply, &mut overlay, config).ok()?;
        plans.push(plan);
    }

    Some((pass, plans))
}

fn full_yield(node: &RecipeNode) -> Vec<f64> {
    node.products.iter().map(|p| p.amount * node.count()).collect()
}

/// Assign the tier and seed availability; inbound edges are set exactly once here
fn place(node: &mut RecipeNode, tier: usize, inbound: Vec<FlowEdge>, yields: Vec<f64>, config: &SolverConfig) {
    node.tier = Some(tier);
    node.available_products = yields.into_iter().map(|y| y.max(0.0)).collect();
    node.fully_consumed = node.available_products.iter().all(|a| config.is_zero(*a));

    node.inbound_edges = node.self_loops.clone();
    node.inbound_edges.extend(inbound);
    node.outbound_edges.extend(node.self_loops.iter().cloned());
}

/// Shortfall of every pending node
///
/// Members of a circular group are judged the way the group is placed: after
/// the mutual pass, against the supply as a whole. The group's shortfall of an
/// item is split across members in proportion to their leftover need.
fn pending_report(
    nodes: &[RecipeNode],
    groups: &[CircularGroup],
    supply: &Supply,
    config: &SolverConfig,
) -> Vec<PendingInstance> {
    let mut unmet: BTreeMap<NodeId, Vec<ItemAmount>> = BTreeMap::new();

    for group in groups {
        let members: Vec<NodeId> = group
            .members
            .iter()
            .copied()
            .filter(|id| !nodes[id.0].is_placed())
            .collect();
        if members.len() < 2 {
            continue;
        }
        for (id, shortfall) in group_shortfall(nodes, supply, &members, config) {
            unmet.insert(id, shortfall);
        }
    }

    nodes
        .iter()
        .filter(|n| !n.is_placed())
        .map(|node| {
            let unmet = unmet.remove(&node.id).unwrap_or_else(|| {
                let mut overlay = Overlay::default();
                let needs = node.scaled_ingredients();
                selector::plan_needs(node.id, &needs, nodes, supply, &mut overlay, config)
                    .err()
                    .unwrap_or_default()
            });
            PendingInstance {
                node: node.id,
                instance: node.instance.clone(),
                unmet,
            }
        })
        .collect()
}

fn group_shortfall(
    nodes: &[RecipeNode],
    supply: &Supply,
    members: &[NodeId],
    config: &SolverConfig,
) -> Vec<(NodeId, Vec<ItemAmount>)> {
    let pass = preprocess::mutual_links(nodes, members, config);

    let mut combined: Vec<ItemAmount> = Vec::new();
    for &id in members {
        for need in pass.needs_of(id) {
            match combined.iter_mut().find(|c| c.item == need.item) {
                Some(total) => total.amount += need.amount,
                None => combined.push(need.clone()),
            }
        }
    }

    let mut overlay = Overlay::default();
    let short = selector::plan_needs(members[0], &combined, nodes, supply, &mut overlay, config)
        .err()
        .unwrap_or_default();

    members
        .iter()
        .map(|&id| {
            let shares = pass
                .needs_of(id)
                .iter()
                .filter_map(|need| {
                    let missing = short.iter().find(|s| s.item == need.item)?;
                    let total = combined.iter().find(|c| c.item == need.item)?.amount;
                    Some(ItemAmount::new(need.item.clone(), missing.amount * need.amount / total))
                })
                .collect();
            (id, shares)
        })
        .collect()
}
