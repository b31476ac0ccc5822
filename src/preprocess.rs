//! Catalyst netting and circular-dependency grouping
//!
//! Runs once before batching. Every later step reads the net ingredient and
//! product lists produced here, never the catalog's raw lists.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::Catalog;
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::models::{CircularGroup, FlowEdge, ItemAmount, NodeId, RecipeInstance, RecipeNode, SourceId};

/// Build one node per instance, with catalog lists looked up once and catalysts netted out
pub fn build_nodes<C: Catalog + ?Sized>(
    catalog: &C,
    instances: &[RecipeInstance],
    config: &SolverConfig,
) -> Result<Vec<RecipeNode>, SolveError> {
    let mut nodes = Vec::with_capacity(instances.len());

    for (idx, instance) in instances.iter().enumerate() {
        let id = NodeId(idx);
        if !instance.count.is_finite() || instance.count <= 0.0 {
            return Err(SolveError::InvalidInstance {
                node: id,
                recipe: instance.recipe.clone(),
                count: instance.count,
            });
        }

        let mut node = RecipeNode::new(id, instance.clone());
        node.ingredients = catalog.ingredients_of(&instance.recipe)?;
        node.products = catalog.products_of(&instance.recipe)?;
        net_catalysts(&mut node, config);
        nodes.push(node);
    }

    Ok(nodes)
}

/// Subtract self-consumption from both sides and record the recirculation as a self-loop
///
/// Only the first product line matching an ingredient's item is netted.
pub fn net_catalysts(node: &mut RecipeNode, config: &SolverConfig) {
    let count = node.count();

    for ingredient in node.ingredients.iter_mut() {
        let Some(product) = node.products.iter_mut().find(|p| p.item == ingredient.item) else {
            continue;
        };

        let catalyst = ingredient.amount.min(product.amount);
        if catalyst <= 0.0 {
            continue;
        }

        ingredient.amount -= catalyst;
        product.amount -= catalyst;
        node.self_loops.push(FlowEdge {
            source: SourceId::Node(node.id),
            sink: node.id,
            item: ingredient.item.clone(),
            amount: catalyst * count,
        });
        debug!(
            node = %node.id,
            item = %ingredient.item,
            amount = catalyst * count,
            "netted catalyst"
        );
    }

    // Needs within tolerance count as met; small yields still add up across producers
    node.ingredients.retain(|i| !config.is_zero(i.amount * count));
    node.products.retain(|p| p.amount > 0.0);
}

/// `a` consumes something `b` produces
fn depends_on(a: &RecipeNode, b: &RecipeNode) -> bool {
    a.ingredients.iter().any(|i| b.produces(&i.item))
}

/// Pending nodes that self-consume or mutually depend on another pending node
pub fn detect_circular(nodes: &[RecipeNode]) -> Vec<NodeId> {
    let pending: Vec<&RecipeNode> = nodes.iter().filter(|n| !n.is_placed()).collect();

    pending
        .iter()
        .filter(|a| {
            depends_on(a, a)
                || pending
                    .iter()
                    .any(|b| a.id != b.id && depends_on(a, b) && depends_on(b, a))
        })
        .map(|n| n.id)
        .collect()
}

/// Connected components of the circular nodes, linked wherever either needs the other's output
pub fn group_circular(nodes: &[RecipeNode], circular: &[NodeId]) -> Vec<CircularGroup> {
    let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for &a in circular {
        let linked = circular
            .iter()
            .copied()
            .filter(|&b| {
                a != b && (depends_on(&nodes[a.0], &nodes[b.0]) || depends_on(&nodes[b.0], &nodes[a.0]))
            })
            .collect();
        adjacency.insert(a, linked);
    }

    let mut visited = std::collections::BTreeSet::new();
    let mut groups = Vec::new();

    for &start in adjacency.keys() {
        if !visited.insert(start) {
            continue;
        }

        let mut members = vec![start];
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            for &next in &adjacency[&current] {
                if visited.insert(next) {
                    members.push(next);
                    stack.push(next);
                }
            }
        }

        // Lone self-catalysts are already handled by netting
        if members.len() > 1 {
            members.sort();
            groups.push(CircularGroup { members });
        }
    }

    groups
}

pub fn find_circular_groups(nodes: &[RecipeNode]) -> Vec<CircularGroup> {
    let circular = detect_circular(nodes);
    let groups = group_circular(nodes, &circular);
    for group in &groups {
        debug!(members = ?group.members, "found circular group");
    }
    groups
}

/// Outcome of linking group members to each other before any external check
#[derive(Debug, Clone, Default)]
pub struct MutualPass {
    pub edges: Vec<FlowEdge>,
    /// Remaining total need per member, after mutual links
    pub needs: BTreeMap<NodeId, Vec<ItemAmount>>,
    /// Remaining total yield per member, parallel to its products
    pub yields: BTreeMap<NodeId, Vec<f64>>,
}

impl MutualPass {
    pub fn needs_of(&self, id: NodeId) -> &[ItemAmount] {
        self.needs.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edges_into(&self, id: NodeId) -> impl Iterator<Item = &FlowEdge> {
        self.edges.iter().filter(move |e| e.sink == id)
    }

    pub fn edges_from(&self, id: NodeId) -> impl Iterator<Item = &FlowEdge> {
        self.edges.iter().filter(move |e| e.source == SourceId::Node(id))
    }
}

/// Link every member's needs against the other members' yields, in member order
///
/// Pure: reads node lists and returns the links plus what is left on each side.
pub fn mutual_links(nodes: &[RecipeNode], members: &[NodeId], config: &SolverConfig) -> MutualPass {
    let mut pass = MutualPass::default();
    for &id in members {
        let node = &nodes[id.0];
        pass.needs.insert(id, node.scaled_ingredients());
        pass.yields.insert(
            id,
            node.products.iter().map(|p| p.amount * node.count()).collect(),
        );
    }

    for &consumer in members {
        for need_idx in 0..pass.needs[&consumer].len() {
            for &producer in members {
                if producer == consumer {
                    continue;
                }

                let item = pass.needs[&consumer][need_idx].item.clone();
                let products = &nodes[producer.0].products;
                for (line, product) in products.iter().enumerate() {
                    if product.item != item {
                        continue;
                    }

                    let need = pass.needs[&consumer][need_idx].amount;
                    let available = pass.yields[&producer][line];
                    let link = need.min(available);
                    if config.is_zero(link) {
                        continue;
                    }

                    if let Some(needs) = pass.needs.get_mut(&consumer) {
                        needs[need_idx].amount -= link;
                    }
                    if let Some(yields) = pass.yields.get_mut(&producer) {
                        yields[line] -= link;
                        if config.is_zero(yields[line]) {
                            yields[line] = 0.0;
                        }
                    }
                    pass.edges.push(FlowEdge {
                        source: SourceId::Node(producer),
                        sink: consumer,
                        item: item.clone(),
                        amount: link,
                    });
                }
            }
        }
    }

    for needs in pass.needs.values_mut() {
        needs.retain(|n| !config.is_zero(n.amount));
    }

    pass
}
