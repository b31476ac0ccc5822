//! Ingredient source selection and two-phase allocation
//!
//! `select_sources` decides which supplies to draw an ingredient from.
//! `plan_needs` turns a node's needs into an [`AllocationPlan`] without
//! touching any supply; only `commit_plan` mutates availability.

use std::collections::{BTreeMap, HashMap};

use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::models::{FlowEdge, ItemAmount, ItemId, NodeId, RecipeNode, SourceId};

/// A supply that can be drawn from, with its current remaining amount
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: SourceId,
    pub amount: f64,
}

impl Candidate {
    pub fn new(source: SourceId, amount: f64) -> Self {
        Self { source, amount }
    }
}

/// Choose which sources cover `needed` of `item`, in consumption order
///
/// Returns an empty list when nothing is needed or when a non-natural item
/// cannot be covered by all sources combined. A single source large enough
/// on its own wins, the smallest such one; otherwise sources are consumed
/// smallest-first. Equal amounts keep their candidate order.
pub fn select_sources(
    item: &str,
    needed: f64,
    sources: &[Candidate],
    natural: bool,
    config: &SolverConfig,
) -> Vec<SourceId> {
    if config.is_zero(needed) {
        return Vec::new();
    }

    let mut usable: Vec<&Candidate> = sources.iter().filter(|c| c.amount > 0.0).collect();
    let total: f64 = usable.iter().map(|c| c.amount).sum();
    if !natural && !config.covers(total, needed) {
        return Vec::new();
    }

    usable.sort_by(|a, b| a.amount.total_cmp(&b.amount));

    if let Some(closest) = usable.iter().find(|c| config.covers(c.amount, needed)) {
        return vec![closest.source.clone()];
    }

    let mut picked = Vec::new();
    let mut covered = 0.0;
    for candidate in usable {
        if config.covers(covered, needed) {
            break;
        }
        covered += candidate.amount;
        picked.push(candidate.source.clone());
    }

    if natural && !config.covers(covered, needed) {
        picked.push(SourceId::Natural(item.to_string()));
    }

    picked
}

/// One draw of an item from one source
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    pub source: SourceId,
    pub amount: f64,
}

/// Split `needed` across the selected sources. `None` means infeasible.
pub fn allocate(
    item: &str,
    needed: f64,
    sources: &[Candidate],
    natural: bool,
    config: &SolverConfig,
) -> Option<Vec<Draw>> {
    if config.is_zero(needed) {
        return Some(Vec::new());
    }

    let order = select_sources(item, needed, sources, natural, config);
    if order.is_empty() {
        return None;
    }

    let mut remaining = needed;
    let mut draws = Vec::with_capacity(order.len());
    for source in order {
        let amount = match &source {
            SourceId::Natural(_) => remaining,
            other => sources
                .iter()
                .find(|c| &c.source == other)
                .map_or(0.0, |c| c.amount.min(remaining)),
        };
        if amount > 0.0 {
            remaining -= amount;
            draws.push(Draw { source, amount });
        }
    }

    Some(draws)
}

/// The produced set: placed nodes that still hold stock, plus external inputs
#[derive(Debug, Clone, Default)]
pub struct Supply {
    external: BTreeMap<ItemId, f64>,
    producers: BTreeMap<ItemId, Vec<NodeId>>,
}

impl Supply {
    pub fn new(external_inputs: &[ItemAmount]) -> Self {
        let mut external = BTreeMap::new();
        for input in external_inputs {
            *external.entry(input.item.clone()).or_insert(0.0) += input.amount;
        }
        Self {
            external,
            producers: BTreeMap::new(),
        }
    }

    /// Make a placed node's outputs visible to later tiers
    pub fn register(&mut self, node: &RecipeNode) {
        for product in &node.products {
            let producers = self.producers.entry(product.item.clone()).or_default();
            if !producers.contains(&node.id) {
                producers.push(node.id);
                producers.sort();
            }
        }
    }

    pub fn external(&self, item: &str) -> f64 {
        self.external.get(item).copied().unwrap_or(0.0)
    }

    /// Candidates for `item`: external first, then producers by ascending id
    ///
    /// Staged draws that leave only a residue within tolerance use the source up,
    /// the same way a committed draw does.
    fn candidates(&self, item: &str, nodes: &[RecipeNode], overlay: &Overlay, config: &SolverConfig) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        let mut push = |source: SourceId, stock: f64| {
            let drawn = overlay.drawn(&source, item);
            let amount = stock - drawn;
            if amount > 0.0 && !(drawn > 0.0 && config.is_zero(amount)) {
                candidates.push(Candidate::new(source, amount));
            }
        };

        push(SourceId::External, self.external(item));
        for &id in self.producers.get(item).into_iter().flatten() {
            push(SourceId::Node(id), nodes[id.0].available(item));
        }

        candidates
    }

    fn take_external(&mut self, item: &str, amount: f64, config: &SolverConfig) {
        if let Some(stock) = self.external.get_mut(item) {
            *stock -= amount;
            if config.is_zero(*stock) {
                *stock = 0.0;
            }
        }
    }
}

/// Draws staged by plans that have not been committed
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    drawn: HashMap<(SourceId, ItemId), f64>,
}

impl Overlay {
    fn drawn(&self, source: &SourceId, item: &str) -> f64 {
        self.drawn
            .get(&(source.clone(), item.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    fn stage(&mut self, source: &SourceId, item: &str, amount: f64) {
        if matches!(source, SourceId::Natural(_)) {
            return;
        }
        *self.drawn.entry((source.clone(), item.to_string())).or_insert(0.0) += amount;
    }
}

/// Edges a node would receive if the plan is committed
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub sink: NodeId,
    pub edges: Vec<FlowEdge>,
}

/// Plan every need of `sink` against the supply, staging draws in `overlay`
///
/// On failure returns the shortfall of every unmet item. The overlay may then
/// hold partial draws and must be discarded by the caller.
pub fn plan_needs(
    sink: NodeId,
    needs: &[ItemAmount],
    nodes: &[RecipeNode],
    supply: &Supply,
    overlay: &mut Overlay,
    config: &SolverConfig,
) -> Result<AllocationPlan, Vec<ItemAmount>> {
    let mut plan = AllocationPlan {
        sink,
        edges: Vec::new(),
    };
    let mut unmet = Vec::new();

    for need in needs {
        let natural = config.natural.contains(&need.item);
        let candidates = supply.candidates(&need.item, nodes, overlay, config);

        match allocate(&need.item, need.amount, &candidates, natural, config) {
            Some(draws) => {
                for draw in draws {
                    overlay.stage(&draw.source, &need.item, draw.amount);
                    plan.edges.push(FlowEdge {
                        source: draw.source,
                        sink,
                        item: need.item.clone(),
                        amount: draw.amount,
                    });
                }
            }
            None => {
                let available: f64 = candidates.iter().map(|c| c.amount).sum();
                unmet.push(ItemAmount::new(need.item.clone(), (need.amount - available).max(0.0)));
            }
        }
    }

    if unmet.is_empty() { Ok(plan) } else { Err(unmet) }
}

/// Apply a confirmed plan: decrement every drawn source and record outbound edges
///
/// The sink's inbound edges are not touched; they are assigned at placement.
pub fn commit_plan(
    nodes: &mut [RecipeNode],
    supply: &mut Supply,
    plan: &AllocationPlan,
    config: &SolverConfig,
) -> Result<(), SolveError> {
    for edge in &plan.edges {
        match &edge.source {
            SourceId::Natural(_) => {}
            SourceId::External => supply.take_external(&edge.item, edge.amount, config),
            SourceId::Node(id) => {
                let source = nodes.get_mut(id.0).ok_or(SolveError::UnknownSource {
                    node: *id,
                    sink: edge.sink,
                })?;
                draw_from_node(source, edge, config)?;
            }
        }
    }
    Ok(())
}

fn draw_from_node(node: &mut RecipeNode, edge: &FlowEdge, config: &SolverConfig) -> Result<(), SolveError> {
    if !node.produces(&edge.item) {
        return Err(SolveError::MissingProduct {
            node: node.id,
            sink: edge.sink,
            item: edge.item.clone(),
        });
    }
    if !node.is_placed() {
        return Err(SolveError::UnknownSource {
            node: node.id,
            sink: edge.sink,
        });
    }

    let mut remaining = edge.amount;
    for (product, stock) in node.products.iter().zip(node.available_products.iter_mut()) {
        if product.item != edge.item || remaining <= 0.0 {
            continue;
        }
        let taken = stock.min(remaining);
        *stock -= taken;
        remaining -= taken;
        if config.is_zero(*stock) {
            *stock = 0.0;
        }
    }

    node.fully_consumed = node.available_products.iter().all(|a| config.is_zero(*a));
    node.outbound_edges.push(edge.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeInstance;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    fn node(id: usize) -> SourceId {
        SourceId::Node(NodeId(id))
    }

    #[test]
    fn zero_need_selects_nothing() {
        let sources = [Candidate::new(node(0), 10.0)];
        assert!(select_sources("Plate", 0.01, &sources, false, &config()).is_empty());
        assert_eq!(allocate("Plate", 0.0, &sources, false, &config()), Some(Vec::new()));
    }

    #[test]
    fn insufficient_total_defers() {
        let sources = [Candidate::new(node(0), 2.0), Candidate::new(node(1), 3.0)];
        assert!(select_sources("Plate", 6.0, &sources, false, &config()).is_empty());
        assert_eq!(allocate("Plate", 6.0, &sources, false, &config()), None);
    }

    #[test]
    fn closest_single_source_preserves_larger_ones() {
        let sources = [
            Candidate::new(node(0), 100.0),
            Candidate::new(node(1), 12.0),
            Candidate::new(node(2), 5.0),
        ];
        assert_eq!(select_sources("Plate", 10.0, &sources, false, &config()), vec![node(1)]);
    }

    #[test]
    fn source_within_tolerance_counts_as_sufficient() {
        let sources = [Candidate::new(node(0), 9.97), Candidate::new(node(1), 50.0)];
        assert_eq!(select_sources("Plate", 10.0, &sources, false, &config()), vec![node(0)]);
    }

    #[test]
    fn fragments_are_consumed_smallest_first() {
        let sources = [
            Candidate::new(node(0), 6.0),
            Candidate::new(node(1), 2.0),
            Candidate::new(node(2), 4.0),
        ];
        assert_eq!(
            select_sources("Plate", 7.0, &sources, false, &config()),
            vec![node(1), node(2), node(0)]
        );

        let draws = allocate("Plate", 7.0, &sources, false, &config()).unwrap();
        let amounts: Vec<f64> = draws.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![2.0, 4.0, 1.0]);
    }

    #[test]
    fn natural_resource_covers_the_shortfall() {
        let sources = [Candidate::new(node(0), 20.0)];
        let draws = allocate("Water", 50.0, &sources, true, &config()).unwrap();
        assert_eq!(
            draws,
            vec![
                Draw {
                    source: node(0),
                    amount: 20.0
                },
                Draw {
                    source: SourceId::Natural("Water".into()),
                    amount: 30.0
                },
            ]
        );

        let draws = allocate("OreIron", 90.0, &[], true, &config()).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].amount, 90.0);
    }

    #[test]
    fn sources_below_tolerance_still_add_up() {
        let sources = [
            Candidate::new(node(0), 0.04),
            Candidate::new(node(1), 0.04),
            Candidate::new(node(2), 0.04),
        ];
        assert_eq!(select_sources("Dust", 0.1, &sources, false, &config()), vec![node(0), node(1)]);
    }

    #[test]
    fn ties_keep_candidate_order() {
        let sources = [Candidate::new(node(3), 4.0), Candidate::new(node(1), 4.0)];
        assert_eq!(
            select_sources("Plate", 8.0, &sources, false, &config()),
            vec![node(3), node(1)]
        );
    }

    fn placed_producer(id: usize, item: &str, amount: f64) -> RecipeNode {
        let mut node = RecipeNode::new(NodeId(id), RecipeInstance::new("Maker", 1.0));
        node.products = vec![ItemAmount::new(item, amount)];
        node.available_products = vec![amount];
        node.tier = Some(0);
        node
    }

    #[test]
    fn planning_does_not_mutate_until_commit() {
        let mut nodes = vec![placed_producer(0, "Plate", 10.0)];
        let mut supply = Supply::new(&[]);
        supply.register(&nodes[0]);

        let needs = [ItemAmount::new("Plate", 6.0)];
        let mut overlay = Overlay::default();
        let plan = plan_needs(NodeId(1), &needs, &nodes, &supply, &mut overlay, &config()).unwrap();
        assert_eq!(nodes[0].available_products, vec![10.0]);

        commit_plan(&mut nodes, &mut supply, &plan, &config()).unwrap();
        assert_eq!(nodes[0].available_products, vec![4.0]);
        assert_eq!(nodes[0].outbound_edges.len(), 1);
        assert!(!nodes[0].fully_consumed);
    }

    #[test]
    fn repeated_item_needs_share_the_overlay() {
        let nodes = vec![placed_producer(0, "Plate", 10.0)];
        let mut supply = Supply::new(&[]);
        supply.register(&nodes[0]);

        let needs = [ItemAmount::new("Plate", 6.0), ItemAmount::new("Plate", 6.0)];
        let mut overlay = Overlay::default();
        let unmet = plan_needs(NodeId(1), &needs, &nodes, &supply, &mut overlay, &config()).unwrap_err();
        assert_eq!(unmet, vec![ItemAmount::new("Plate", 2.0)]);
    }

    #[test]
    fn external_inputs_are_drawn_and_decremented() {
        let mut nodes: Vec<RecipeNode> = Vec::new();
        let mut supply = Supply::new(&[ItemAmount::new("Fuel", 40.0), ItemAmount::new("Fuel", 20.0)]);
        assert_eq!(supply.external("Fuel"), 60.0);

        let needs = [ItemAmount::new("Fuel", 25.0)];
        let mut overlay = Overlay::default();
        let plan = plan_needs(NodeId(0), &needs, &nodes, &supply, &mut overlay, &config()).unwrap();
        assert_eq!(plan.edges[0].source, SourceId::External);

        commit_plan(&mut nodes, &mut supply, &plan, &config()).unwrap();
        assert_eq!(supply.external("Fuel"), 35.0);
    }

    #[test]
    fn commit_rejects_edge_for_missing_product() {
        let mut nodes = vec![placed_producer(0, "Plate", 10.0)];
        let mut supply = Supply::new(&[]);
        let plan = AllocationPlan {
            sink: NodeId(1),
            edges: vec![FlowEdge {
                source: node(0),
                sink: NodeId(1),
                item: "Screw".into(),
                amount: 1.0,
            }],
        };
        let err = commit_plan(&mut nodes, &mut supply, &plan, &config()).unwrap_err();
        assert!(matches!(err, SolveError::MissingProduct { .. }));
    }

    #[test]
    fn commit_rejects_unknown_source_node() {
        let mut nodes = vec![placed_producer(0, "Plate", 10.0)];
        let mut supply = Supply::new(&[]);
        let plan = AllocationPlan {
            sink: NodeId(0),
            edges: vec![FlowEdge {
                source: node(7),
                sink: NodeId(0),
                item: "Plate".into(),
                amount: 1.0,
            }],
        };
        let err = commit_plan(&mut nodes, &mut supply, &plan, &config()).unwrap_err();
        assert!(matches!(err, SolveError::UnknownSource { .. }));
    }
}
