//! Data models for recipe instances, planner nodes and material flows

use std::fmt;

pub type ItemId = String;

/// One recipe type running at a continuous scale factor
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeInstance {
    pub recipe: String,
    pub count: f64,
}

impl RecipeInstance {
    pub fn new(recipe: impl Into<String>, count: f64) -> Self {
        Self {
            recipe: recipe.into(),
            count,
        }
    }
}

impl fmt::Display for RecipeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}x {}", self.count, self.recipe)
    }
}

/// An item paired with an amount. Catalog lists are per instance; flows are totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAmount {
    pub item: ItemId,
    pub amount: f64,
}

impl ItemAmount {
    pub fn new(item: impl Into<ItemId>, amount: f64) -> Self {
        Self {
            item: item.into(),
            amount,
        }
    }
}

/// Index of a node in the solver's node set (input order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a flow edge draws from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceId {
    /// Another (or the same, for catalysts) recipe node
    Node(NodeId),
    /// Unlimited draw of a natural resource
    Natural(ItemId),
    /// Caller-supplied bootstrap inputs
    External,
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Node(id) => write!(f, "{}", id),
            SourceId::Natural(item) => write!(f, "{} (natural)", item),
            SourceId::External => write!(f, "external"),
        }
    }
}

/// Directed, quantified movement of one item into a consuming node
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEdge {
    pub source: SourceId,
    pub sink: NodeId,
    pub item: ItemId,
    pub amount: f64,
}

impl FlowEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source == SourceId::Node(self.sink)
    }
}

/// Mutable per-instance working record
#[derive(Debug, Clone)]
pub struct RecipeNode {
    pub id: NodeId,
    pub instance: RecipeInstance,
    /// Per-instance ingredients, net of catalyst self-consumption
    pub ingredients: Vec<ItemAmount>,
    /// Per-instance products, net of catalyst self-consumption
    pub products: Vec<ItemAmount>,
    /// Remaining unconsumed yield, parallel to `products`. Empty until placed.
    pub available_products: Vec<f64>,
    pub tier: Option<usize>,
    pub inbound_edges: Vec<FlowEdge>,
    pub outbound_edges: Vec<FlowEdge>,
    pub fully_consumed: bool,
    /// Catalyst recirculation, recorded as edges once the node is placed
    pub(crate) self_loops: Vec<FlowEdge>,
}

impl RecipeNode {
    pub fn new(id: NodeId, instance: RecipeInstance) -> Self {
        Self {
            id,
            instance,
            ingredients: Vec::new(),
            products: Vec::new(),
            available_products: Vec::new(),
            tier: None,
            inbound_edges: Vec::new(),
            outbound_edges: Vec::new(),
            fully_consumed: false,
            self_loops: Vec::new(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.tier.is_some()
    }

    pub fn count(&self) -> f64 {
        self.instance.count
    }

    /// Total need for each net ingredient (per-instance amount times count)
    pub fn scaled_ingredients(&self) -> Vec<ItemAmount> {
        self.ingredients
            .iter()
            .map(|i| ItemAmount::new(i.item.clone(), i.amount * self.count()))
            .collect()
    }

    pub fn produces(&self, item: &str) -> bool {
        self.products.iter().any(|p| p.item == item)
    }

    /// Remaining yield of `item` summed across product lines
    pub fn available(&self, item: &str) -> f64 {
        self.products
            .iter()
            .zip(&self.available_products)
            .filter(|(p, _)| p.item == item)
            .map(|(_, amount)| *amount)
            .sum()
    }

    /// Catalyst self-loops computed during preprocessing
    pub fn catalyst_loops(&self) -> &[FlowEdge] {
        &self.self_loops
    }
}

/// Set of pending nodes whose dependencies mutually block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularGroup {
    pub members: Vec<NodeId>,
}

impl CircularGroup {
    /// Drop placed members; returns false once the group is too small to matter
    pub fn retain_pending(&mut self, is_pending: impl Fn(NodeId) -> bool) -> bool {
        self.members.retain(|id| is_pending(*id));
        self.members.len() > 1
    }
}

/// Pending instance reported when a tier stalls
#[derive(Debug, Clone, PartialEq)]
pub struct PendingInstance {
    pub node: NodeId,
    pub instance: RecipeInstance,
    pub unmet: Vec<ItemAmount>,
}

impl fmt::Display for PendingInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} needs", self.node, self.instance)?;
        for (i, need) in self.unmet.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{:.3} {}", sep, need.amount, need.item)?;
        }
        Ok(())
    }
}

/// A catalog recipe as stored or imported
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDefinition {
    pub id: String,
    pub name: String,
    pub building: Option<String>,
    pub ingredients: Vec<ItemAmount>,
    pub products: Vec<ItemAmount>,
}

impl RecipeDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            building: None,
            ingredients: Vec::new(),
            products: Vec::new(),
        }
    }

    pub fn with_input(mut self, item: &str, amount: f64) -> Self {
        self.ingredients.push(ItemAmount::new(item, amount));
        self
    }

    pub fn with_output(mut self, item: &str, amount: f64) -> Self {
        self.products.push(ItemAmount::new(item, amount));
        self
    }
}
