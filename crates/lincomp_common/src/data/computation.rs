use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use id_collections::{id_type, IdVec};
use id_graph_sccs::{find_components, SccKind, Sccs};
use im_rc::OrdSet;
use thiserror::Error;

use crate::data::descriptor::OpDescriptor;
use crate::data::expr::Expr;

/// A violated structural invariant of a descriptor or of a computation graph. Reaching one of
/// these indicates a bug in the catalog or in the compiler, never a property of user input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MalformedGraph {
    #[error("dependency cycle through {}", .nodes.join(", "))]
    Cycle { nodes: Vec<String> },
    #[error("operation '{op}' aliases output {output} to input {input}, which does not exist")]
    DanglingAlias {
        op: String,
        output: usize,
        input: usize,
    },
    #[error("operation '{op}' overwrites input {input} with more than one output")]
    SharedAliasTarget { op: String, input: usize },
    #[error("operation '{op}' has no outputs")]
    NoOutputs { op: String },
    #[error("pattern variable '{wild}' of operation '{op}' does not occur in any output")]
    UnboundWild { op: String, wild: String },
}

/// Something flowing along the edges of a computation: a bare expression before storage has
/// been assigned, an expression/token pair after.
pub trait Value: Clone + Ord + Hash + fmt::Debug + fmt::Display {
    fn expr(&self) -> &Expr;
}

impl Value for Expr {
    fn expr(&self) -> &Expr {
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    /// Stands for "these values are still required, unchanged". Seeds the backward search and
    /// pins requested outputs.
    Identity,
    Call(Rc<OpDescriptor>),
}

impl Op {
    pub fn name(&self) -> &str {
        match self {
            Op::Identity => "Identity",
            Op::Call(descriptor) => descriptor.name(),
        }
    }

    pub fn descriptor(&self) -> Option<&Rc<OpDescriptor>> {
        match self {
            Op::Identity => None,
            Op::Call(descriptor) => Some(descriptor),
        }
    }
}

static NO_ALIASES: BTreeMap<usize, usize> = BTreeMap::new();

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node<V> {
    pub op: Op,
    pub inputs: Vec<V>,
    pub outputs: Vec<V>,
}

impl<V: Value> Node<V> {
    pub fn identity(values: Vec<V>) -> Self {
        Node {
            op: Op::Identity,
            inputs: values.clone(),
            outputs: values,
        }
    }

    pub fn call(descriptor: Rc<OpDescriptor>, inputs: Vec<V>, outputs: Vec<V>) -> Self {
        Node {
            op: Op::Call(descriptor),
            inputs,
            outputs,
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self.op, Op::Identity)
    }

    pub fn alias_map(&self) -> &BTreeMap<usize, usize> {
        match &self.op {
            Op::Identity => &NO_ALIASES,
            Op::Call(descriptor) => descriptor.alias_map(),
        }
    }

    pub fn consumes(&self, value: &V) -> bool {
        self.inputs.contains(value)
    }

    pub fn produces(&self, value: &V) -> bool {
        !self.is_identity() && self.outputs.contains(value)
    }

    pub fn map_values<W: Value>(&self, mut f: impl FnMut(&V) -> W) -> Node<W> {
        Node {
            op: self.op.clone(),
            inputs: self.inputs.iter().map(&mut f).collect(),
            outputs: self.outputs.iter().map(&mut f).collect(),
        }
    }
}

fn write_values<V: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[V]) -> fmt::Result {
    write!(f, "[")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    write!(f, "]")
}

impl<V: fmt::Display> fmt::Display for Node<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_values(f, &self.inputs)?;
        write!(f, " -> {} -> ", self.op.name())?;
        write_values(f, &self.outputs)
    }
}

/// An unordered set of nodes whose dependency structure is derived from shared values.
///
/// Computations are persistent: every "mutating" operation returns a new computation sharing
/// structure with the old one, so sibling search branches never observe each other.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Computation<V: Value> {
    nodes: OrdSet<Node<V>>,
}

impl<V: Value> Default for Computation<V> {
    fn default() -> Self {
        Computation {
            nodes: OrdSet::new(),
        }
    }
}

// At most one identity node survives. A value it lists is dropped once a real node produces it
// and no real node consumes it, since `outputs()` then reports it anyway.
fn canonicalize<V: Value>(nodes: OrdSet<Node<V>>) -> OrdSet<Node<V>> {
    let identities: Vec<Node<V>> = nodes
        .iter()
        .filter(|node| node.is_identity())
        .cloned()
        .collect();
    if identities.is_empty() {
        return nodes;
    }

    let mut produced = BTreeSet::new();
    let mut consumed = BTreeSet::new();
    for node in nodes.iter().filter(|node| !node.is_identity()) {
        produced.extend(node.outputs.iter());
        consumed.extend(node.inputs.iter());
    }

    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();
    for value in identities.iter().flat_map(|node| &node.inputs) {
        if !seen.insert(value) {
            continue;
        }
        if produced.contains(value) && !consumed.contains(value) {
            continue;
        }
        kept.push(value.clone());
    }

    let mut result = nodes.clone();
    for identity in &identities {
        result.remove(identity);
    }
    if !kept.is_empty() {
        result.insert(Node::identity(kept));
    }
    result
}

impl<V: Value> Computation<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(values: impl IntoIterator<Item = V>) -> Self {
        Self::from_nodes([Node::identity(values.into_iter().collect())])
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node<V>>) -> Self {
        Computation {
            nodes: canonicalize(nodes.into_iter().collect()),
        }
    }

    pub fn add_node(&self, node: Node<V>) -> Self {
        Computation {
            nodes: canonicalize(self.nodes.update(node)),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Computation {
            nodes: canonicalize(self.nodes.clone().union(other.nodes.clone())),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<V>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The number of nodes that are not the identity.
    pub fn call_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_identity()).count()
    }

    pub fn identity_node(&self) -> Option<&Node<V>> {
        self.nodes.iter().find(|node| node.is_identity())
    }

    fn real_values(&self) -> (BTreeSet<&V>, BTreeSet<&V>) {
        let mut produced = BTreeSet::new();
        let mut consumed = BTreeSet::new();
        for node in self.nodes.iter().filter(|node| !node.is_identity()) {
            produced.extend(node.outputs.iter());
            consumed.extend(node.inputs.iter());
        }
        (produced, consumed)
    }

    /// Values that must be supplied from outside. Constants are always available and never
    /// appear here.
    pub fn inputs(&self) -> Vec<V> {
        let (produced, consumed) = self.real_values();
        let mut inputs: BTreeSet<&V> = consumed
            .difference(&produced)
            .copied()
            .filter(|value| !value.expr().is_constant())
            .collect();
        if let Some(identity) = self.identity_node() {
            inputs.extend(
                identity
                    .inputs
                    .iter()
                    .filter(|value| !produced.contains(value) && !value.expr().is_constant()),
            );
        }
        inputs.into_iter().cloned().collect()
    }

    pub fn outputs(&self) -> Vec<V> {
        let (produced, consumed) = self.real_values();
        let mut outputs: BTreeSet<&V> = produced.difference(&consumed).copied().collect();
        if let Some(identity) = self.identity_node() {
            outputs.extend(identity.outputs.iter());
        }
        outputs.into_iter().cloned().collect()
    }

    pub fn constants(&self) -> Vec<V> {
        self.variables()
            .into_iter()
            .filter(|value| value.expr().is_constant())
            .collect()
    }

    pub fn variables(&self) -> Vec<V> {
        let values: BTreeSet<&V> = self
            .nodes
            .iter()
            .flat_map(|node| node.inputs.iter().chain(&node.outputs))
            .collect();
        values.into_iter().cloned().collect()
    }

    pub fn producer_of(&self, value: &V) -> Option<&Node<V>> {
        self.nodes.iter().find(|node| node.produces(value))
    }

    /// Every node reading `value`, the identity included.
    pub fn consumers_of(&self, value: &V) -> Vec<&Node<V>> {
        self.nodes.iter().filter(|node| node.consumes(value)).collect()
    }

    pub fn dependencies_of(&self, node: &Node<V>) -> Vec<&Node<V>> {
        self.nodes
            .iter()
            .filter(|other| *other != node && node.inputs.iter().any(|v| other.produces(v)))
            .collect()
    }

    pub fn dependents_of(&self, node: &Node<V>) -> Vec<&Node<V>> {
        self.nodes
            .iter()
            .filter(|other| *other != node && other.inputs.iter().any(|v| node.produces(v)))
            .collect()
    }

    /// Orders the nodes so that every node follows the producers of its inputs. Ties are broken
    /// by the structural order of the nodes, so equal computations always sort identically.
    pub fn toposort(&self) -> Result<Vec<Node<V>>, MalformedGraph> {
        #[id_type]
        struct NodeId(usize);

        #[id_type]
        struct SccId(usize);

        let nodes: IdVec<NodeId, &Node<V>> = IdVec::from_vec(self.nodes.iter().collect());

        let mut producers: BTreeMap<&V, Vec<NodeId>> = BTreeMap::new();
        for (id, node) in &nodes {
            if node.is_identity() {
                continue;
            }
            for output in &node.outputs {
                producers.entry(output).or_default().push(id);
            }
        }

        let deps: IdVec<NodeId, BTreeSet<NodeId>> = nodes.map_refs(|_, node| {
            node.inputs
                .iter()
                .filter_map(|input| producers.get(input))
                .flatten()
                .copied()
                .collect()
        });

        let sccs: Sccs<SccId, NodeId> = find_components(nodes.count(), |id| &deps[id]);
        for (_, scc) in &sccs {
            match scc.kind {
                SccKind::Acyclic => {}
                SccKind::Cyclic => {
                    return Err(MalformedGraph::Cycle {
                        nodes: scc.nodes.iter().map(|id| nodes[*id].to_string()).collect(),
                    });
                }
            }
        }

        let mut dependents: IdVec<NodeId, Vec<NodeId>> =
            IdVec::from_count_with(nodes.count(), |_| Vec::new());
        for (id, node_deps) in &deps {
            for &dep in node_deps {
                dependents[dep].push(id);
            }
        }

        let mut remaining: IdVec<NodeId, usize> = deps.map_refs(|_, node_deps| node_deps.len());
        let mut ready: BTreeSet<NodeId> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| id)
            .collect();

        let mut order = Vec::with_capacity(nodes.len());
        while let Some(id) = ready.pop_first() {
            order.push(nodes[id].clone());
            for &dependent in &dependents[id] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        debug_assert_eq!(order.len(), nodes.len());
        Ok(order)
    }

    pub fn map_values<W: Value>(&self, mut f: impl FnMut(&V) -> W) -> Computation<W> {
        Computation::from_nodes(self.nodes.iter().map(|node| node.map_values(&mut f)))
    }
}

impl<V: Value> fmt::Display for Computation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = self
            .toposort()
            .unwrap_or_else(|_| self.nodes.iter().cloned().collect());
        write!(f, "[[")?;
        for (i, node) in order.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, "]]")
    }
}
