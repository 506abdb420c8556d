use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use lincomp_common::data::computation::{Computation, Node};
use lincomp_common::data::descriptor::OpDescriptor;
use lincomp_common::data::token::{ExprToken, Token};

fn is_copy(node: &Node<ExprToken>, copy: &Rc<OpDescriptor>) -> bool {
    node.op.descriptor() == Some(copy)
}

// Whether `node` overwrites `value` in place.
fn overwrites(node: &Node<ExprToken>, value: &ExprToken) -> bool {
    node.alias_map()
        .values()
        .any(|&input| node.inputs.get(input) == Some(value))
}

/// Removes the copies that protect nothing.
///
/// A copy `src -> dst` made for an in-place operation `M` is redundant when `dst` is read by `M`
/// alone and `src` is read by the copy alone: nobody else ever needs the value `M` destroys, so
/// `M` may overwrite `src` directly. The identity node counts as a reader, so requested outputs
/// are never handed to a mutator.
pub fn elide_copies(
    comp: &Computation<ExprToken>,
    copy: &Rc<OpDescriptor>,
) -> Computation<ExprToken> {
    let mut consumers: BTreeMap<&Token, Vec<&Node<ExprToken>>> = BTreeMap::new();
    for node in comp.nodes() {
        // A node reading the same token twice still counts once.
        let read: BTreeSet<&Token> = node.inputs.iter().map(|v| &v.token).collect();
        for token in read {
            consumers.entry(token).or_default().push(node);
        }
    }
    let readers = |token: &Token| consumers.get(token).map(Vec::as_slice).unwrap_or(&[]);

    let mut elided = BTreeSet::new();
    let mut renames: BTreeMap<Token, ExprToken> = BTreeMap::new();
    for node in comp.nodes().filter(|node| is_copy(node, copy)) {
        let (Some(src), Some(dst)) = (node.inputs.first(), node.outputs.first()) else {
            continue;
        };
        let protects_only_mutator = match readers(&dst.token) {
            [mutator] => !mutator.is_identity() && overwrites(mutator, dst),
            _ => false,
        };
        let src_otherwise_dead = matches!(readers(&src.token), [only] if *only == node);
        if protects_only_mutator && src_otherwise_dead {
            elided.insert(node.clone());
            renames.insert(dst.token.clone(), src.clone());
        }
    }

    Computation::from_nodes(
        comp.nodes()
            .filter(|node| !elided.contains(*node))
            .map(|node| Node {
                op: node.op.clone(),
                inputs: node
                    .inputs
                    .iter()
                    .map(|v| renames.get(&v.token).cloned().unwrap_or_else(|| v.clone()))
                    .collect(),
                outputs: node.outputs.clone(),
            }),
    )
}
