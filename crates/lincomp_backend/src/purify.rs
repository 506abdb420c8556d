use std::rc::Rc;

use crate::tokenize::check_alias_map;
use lincomp_common::data::computation::{Computation, MalformedGraph, Node};
use lincomp_common::data::descriptor::OpDescriptor;
use lincomp_common::data::token::ExprToken;
use lincomp_common::util::name_gen::TokenNamer;

/// Makes every in-place operation work on a private copy of each input it overwrites.
pub fn purify(
    comp: &Computation<ExprToken>,
    copy: &Rc<OpDescriptor>,
    namer: &mut TokenNamer,
) -> Result<Computation<ExprToken>, MalformedGraph> {
    let mut nodes = Vec::new();
    for node in comp.toposort()? {
        if node.alias_map().is_empty() {
            nodes.push(node);
            continue;
        }
        check_alias_map(&node)?;

        let mut inputs = node.inputs.clone();
        for &input in node.alias_map().values() {
            let src = node.inputs[input].clone();
            let dst = src.with_token(namer.fresh(&src.expr.name_hint()));
            nodes.push(Node::call(copy.clone(), vec![src], vec![dst.clone()]));
            inputs[input] = dst;
        }
        nodes.push(Node {
            op: node.op.clone(),
            inputs,
            outputs: node.outputs.clone(),
        });
    }
    Ok(Computation::from_nodes(nodes))
}
