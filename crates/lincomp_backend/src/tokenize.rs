use lincomp_common::data::computation::{Computation, MalformedGraph, Node, Value};
use lincomp_common::data::expr::Expr;
use lincomp_common::data::token::ExprToken;
use lincomp_common::util::name_gen::TokenNamer;

pub fn check_alias_map<V: Value>(node: &Node<V>) -> Result<(), MalformedGraph> {
    for (&output, &input) in node.alias_map() {
        if output >= node.outputs.len() || input >= node.inputs.len() {
            return Err(MalformedGraph::DanglingAlias {
                op: node.op.name().to_owned(),
                output,
                input,
            });
        }
    }
    Ok(())
}

/// Gives every distinct expression in `comp` its own storage token.
///
/// Names are handed out in execution order, inputs before outputs, so that the readable names
/// (those of the symbols themselves) go to the values the caller supplies.
pub fn tokenize(
    comp: &Computation<Expr>,
    namer: &mut TokenNamer,
) -> Result<Computation<ExprToken>, MalformedGraph> {
    let order = comp.toposort()?;
    let mut nodes = Vec::with_capacity(order.len());
    for node in &order {
        check_alias_map(node)?;
        nodes.push(node.map_values(|expr| ExprToken::new(expr.clone(), namer.name_of(expr))));
    }
    Ok(Computation::from_nodes(nodes))
}
