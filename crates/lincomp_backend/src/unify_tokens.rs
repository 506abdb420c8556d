use std::collections::BTreeMap;

use crate::tokenize::check_alias_map;
use lincomp_common::data::computation::{Computation, MalformedGraph};
use lincomp_common::data::token::{ExprToken, Token};

/// Makes every in-place output share the token of the input it overwrites.
///
/// Nodes are visited in execution order and each rename is applied to every later node, so
/// chains of in-place operations collapse onto the first buffer of the chain.
pub fn unify_tokens(
    comp: &Computation<ExprToken>,
) -> Result<Computation<ExprToken>, MalformedGraph> {
    let mut renames: BTreeMap<Token, Token> = BTreeMap::new();
    let rename = |renames: &BTreeMap<Token, Token>, value: &ExprToken| {
        match renames.get(&value.token) {
            Some(token) => value.with_token(token.clone()),
            None => value.clone(),
        }
    };

    let mut nodes = Vec::new();
    for node in comp.toposort()? {
        check_alias_map(&node)?;
        let mut node = node.map_values(|v| rename(&renames, v));
        let aliases = node.alias_map().clone();
        for (output, input) in aliases {
            let buffer = node.inputs[input].token.clone();
            let produced = &mut node.outputs[output];
            if produced.token != buffer {
                renames.insert(produced.token.clone(), buffer.clone());
                produced.token = buffer;
            }
        }
        nodes.push(node);
    }
    Ok(Computation::from_nodes(nodes))
}
