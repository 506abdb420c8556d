use std::collections::{BTreeMap, BTreeSet};

use lincomp_common::data::computation::Computation;
use lincomp_common::data::token::{ExprToken, Intent, Token};

// Tokens some node overwrites in place.
fn overwritten(comp: &Computation<ExprToken>) -> BTreeSet<Token> {
    comp.nodes()
        .flat_map(|node| {
            node.alias_map()
                .values()
                .filter_map(|&input| node.inputs.get(input))
                .map(|value| value.token.clone())
        })
        .collect()
}

/// How the caller of a finished plan interacts with each storage token.
///
/// A caller buffer is `InOut` when it is handed back or when any step overwrites it, even if the
/// overwritten contents are only read internally. Tokens holding only constants are never inputs.
/// A zero buffer that an accumulating kernel overwrites is therefore an output the caller must
/// allocate, and one nothing hands back is local.
pub fn intents(comp: &Computation<ExprToken>) -> BTreeMap<Token, Intent> {
    let inputs: BTreeSet<Token> = comp.inputs().into_iter().map(|v| v.token).collect();
    let outputs: BTreeSet<Token> = comp.outputs().into_iter().map(|v| v.token).collect();
    let overwritten = overwritten(comp);

    comp.variables()
        .into_iter()
        .map(|v| v.token)
        .map(|token| {
            let written = outputs.contains(&token) || overwritten.contains(&token);
            let intent = match (inputs.contains(&token), written) {
                (true, true) => Intent::InOut,
                (true, false) => Intent::In,
                (false, _) if outputs.contains(&token) => Intent::Out,
                (false, _) => Intent::Local,
            };
            (token, intent)
        })
        .collect()
}
