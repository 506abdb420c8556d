use std::collections::BTreeMap;

use crate::error::Error;
use lincomp_common::data::computation::Computation;
use lincomp_common::data::expr::Expr;
use lincomp_common::data::token::{ExprToken, Token};

fn read(
    held: &mut BTreeMap<Token, Expr>,
    reader: &str,
    value: &ExprToken,
) -> Result<(), Error> {
    match held.get(&value.token) {
        Some(found) if *found != value.expr => Err(Error::AliasConflict {
            token: value.token.clone(),
            reader: reader.to_owned(),
            expected: value.expr.clone(),
            found: found.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            held.insert(value.token.clone(), value.expr.clone());
            Ok(())
        }
    }
}

/// Replays a plan in execution order, tracking what each token holds, and fails if any node
/// (or the caller, at the end) reads a token whose contents have already been replaced.
pub fn check_aliasing(comp: &Computation<ExprToken>) -> Result<(), Error> {
    let mut held = BTreeMap::new();
    let order = comp.toposort()?;

    for node in order.iter().filter(|node| !node.is_identity()) {
        for input in &node.inputs {
            read(&mut held, node.op.name(), input)?;
        }
        for output in &node.outputs {
            held.insert(output.token.clone(), output.expr.clone());
        }
    }

    for output in comp.outputs() {
        read(&mut held, "<result>", &output)?;
    }
    Ok(())
}
