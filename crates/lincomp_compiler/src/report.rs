//! The machine-readable form of a plan, as handed to a code generator.

use lincomp_common::data::computation::Node;
use lincomp_common::data::token::{ExprToken, Intent, Token};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValueReport {
    pub expr: String,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub op: String,
    pub inputs: Vec<ValueReport>,
    pub outputs: Vec<ValueReport>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenReport {
    pub token: String,
    pub intent: &'static str,
    /// Every value the token holds over the course of the plan, in execution order.
    pub exprs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub steps: Vec<StepReport>,
    pub tokens: Vec<TokenReport>,
}

fn value_report(value: &ExprToken) -> ValueReport {
    ValueReport {
        expr: value.expr.to_string(),
        token: value.token.to_string(),
    }
}

impl PlanReport {
    /// `steps` must be in execution order. The identity node, if present, contributes no step.
    pub fn new(steps: &[Node<ExprToken>], intents: &BTreeMap<Token, Intent>) -> Self {
        let mut held: BTreeMap<&Token, Vec<String>> = BTreeMap::new();
        for step in steps {
            for value in step.inputs.iter().chain(&step.outputs) {
                let exprs = held.entry(&value.token).or_default();
                let rendered = value.expr.to_string();
                if !exprs.contains(&rendered) {
                    exprs.push(rendered);
                }
            }
        }

        PlanReport {
            steps: steps
                .iter()
                .filter(|step| !step.is_identity())
                .map(|step| StepReport {
                    op: step.op.name().to_owned(),
                    inputs: step.inputs.iter().map(value_report).collect(),
                    outputs: step.outputs.iter().map(value_report).collect(),
                })
                .collect(),
            tokens: intents
                .iter()
                .map(|(token, intent)| TokenReport {
                    token: token.to_string(),
                    intent: intent.as_str(),
                    exprs: held.remove(token).unwrap_or_default(),
                })
                .collect(),
        }
    }
}
