use log::{debug, trace, warn};
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use std::rc::Rc;
use thiserror::Error;

use crate::oracle::{Oracle, OracleError};
use crate::signature::Signature;
use crate::unify::unify;
use lincomp_common::config::SearchOptions;
use lincomp_common::data::computation::{Computation, Node};
use lincomp_common::data::descriptor::{Catalog, OpDescriptor};
use lincomp_common::data::expr::{Binding, Expr};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("could not decide the condition of '{op}': {source}")]
    Oracle { op: String, source: OracleError },
}

/// The lazily enumerated compilations of one problem.
///
/// Each item is either a complete computation, whose outputs include every requested output and
/// whose inputs are all allowed, or an oracle failure that cut off one branch of the search.
/// Enumeration is depth first and deterministic: the same problem, catalog and oracle always
/// produce the same items in the same order. Dropping the iterator abandons the search.
pub struct Compilations<'a, O> {
    allowed: BTreeSet<Expr>,
    oracle: O,
    catalog: &'a Catalog,
    // Indexed like `catalog`, then by output position.
    signatures: Vec<Vec<Signature>>,
    options: SearchOptions,
    stack: Vec<Computation<Expr>>,
    seen: FxHashSet<Computation<Expr>>,
    errors: VecDeque<SearchError>,
}

pub fn compile<'a, O: Oracle>(
    outputs: &[Expr],
    inputs: &[Expr],
    oracle: O,
    catalog: &'a Catalog,
    options: &SearchOptions,
) -> Compilations<'a, O> {
    let signatures = catalog
        .iter()
        .map(|op| op.outputs().iter().map(Signature::of_pattern).collect())
        .collect();

    let seed = Computation::identity(outputs.iter().cloned());
    let mut seen = FxHashSet::default();
    seen.insert(seed.clone());

    Compilations {
        allowed: inputs.iter().cloned().collect(),
        oracle,
        catalog,
        signatures,
        options: *options,
        stack: vec![seed],
        seen,
        errors: VecDeque::new(),
    }
}

struct Expansion {
    successors: Vec<Computation<Expr>>,
    errors: Vec<SearchError>,
}

impl<'a, O: Oracle> Compilations<'a, O> {
    fn open_inputs(&self, comp: &Computation<Expr>) -> Vec<Expr> {
        comp.inputs()
            .into_iter()
            .filter(|input| !self.allowed.contains(input))
            .collect()
    }

    fn expand(&self, comp: &Computation<Expr>, open: &[Expr]) -> Expansion {
        let mut expansion = Expansion {
            successors: Vec::new(),
            errors: Vec::new(),
        };

        // Every open input has to be produced eventually, so branching on the least one alone
        // loses no compilations.
        let target = &open[0];
        let target_sig = Signature::of_target(target);

        for (op, sigs) in self.catalog.iter().zip(&self.signatures) {
            for (pattern, sig) in op.outputs().iter().zip(sigs) {
                if !target_sig.may_contain(sig) {
                    continue;
                }
                for binding in unify(pattern, target, &Binding::new()) {
                    for full in complete_binding(op, pattern, binding, target, open) {
                        self.apply(comp, op, &full, target, &mut expansion);
                    }
                }
            }
        }

        expansion
    }

    fn apply(
        &self,
        comp: &Computation<Expr>,
        op: &Rc<OpDescriptor>,
        binding: &Binding,
        target: &Expr,
        expansion: &mut Expansion,
    ) {
        let condition = op.condition().subst(binding);
        if !condition.is_true() {
            match self.oracle.ask(&condition) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("{} rejected for {}: {} does not hold", op.name(), target, condition);
                    return;
                }
                Err(err) => {
                    warn!("abandoning {} for {}: {}", op.name(), target, err);
                    expansion.errors.push(SearchError::Oracle {
                        op: op.name().to_owned(),
                        source: err,
                    });
                    return;
                }
            }
        }

        let inputs: Vec<Expr> = op.inputs().iter().map(|e| e.subst(binding)).collect();
        let outputs: Vec<Expr> = op.outputs().iter().map(|e| e.subst(binding)).collect();

        if !outputs.contains(target) {
            debug!("{} does not reproduce {} once instantiated", op.name(), target);
            return;
        }
        if inputs.iter().any(|input| outputs.contains(input)) {
            debug!("{} would consume its own output computing {}", op.name(), target);
            return;
        }

        let next = comp.add_node(Node::call(op.clone(), inputs, outputs));
        if let Some(limit) = self.options.node_limit {
            if next.call_count() > limit {
                debug!("{} exceeds the node limit of {}", op.name(), limit);
                return;
            }
        }
        if let Err(err) = next.toposort() {
            debug!("{} rejected for {}: {}", op.name(), target, err);
            return;
        }

        expansion.successors.push(next);
    }
}

fn is_complete(op: &OpDescriptor, binding: &Binding) -> bool {
    op.wilds().keys().all(|wild| binding.contains_key(wild))
}

// A descriptor whose wilds are not all bound by the output that matched `target` can still be
// applied if its other outputs jointly match other open inputs.
fn complete_binding(
    op: &OpDescriptor,
    matched: &Expr,
    binding: Binding,
    target: &Expr,
    open: &[Expr],
) -> Vec<Binding> {
    if is_complete(op, &binding) {
        return vec![binding];
    }

    let others: Vec<&Expr> = op
        .outputs()
        .iter()
        .filter(|pattern| *pattern != matched)
        .collect();
    let candidates: Vec<&Expr> = open.iter().filter(|input| *input != target).collect();

    let mut results = Vec::new();
    extend_jointly(op, &others, &candidates, binding, &mut results);
    if results.is_empty() {
        debug!("{} leaves pattern variables unbound for {}", op.name(), target);
    }
    results
}

fn extend_jointly(
    op: &OpDescriptor,
    patterns: &[&Expr],
    candidates: &[&Expr],
    binding: Binding,
    results: &mut Vec<Binding>,
) {
    if is_complete(op, &binding) {
        if !results.contains(&binding) {
            results.push(binding);
        }
        return;
    }
    let Some((pattern, rest)) = patterns.split_first() else {
        return;
    };

    for (idx, candidate) in candidates.iter().enumerate() {
        let remaining: Vec<&Expr> = candidates
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, c)| *c)
            .collect();
        for extended in unify(pattern, candidate, &binding) {
            extend_jointly(op, rest, &remaining, extended, results);
        }
    }
    extend_jointly(op, rest, candidates, binding, results);
}

impl<'a, O: Oracle> Iterator for Compilations<'a, O> {
    type Item = Result<Computation<Expr>, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(err) = self.errors.pop_front() {
                return Some(Err(err));
            }

            let comp = self.stack.pop()?;
            let open = self.open_inputs(&comp);
            if open.is_empty() {
                trace!("found compilation {}", comp);
                return Some(Ok(comp));
            }

            let expansion = self.expand(&comp, &open);
            self.errors.extend(expansion.errors);
            // Reversed so that the first successor is explored first.
            for successor in expansion.successors.into_iter().rev() {
                if self.seen.insert(successor.clone()) {
                    self.stack.push(successor);
                }
            }
        }
    }
}
