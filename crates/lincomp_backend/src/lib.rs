//! Turns a computation over pure values into one over named storage, letting in-place kernels
//! overwrite their inputs wherever nothing else still needs them.

mod elide_copies;
mod purify;
mod tokenize;
mod unify_tokens;

pub mod check_aliasing;
pub mod error;
pub mod intent;

use std::rc::Rc;

use crate::error::Error;
use lincomp_common::config::PassOptions;
use lincomp_common::data::computation::Computation;
use lincomp_common::data::descriptor::OpDescriptor;
use lincomp_common::data::expr::Expr;
use lincomp_common::data::token::ExprToken;
use lincomp_common::util::name_gen::TokenNamer;
use log::{debug, trace};

pub use elide_copies::elide_copies;
pub use purify::purify;
pub use tokenize::tokenize;
pub use unify_tokens::unify_tokens;

/// Runs the in-place pipeline: tokenize, purify, elide redundant copies, unify tokens.
///
/// `copy` is the operation inserted to protect the inputs of in-place kernels. Every token is
/// drawn from `namer`, so names stay unique across all the plans produced with it. Debug builds
/// replay the finished plan with [`check_aliasing::check_aliasing`] before returning it.
pub fn inplace_compile(
    comp: &Computation<Expr>,
    copy: &Rc<OpDescriptor>,
    namer: &mut TokenNamer,
    options: &PassOptions,
) -> Result<Computation<ExprToken>, Error> {
    let tokenized = tokenize(comp, namer)?;
    trace!("tokenized:\n{}", tokenized);

    let purified = purify(&tokenized, copy, namer)?;
    trace!("purified:\n{}", purified);

    let elided = if options.elide_copies {
        let elided = elide_copies(&purified, copy);
        debug!(
            "elided {} of {} copies",
            purified.len() - elided.len(),
            purified.len() - tokenized.len()
        );
        elided
    } else {
        purified
    };

    let unified = unify_tokens(&elided)?;
    if cfg!(debug_assertions) {
        check_aliasing::check_aliasing(&unified)?;
    }
    Ok(unified)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::check_aliasing::check_aliasing;
    use crate::intent::intents;
    use lincomp_common::config::SearchOptions;
    use lincomp_common::data::computation::Node;
    use lincomp_common::data::descriptor::Catalog;
    use lincomp_common::data::token::{Intent, Token};
    use lincomp_common::kernels::{blas, toy};
    use lincomp_frontend::oracle::Assumptions;
    use lincomp_frontend::rewrite::compile;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64Mcg;

    fn copy_op() -> Rc<OpDescriptor> {
        Rc::new(OpDescriptor::copy())
    }

    fn copies<'a>(
        plan: &'a Computation<ExprToken>,
        copy: &'a Rc<OpDescriptor>,
    ) -> Vec<&'a Node<ExprToken>> {
        plan.nodes()
            .filter(|node| node.op.descriptor() == Some(copy))
            .collect()
    }

    #[test]
    fn test_accumulate_into_zero_buffer() {
        let catalog = Catalog::new(blas::descriptors()).unwrap();
        let a = Expr::scalar("a");
        let (x, y) = (Expr::matrix("X"), Expr::matrix("Y"));
        let target = a.clone() * x.clone() * y.clone();

        let comp = compile(
            &[target.clone()],
            &[a, x, y],
            Assumptions::new(),
            &catalog,
            &SearchOptions::default(),
        )
        .next()
        .unwrap()
        .unwrap();

        let copy = copy_op();
        let mut namer = TokenNamer::new();
        let plan = inplace_compile(&comp, &copy, &mut namer, &PassOptions::default()).unwrap();

        assert!(copies(&plan, &copy).is_empty());
        let gemm = plan.nodes().find(|node| node.op.name() == "GEMM_0").unwrap();
        let buffer = &gemm.inputs[4];
        assert_eq!(buffer.expr, Expr::zero_matrix());
        assert_eq!(buffer.token, Token::new("zero"));
        assert_eq!(gemm.outputs[0].token, buffer.token);
        assert_eq!(gemm.outputs[0].expr, target);

        // The buffer is handed back to the caller and read by nothing downstream.
        assert_eq!(intents(&plan)[&buffer.token], Intent::Out);
        assert!(plan
            .nodes()
            .all(|node| node == gemm || node.inputs.iter().all(|v| v.token != buffer.token)));
    }

    // inc_inplace(x) feeds flipflop, which overwrites both of its operands; `y` is also doubled.
    fn shared_operand() -> Computation<Expr> {
        let (x, y) = (Expr::scalar("x"), Expr::scalar("y"));
        let (flip, flop) = (
            toy::flip(x.clone() + 1, y.clone()),
            toy::flop(x.clone() + 1, y.clone()),
        );
        Computation::identity([flip.clone(), flop.clone(), 2 * y.clone()])
            .add_node(Node::call(
                Rc::new(toy::inc_inplace()),
                vec![x.clone()],
                vec![x.clone() + 1],
            ))
            .add_node(Node::call(
                Rc::new(toy::flipflop()),
                vec![x.clone() + 1, y.clone()],
                vec![flip, flop],
            ))
            .add_node(Node::call(
                Rc::new(toy::dbl()),
                vec![y.clone()],
                vec![2 * y],
            ))
    }

    #[test]
    fn test_elide_unshared_copies() {
        let comp = shared_operand();
        let copy = copy_op();
        let mut namer = TokenNamer::new();

        let tokenized = tokenize(&comp, &mut namer).unwrap();
        let purified = purify(&tokenized, &copy, &mut namer).unwrap();
        assert_eq!(copies(&purified, &copy).len(), 3);
        check_aliasing(&unify_tokens(&purified).unwrap()).unwrap();

        let elided = elide_copies(&purified, &copy);
        let kept = copies(&elided, &copy);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].inputs[0].expr, Expr::scalar("y"));
        assert_eq!(elide_copies(&elided, &copy), elided);

        let plan = unify_tokens(&elided).unwrap();
        check_aliasing(&plan).unwrap();

        let intents = intents(&plan);
        assert_eq!(intents[&Token::new("x")], Intent::InOut);
        assert_eq!(intents[&Token::new("y")], Intent::In);
        let flop = plan
            .outputs()
            .into_iter()
            .find(|v| v.expr == toy::flop(Expr::scalar("x") + 1, Expr::scalar("y")))
            .unwrap();
        assert_eq!(flop.token, kept[0].outputs[0].token);
        assert_eq!(intents[&flop.token], Intent::Out);
    }

    #[test]
    fn test_without_elision() {
        let comp = shared_operand();
        let copy = copy_op();
        let mut namer = TokenNamer::new();
        let options = PassOptions {
            elide_copies: false,
        };

        let plan = inplace_compile(&comp, &copy, &mut namer, &options).unwrap();
        assert_eq!(copies(&plan, &copy).len(), 3);
        assert_eq!(intents(&plan)[&Token::new("x")], Intent::In);
    }

    #[test]
    fn test_overwritten_input_is_inout() {
        let x = Expr::scalar("x");
        // Only `2*(x+1)` is handed back, but `x` itself is incremented in place on the way.
        let comp = Computation::identity([2 * (x.clone() + 1)])
            .add_node(Node::call(
                Rc::new(toy::inc_inplace()),
                vec![x.clone()],
                vec![x.clone() + 1],
            ))
            .add_node(Node::call(
                Rc::new(toy::dbl()),
                vec![x.clone() + 1],
                vec![2 * (x.clone() + 1)],
            ));

        let copy = copy_op();
        let mut namer = TokenNamer::new();
        let plan = inplace_compile(&comp, &copy, &mut namer, &PassOptions::default()).unwrap();
        check_aliasing(&plan).unwrap();
        assert!(copies(&plan, &copy).is_empty());

        let dbl = plan.nodes().find(|node| node.op.name() == "dbl").unwrap();
        assert_eq!(dbl.inputs[0].token, Token::new("x"));
        assert!(plan.outputs().iter().all(|v| v.token != Token::new("x")));

        let intents = intents(&plan);
        assert_eq!(intents[&Token::new("x")], Intent::InOut);
        assert_eq!(intents[&dbl.outputs[0].token], Intent::Out);
    }

    #[test]
    fn test_requested_value_is_not_overwritten() {
        let x = Expr::scalar("x");
        // `x + 1` is both requested and incremented again in place.
        let comp = Computation::identity([x.clone() + 1, x.clone() + 2])
            .add_node(Node::call(
                Rc::new(toy::inc()),
                vec![x.clone()],
                vec![x.clone() + 1],
            ))
            .add_node(Node::call(
                Rc::new(toy::inc_inplace()),
                vec![x.clone() + 1],
                vec![x.clone() + 2],
            ));

        let copy = copy_op();
        let mut namer = TokenNamer::new();
        let plan = inplace_compile(&comp, &copy, &mut namer, &PassOptions::default()).unwrap();
        assert_eq!(copies(&plan, &copy).len(), 1);
        let outputs = plan.outputs();
        assert_eq!(outputs.len(), 2);
        assert_ne!(outputs[0].token, outputs[1].token);
    }

    fn random_expr(rng: &mut Pcg64Mcg, depth: u32) -> Expr {
        let symbols = ["a", "b", "c"];
        if depth == 0 || rng.random_bool(0.25) {
            return Expr::scalar(symbols[rng.random_range(0..symbols.len())]);
        }
        match rng.random_range(0..4) {
            0 => random_expr(rng, depth - 1) + 1,
            1 => 2 * random_expr(rng, depth - 1),
            2 => random_expr(rng, depth - 1) + random_expr(rng, depth - 1),
            _ => toy::min(random_expr(rng, depth - 1), random_expr(rng, depth - 1)),
        }
    }

    #[test]
    fn test_random_plans_are_alias_safe() {
        let catalog = Catalog::new([
            toy::inc_inplace(),
            toy::dbl(),
            toy::add(),
            toy::minmax_inplace(),
        ])
        .unwrap();
        let inputs = ["a", "b", "c"].map(Expr::scalar);
        let options = SearchOptions {
            node_limit: Some(8),
        };
        let copy = copy_op();
        let mut rng = Pcg64Mcg::seed_from_u64(7);

        let mut checked = 0;
        for _ in 0..40 {
            let targets = [random_expr(&mut rng, 3), random_expr(&mut rng, 2)];
            let candidates = compile(&targets, &inputs, Assumptions::new(), &catalog, &options);
            for comp in candidates.filter_map(Result::ok).take(3) {
                let mut namer = TokenNamer::new();
                let plan =
                    inplace_compile(&comp, &copy, &mut namer, &PassOptions::default()).unwrap();
                check_aliasing(&plan).unwrap();

                let produced: Vec<Expr> = plan.outputs().into_iter().map(|v| v.expr).collect();
                for target in &targets {
                    assert!(produced.contains(target) || inputs.contains(target));
                }

                let mut namer = TokenNamer::new();
                let purified = purify(&tokenize(&comp, &mut namer).unwrap(), &copy, &mut namer)
                    .unwrap();
                let elided = elide_copies(&purified, &copy);
                assert_eq!(elide_copies(&elided, &copy), elided);
                checked += 1;
            }
        }
        assert!(checked > 0);
    }
}
