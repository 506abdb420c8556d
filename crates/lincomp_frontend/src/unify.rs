use lincomp_common::data::expr::{Binding, Expr, ExprKind, Kind};

/// Every way of binding the pattern variables of `pattern` (consistently with `binding`) so that
/// it becomes `target`.
///
/// Matching is syntactic except at sums and products. Sum terms and scalar factors are matched up
/// to reordering, and the last free wild in either position absorbs whatever terms or factors the
/// others leave over. Matrix factors keep their order but a matrix wild stands for any non-empty
/// contiguous run of them. A product pattern with one scalar wild matches a target that has no
/// scalar factor at all, binding the wild to `1`.
///
/// Results are deduplicated and appear in a deterministic order.
pub fn unify(pattern: &Expr, target: &Expr, binding: &Binding) -> Vec<Binding> {
    let mut results = Vec::new();
    unify_into(pattern, target, binding, &mut results);
    results
}

fn push_result(results: &mut Vec<Binding>, binding: Binding) {
    if !results.contains(&binding) {
        results.push(binding);
    }
}

fn unify_into(pattern: &Expr, target: &Expr, binding: &Binding, results: &mut Vec<Binding>) {
    match (pattern.data(), target.data()) {
        (ExprKind::Wild(name, kind), _) => {
            if let Some(bound) = bind_wild(name, *kind, target, binding) {
                push_result(results, bound);
            }
        }

        (ExprKind::Add(pat_terms), _) => {
            let target_terms = match target.data() {
                ExprKind::Add(terms) => terms.as_slice(),
                _ => std::slice::from_ref(target),
            };
            // Bare wilds go last so that the final one can absorb the leftover terms.
            let mut ordered: Vec<&Expr> = pat_terms.iter().filter(|t| !t.is_wild()).collect();
            ordered.extend(pat_terms.iter().filter(|t| t.is_wild()));
            let remaining: Vec<&Expr> = target_terms.iter().collect();
            match_terms(&ordered, &remaining, target.kind(), binding, results);
        }

        (ExprKind::Mul(pat_factors), _) => {
            let target_factors = match target.data() {
                ExprKind::Mul(factors) => factors.as_slice(),
                _ => std::slice::from_ref(target),
            };
            let (pat_scalars, pat_matrices) = split_factors(pat_factors);
            let (target_scalars, target_matrices) = split_factors(target_factors);

            let mut scalar_bindings = Vec::new();
            if target_scalars.is_empty() {
                match pat_scalars.as_slice() {
                    [] => scalar_bindings.push(binding.clone()),
                    [only] if only.is_wild() => {
                        unify_into(only, &Expr::num(1), binding, &mut scalar_bindings)
                    }
                    _ => {}
                }
            } else {
                match_scalars(&pat_scalars, &target_scalars, binding, &mut scalar_bindings);
            }

            for partial in &scalar_bindings {
                match_matrices(&pat_matrices, &target_matrices, partial, results);
            }
        }

        (ExprKind::Inverse(pat_arg), ExprKind::Inverse(target_arg))
        | (ExprKind::Transpose(pat_arg), ExprKind::Transpose(target_arg)) => {
            unify_into(pat_arg, target_arg, binding, results);
        }

        (
            ExprKind::Func(pat_name, pat_kind, pat_args),
            ExprKind::Func(target_name, target_kind, target_args),
        ) => {
            if pat_name == target_name
                && pat_kind == target_kind
                && pat_args.len() == target_args.len()
            {
                match_args(pat_args, target_args, binding, results);
            }
        }

        _ => {
            if pattern == target {
                push_result(results, binding.clone());
            }
        }
    }
}

fn bind_wild(name: &str, kind: Kind, target: &Expr, binding: &Binding) -> Option<Binding> {
    if target.kind() != kind || target.has_wilds() {
        return None;
    }
    match binding.get(name) {
        Some(bound) if bound == target => Some(binding.clone()),
        Some(_) => None,
        None => Some(binding.update(name.into(), target.clone())),
    }
}

fn split_factors(factors: &[Expr]) -> (Vec<&Expr>, Vec<&Expr>) {
    factors
        .iter()
        .partition(|factor| factor.kind() == Kind::Scalar)
}

fn without(items: &[&Expr], idx: usize) -> Vec<Expr> {
    items
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != idx)
        .map(|(_, item)| (*item).clone())
        .collect()
}

// Commutative matching shared by sum terms and scalar factors. `combine` rebuilds the leftover
// operands for an absorbing wild.
fn match_unordered(
    patterns: &[&Expr],
    targets: &[&Expr],
    combine: &dyn Fn(Vec<Expr>) -> Expr,
    binding: &Binding,
    results: &mut Vec<Binding>,
) {
    let Some((first, rest)) = patterns.split_first() else {
        if targets.is_empty() {
            push_result(results, binding.clone());
        }
        return;
    };

    if rest.is_empty() && first.is_wild() {
        if !targets.is_empty() {
            let leftover = combine(targets.iter().map(|t| (*t).clone()).collect());
            unify_into(first, &leftover, binding, results);
        }
        return;
    }

    // Every remaining pattern needs at least one operand of its own.
    if targets.len() < patterns.len() {
        return;
    }

    for idx in 0..targets.len() {
        let mut partials = Vec::new();
        unify_into(first, targets[idx], binding, &mut partials);
        if partials.is_empty() {
            continue;
        }
        let others = without(targets, idx);
        let others: Vec<&Expr> = others.iter().collect();
        for partial in &partials {
            match_unordered(rest, &others, combine, partial, results);
        }
    }
}

fn match_terms(
    patterns: &[&Expr],
    targets: &[&Expr],
    kind: Kind,
    binding: &Binding,
    results: &mut Vec<Binding>,
) {
    let combine = move |terms: Vec<Expr>| {
        if terms.is_empty() {
            Expr::zero(kind)
        } else {
            Expr::sum(terms)
        }
    };
    match_unordered(patterns, targets, &combine, binding, results);
}

fn match_scalars(
    patterns: &[&Expr],
    targets: &[&Expr],
    binding: &Binding,
    results: &mut Vec<Binding>,
) {
    // Free wilds go last, after literal coefficients and structured factors.
    let mut ordered: Vec<&Expr> = patterns.iter().copied().filter(|p| !p.is_wild()).collect();
    ordered.extend(patterns.iter().copied().filter(|p| p.is_wild()));
    let combine = |factors: Vec<Expr>| Expr::product(factors);
    match_unordered(&ordered, targets, &combine, binding, results);
}

fn match_matrices(
    patterns: &[&Expr],
    targets: &[&Expr],
    binding: &Binding,
    results: &mut Vec<Binding>,
) {
    let Some((first, rest)) = patterns.split_first() else {
        if targets.is_empty() {
            push_result(results, binding.clone());
        }
        return;
    };
    if targets.len() < patterns.len() {
        return;
    }

    let max_run = if first.is_wild() {
        targets.len() - rest.len()
    } else {
        1
    };
    for run in 1..=max_run {
        let segment = Expr::product(targets[..run].iter().map(|t| (*t).clone()));
        let mut partials = Vec::new();
        unify_into(first, &segment, binding, &mut partials);
        for partial in &partials {
            match_matrices(rest, &targets[run..], partial, results);
        }
    }
}

fn match_args(patterns: &[Expr], targets: &[Expr], binding: &Binding, results: &mut Vec<Binding>) {
    let (Some((first, rest)), Some((target, target_rest))) =
        (patterns.split_first(), targets.split_first())
    else {
        push_result(results, binding.clone());
        return;
    };
    let mut partials = Vec::new();
    unify_into(first, target, binding, &mut partials);
    for partial in &partials {
        match_args(rest, target_rest, partial, results);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn wild_s(name: &str) -> Expr {
        Expr::wild(name, Kind::Scalar)
    }

    fn wild_m(name: &str) -> Expr {
        Expr::wild(name, Kind::Matrix)
    }

    fn instances(pattern: &Expr, target: &Expr) -> Vec<Expr> {
        unify(pattern, target, &Binding::new())
            .iter()
            .map(|binding| pattern.subst(binding))
            .collect()
    }

    #[test]
    fn test_wild_kinds() {
        let x = Expr::matrix("X");
        assert!(unify(&wild_s("a"), &x, &Binding::new()).is_empty());
        let found = unify(&wild_m("A"), &x, &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("A"), Some(&x));
    }

    #[test]
    fn test_gemm_pattern() {
        let pattern = wild_s("alpha") * wild_m("A") * wild_m("B") + wild_s("beta") * wild_m("C");
        let (a, b) = (Expr::scalar("a"), Expr::scalar("b"));
        let (x, y, z) = (Expr::matrix("X"), Expr::matrix("Y"), Expr::matrix("Z"));

        let target = a.clone() * x.clone() * y.clone() + b.clone() * z.clone();
        let found = unify(&pattern, &target, &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("alpha"), Some(&a));
        assert_eq!(found[0].get("A"), Some(&x));
        assert_eq!(found[0].get("B"), Some(&y));
        assert_eq!(found[0].get("beta"), Some(&b));
        assert_eq!(found[0].get("C"), Some(&z));

        // Missing coefficients bind to one.
        let target = x.clone() * y.clone() + z.clone();
        let found = unify(&pattern, &target, &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("alpha"), Some(&Expr::num(1)));
        assert_eq!(found[0].get("beta"), Some(&Expr::num(1)));

        for instance in instances(&pattern, &target) {
            assert_eq!(instance, target);
        }
    }

    #[test]
    fn test_associative_runs() {
        let pattern = wild_m("A") * wild_m("B");
        let (x, y, z) = (Expr::matrix("X"), Expr::matrix("Y"), Expr::matrix("Z"));
        let target = x.clone() * y.clone() * z.clone();

        let found = unify(&pattern, &target, &Binding::new());
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].get("A"), Some(&x));
        assert_eq!(found[0].get("B"), Some(&(y.clone() * z.clone())));
        assert_eq!(found[1].get("A"), Some(&(x.clone() * y.clone())));
        assert_eq!(found[1].get("B"), Some(&z));
    }

    #[test]
    fn test_repeated_wild() {
        let pattern = wild_s("alpha") * wild_m("A") * wild_m("A").t();
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");

        let found = unify(&pattern, &(x.clone() * x.t()), &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("A"), Some(&x));

        assert!(unify(&pattern, &(x.clone() * y.t()), &Binding::new()).is_empty());
    }

    #[test]
    fn test_commutative_sum() {
        let pattern = wild_s("alpha") * wild_m("X") + wild_m("Y");
        let (a, b, c) = (Expr::matrix("A"), Expr::matrix("B"), Expr::matrix("C"));
        let target = a.clone() + b.clone() + c.clone();

        let found = instances(&pattern, &target);
        assert!(!found.is_empty());
        assert!(found.iter().all(|instance| *instance == target));

        let xs: Vec<_> = unify(&pattern, &target, &Binding::new())
            .iter()
            .filter_map(|binding| binding.get("X").cloned())
            .collect();
        assert!(xs.contains(&a));
        assert!(xs.contains(&b));
        assert!(xs.contains(&c));
    }

    #[test]
    fn test_literal_coefficient() {
        let pattern = 2 * wild_s("x");
        let (a, b) = (Expr::scalar("a"), Expr::scalar("b"));

        let found = unify(&pattern, &(2 * a.clone()), &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("x"), Some(&a));

        assert!(unify(&pattern, &a, &Binding::new()).is_empty());
        assert!(unify(&pattern, &(3 * a.clone()), &Binding::new()).is_empty());

        let found = unify(&pattern, &(2 * a.clone() * b.clone()), &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("x"), Some(&(a * b)));
    }

    #[test]
    fn test_structural() {
        let a = wild_m("A");
        let b = wild_m("B");
        let pattern = a.inv() * b.clone();
        let (x, y) = (Expr::matrix("X"), Expr::matrix("Y"));

        let found = unify(&pattern, &(x.inv() * y.clone()), &Binding::new());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("A"), Some(&x));

        assert!(unify(&pattern, &(x.t() * y.clone()), &Binding::new()).is_empty());
        assert!(unify(&pattern, &x.inv(), &Binding::new()).is_empty());

        let lu = |e: Expr| Expr::func("LU", Kind::Matrix, vec![e]);
        let found = unify(&lu(a.clone()), &lu(x.clone()), &Binding::new());
        assert_eq!(found.len(), 1);
        assert!(unify(&lu(a), &Expr::func("CHOL", Kind::Matrix, vec![x]), &Binding::new())
            .is_empty());
    }

    #[test]
    fn test_respects_binding() {
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");
        let bound = Binding::new().update("A".into(), x.clone());
        assert_eq!(unify(&wild_m("A"), &x, &bound), vec![bound.clone()]);
        assert!(unify(&wild_m("A"), &y, &bound).is_empty());
    }
}
