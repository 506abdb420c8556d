//! Level 1 and 3 BLAS kernels. Every entry accumulates into one of its inputs.

use crate::data::condition::{Condition, Predicate};
use crate::data::descriptor::OpDescriptor;
use crate::data::expr::{Binding, Expr, Kind};

fn alpha() -> Expr {
    Expr::wild("alpha", Kind::Scalar)
}

fn beta() -> Expr {
    Expr::wild("beta", Kind::Scalar)
}

fn mat(name: &str) -> Expr {
    Expr::wild(name, Kind::Matrix)
}

// Fixes the accumulator of a `... + beta*C` kernel to zero.
fn no_accumulator() -> Binding {
    Binding::new()
        .update("beta".into(), Expr::num(0))
        .update("C".into(), Expr::zero_matrix())
}

/// General matrix multiply: `C := alpha*A*B + beta*C`.
pub fn gemm() -> OpDescriptor {
    let (a, b, c) = (mat("A"), mat("B"), mat("C"));
    OpDescriptor::new(
        "GEMM",
        vec![alpha(), a.clone(), b.clone(), beta(), c.clone()],
        vec![alpha() * a * b + beta() * c],
    )
    .with_alias(0, 4)
}

/// Matrix multiply where one factor is symmetric.
pub fn symm() -> OpDescriptor {
    let base = gemm();
    OpDescriptor::new("SYMM", base.inputs().to_vec(), base.outputs().to_vec())
        .with_condition(
            Condition::holds(Predicate::Symmetric, mat("A"))
                | Condition::holds(Predicate::Symmetric, mat("B")),
        )
        .with_alias(0, 4)
}

/// Symmetric rank-k update: `C := alpha*A*A.T + beta*C`.
pub fn syrk() -> OpDescriptor {
    let (a, c) = (mat("A"), mat("C"));
    OpDescriptor::new(
        "SYRK",
        vec![alpha(), a.clone(), beta(), c.clone()],
        vec![alpha() * a.clone() * a.t() + beta() * c],
    )
    .with_alias(0, 3)
}

/// `Y := alpha*X + Y`.
pub fn axpy() -> OpDescriptor {
    let (x, y) = (mat("X"), mat("Y"));
    OpDescriptor::new(
        "AXPY",
        vec![alpha(), x.clone(), y.clone()],
        vec![alpha() * x + y],
    )
    .with_alias(0, 2)
}

pub fn descriptors() -> Vec<OpDescriptor> {
    let (syrk, symm, gemm) = (syrk(), symm(), gemm());
    vec![
        syrk.specialize("0", &no_accumulator()),
        syrk,
        symm.specialize("0", &no_accumulator()),
        symm,
        gemm.specialize("0", &no_accumulator()),
        gemm,
        axpy(),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_descriptors_are_well_formed() {
        for op in descriptors() {
            assert_eq!(op.validate(), Ok(()), "{}", op);
        }
    }

    #[test]
    fn test_zero_accumulator() {
        let gemm_0 = gemm().specialize("0", &no_accumulator());
        assert_eq!(gemm_0.name(), "GEMM_0");
        assert_eq!(gemm_0.outputs(), &[alpha() * mat("A") * mat("B")]);
        assert_eq!(gemm_0.inputs()[4], Expr::zero_matrix());
        assert_eq!(gemm_0.alias_map(), gemm().alias_map());
    }
}
