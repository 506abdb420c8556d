use std::collections::BTreeMap;
use std::fmt;
use std::ops;
use std::rc::Rc;

use im_rc::OrdMap;

/// Whether an expression denotes a scalar or a matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Scalar,
    Matrix,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Scalar => write!(f, "scalar"),
            Kind::Matrix => write!(f, "matrix"),
        }
    }
}

/// Assignment of pattern variables (by name) to concrete expressions.
pub type Binding = OrdMap<Rc<str>, Expr>;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExprKind {
    // `Num` is declared first so that numeric coefficients sort to the front of sums and products.
    Num(i64),
    ZeroMatrix,
    IdentityMatrix,
    Symbol(Rc<str>, Kind),
    Wild(Rc<str>, Kind),
    Add(Vec<Expr>),
    Mul(Vec<Expr>),
    Inverse(Expr),
    Transpose(Expr),
    Func(Rc<str>, Kind, Vec<Expr>),
}

/// An immutable symbolic term.
///
/// Terms are only ever built through the smart constructors below, which keep them in a canonical
/// form: sums are flattened with numeric terms folded and terms sorted, products are flattened
/// with scalar factors sorted in front of the (ordered) matrix factors, and trivial inverses and
/// transposes are cancelled. Structural equality on canonical terms is what the rest of the
/// compiler relies on to recognize "the same value".
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expr(Rc<ExprKind>);

/// The operator at the root of a compound expression.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Head {
    Add,
    Mul,
    Inverse,
    Transpose,
    Func(Rc<str>),
}

impl Expr {
    fn from_kind(kind: ExprKind) -> Expr {
        Expr(Rc::new(kind))
    }

    pub fn data(&self) -> &ExprKind {
        &self.0
    }

    pub fn num(value: i64) -> Expr {
        Expr::from_kind(ExprKind::Num(value))
    }

    pub fn zero_matrix() -> Expr {
        Expr::from_kind(ExprKind::ZeroMatrix)
    }

    pub fn identity_matrix() -> Expr {
        Expr::from_kind(ExprKind::IdentityMatrix)
    }

    pub fn zero(kind: Kind) -> Expr {
        match kind {
            Kind::Scalar => Expr::num(0),
            Kind::Matrix => Expr::zero_matrix(),
        }
    }

    pub fn symbol(name: impl Into<Rc<str>>, kind: Kind) -> Expr {
        Expr::from_kind(ExprKind::Symbol(name.into(), kind))
    }

    pub fn scalar(name: impl Into<Rc<str>>) -> Expr {
        Expr::symbol(name, Kind::Scalar)
    }

    pub fn matrix(name: impl Into<Rc<str>>) -> Expr {
        Expr::symbol(name, Kind::Matrix)
    }

    pub fn wild(name: impl Into<Rc<str>>, kind: Kind) -> Expr {
        Expr::from_kind(ExprKind::Wild(name.into(), kind))
    }

    pub fn func(name: impl Into<Rc<str>>, kind: Kind, args: Vec<Expr>) -> Expr {
        Expr::from_kind(ExprKind::Func(name.into(), kind, args))
    }

    pub fn sum(terms: impl IntoIterator<Item = Expr>) -> Expr {
        let mut flat = Vec::new();
        let mut constant = 0;
        let mut kind = Kind::Scalar;
        for term in terms {
            kind = kind.max(term.kind());
            push_term(term, &mut flat, &mut constant);
        }

        if constant != 0 {
            flat.push(Expr::num(constant));
        }
        flat.sort();

        match flat.len() {
            0 => Expr::zero(kind),
            1 => flat.swap_remove(0),
            _ => Expr::from_kind(ExprKind::Add(flat)),
        }
    }

    pub fn product(factors: impl IntoIterator<Item = Expr>) -> Expr {
        let mut coefficient = 1;
        let mut scalars = Vec::new();
        let mut matrices = Vec::new();
        for factor in factors {
            push_factor(factor, &mut coefficient, &mut scalars, &mut matrices);
        }

        let has_matrix = !matrices.is_empty();
        if coefficient == 0
            || matrices
                .iter()
                .any(|m| matches!(m.data(), ExprKind::ZeroMatrix))
        {
            return if has_matrix {
                Expr::zero_matrix()
            } else {
                Expr::num(0)
            };
        }

        matrices.retain(|m| !matches!(m.data(), ExprKind::IdentityMatrix));
        if has_matrix && matrices.is_empty() {
            matrices.push(Expr::identity_matrix());
        }
        scalars.sort();

        let mut result = Vec::with_capacity(1 + scalars.len() + matrices.len());
        if coefficient != 1 || (scalars.is_empty() && matrices.is_empty()) {
            result.push(Expr::num(coefficient));
        }
        result.extend(scalars);
        result.extend(matrices);

        if result.len() == 1 {
            result.swap_remove(0)
        } else {
            Expr::from_kind(ExprKind::Mul(result))
        }
    }

    pub fn inverse(arg: Expr) -> Expr {
        if let ExprKind::Inverse(inner) = arg.data() {
            return inner.clone();
        }
        if matches!(
            arg.data(),
            ExprKind::IdentityMatrix | ExprKind::Num(1) | ExprKind::Num(-1)
        ) {
            return arg;
        }
        Expr::from_kind(ExprKind::Inverse(arg))
    }

    pub fn transpose(arg: Expr) -> Expr {
        if let ExprKind::Transpose(inner) = arg.data() {
            return inner.clone();
        }
        if arg.kind() == Kind::Scalar
            || matches!(arg.data(), ExprKind::ZeroMatrix | ExprKind::IdentityMatrix)
        {
            return arg;
        }
        Expr::from_kind(ExprKind::Transpose(arg))
    }

    pub fn inv(&self) -> Expr {
        Expr::inverse(self.clone())
    }

    pub fn t(&self) -> Expr {
        Expr::transpose(self.clone())
    }

    pub fn kind(&self) -> Kind {
        match self.data() {
            ExprKind::Num(_) => Kind::Scalar,
            ExprKind::ZeroMatrix | ExprKind::IdentityMatrix => Kind::Matrix,
            ExprKind::Symbol(_, kind) | ExprKind::Wild(_, kind) | ExprKind::Func(_, kind, _) => {
                *kind
            }
            ExprKind::Add(terms) => terms
                .iter()
                .map(Expr::kind)
                .max()
                .unwrap_or(Kind::Scalar),
            // Matrix factors always trail the scalar ones.
            ExprKind::Mul(factors) => factors.last().map_or(Kind::Scalar, Expr::kind),
            ExprKind::Inverse(arg) | ExprKind::Transpose(arg) => arg.kind(),
        }
    }

    pub fn head(&self) -> Option<Head> {
        match self.data() {
            ExprKind::Add(_) => Some(Head::Add),
            ExprKind::Mul(_) => Some(Head::Mul),
            ExprKind::Inverse(_) => Some(Head::Inverse),
            ExprKind::Transpose(_) => Some(Head::Transpose),
            ExprKind::Func(name, _, _) => Some(Head::Func(name.clone())),
            ExprKind::Num(_)
            | ExprKind::ZeroMatrix
            | ExprKind::IdentityMatrix
            | ExprKind::Symbol(_, _)
            | ExprKind::Wild(_, _) => None,
        }
    }

    pub fn children(&self) -> &[Expr] {
        match self.data() {
            ExprKind::Add(children) | ExprKind::Mul(children) | ExprKind::Func(_, _, children) => {
                children
            }
            ExprKind::Inverse(arg) | ExprKind::Transpose(arg) => std::slice::from_ref(arg),
            ExprKind::Num(_)
            | ExprKind::ZeroMatrix
            | ExprKind::IdentityMatrix
            | ExprKind::Symbol(_, _)
            | ExprKind::Wild(_, _) => &[],
        }
    }

    /// Literals and the zero and identity matrices. These never need to be supplied as inputs.
    pub fn is_constant(&self) -> bool {
        matches!(
            self.data(),
            ExprKind::Num(_) | ExprKind::ZeroMatrix | ExprKind::IdentityMatrix
        )
    }

    pub fn is_wild(&self) -> bool {
        matches!(self.data(), ExprKind::Wild(_, _))
    }

    pub fn has_wilds(&self) -> bool {
        self.is_wild() || self.children().iter().any(Expr::has_wilds)
    }

    pub fn wilds(&self) -> BTreeMap<Rc<str>, Kind> {
        let mut wilds = BTreeMap::new();
        self.collect_wilds(&mut wilds);
        wilds
    }

    pub fn collect_wilds(&self, wilds: &mut BTreeMap<Rc<str>, Kind>) {
        if let ExprKind::Wild(name, kind) = self.data() {
            wilds.insert(name.clone(), *kind);
        }
        for child in self.children() {
            child.collect_wilds(wilds);
        }
    }

    /// Replaces every bound pattern variable and re-canonicalizes the result.
    pub fn subst(&self, binding: &Binding) -> Expr {
        if binding.is_empty() {
            return self.clone();
        }
        match self.data() {
            ExprKind::Num(_)
            | ExprKind::ZeroMatrix
            | ExprKind::IdentityMatrix
            | ExprKind::Symbol(_, _) => self.clone(),
            ExprKind::Wild(name, _) => binding.get(name).cloned().unwrap_or_else(|| self.clone()),
            ExprKind::Add(terms) => Expr::sum(terms.iter().map(|term| term.subst(binding))),
            ExprKind::Mul(factors) => {
                Expr::product(factors.iter().map(|factor| factor.subst(binding)))
            }
            ExprKind::Inverse(arg) => Expr::inverse(arg.subst(binding)),
            ExprKind::Transpose(arg) => Expr::transpose(arg.subst(binding)),
            ExprKind::Func(name, kind, args) => Expr::func(
                name.clone(),
                *kind,
                args.iter().map(|arg| arg.subst(binding)).collect(),
            ),
        }
    }

    /// A short human-readable base name for storage holding this value.
    pub fn name_hint(&self) -> String {
        match self.data() {
            ExprKind::Num(value) if *value >= 0 => format!("c{}", value),
            ExprKind::Num(value) => format!("cm{}", value.unsigned_abs()),
            ExprKind::ZeroMatrix => "zero".to_owned(),
            ExprKind::IdentityMatrix => "eye".to_owned(),
            ExprKind::Symbol(name, _) | ExprKind::Wild(name, _) => name.to_string(),
            ExprKind::Func(name, _, _) => name.to_lowercase(),
            ExprKind::Inverse(arg) => format!("{}_inv", arg.name_hint()),
            ExprKind::Transpose(arg) => format!("{}_t", arg.name_hint()),
            ExprKind::Add(_) | ExprKind::Mul(_) => "tmp".to_owned(),
        }
    }
}

// Literals whose folding would overflow are kept as separate operands.
fn push_term(term: Expr, flat: &mut Vec<Expr>, constant: &mut i64) {
    match term.data() {
        ExprKind::Num(value) => match constant.checked_add(*value) {
            Some(folded) => *constant = folded,
            None => flat.push(term.clone()),
        },
        ExprKind::ZeroMatrix => {}
        ExprKind::Add(terms) => {
            for inner in terms {
                push_term(inner.clone(), flat, constant);
            }
        }
        _ => flat.push(term.clone()),
    }
}

fn push_factor(
    factor: Expr,
    coefficient: &mut i64,
    scalars: &mut Vec<Expr>,
    matrices: &mut Vec<Expr>,
) {
    match factor.data() {
        ExprKind::Num(value) => match coefficient.checked_mul(*value) {
            Some(folded) => *coefficient = folded,
            None => scalars.push(factor.clone()),
        },
        ExprKind::Mul(inner) => {
            for inner_factor in inner {
                push_factor(inner_factor.clone(), coefficient, scalars, matrices);
            }
        }
        _ => match factor.kind() {
            Kind::Scalar => scalars.push(factor.clone()),
            Kind::Matrix => matrices.push(factor.clone()),
        },
    }
}

// Operands of a product that need parentheses.
fn needs_parens_in_product(expr: &Expr) -> bool {
    match expr.data() {
        ExprKind::Add(_) => true,
        ExprKind::Num(value) => *value < 0,
        _ => false,
    }
}

// Operands of `.I` / `.T` that need parentheses.
fn needs_parens_in_postfix(expr: &Expr) -> bool {
    match expr.data() {
        ExprKind::Add(_) | ExprKind::Mul(_) => true,
        ExprKind::Num(value) => *value < 0,
        _ => false,
    }
}

fn write_wrapped(f: &mut fmt::Formatter<'_>, expr: &Expr, wrap: bool) -> fmt::Result {
    if wrap {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            ExprKind::Num(value) => write!(f, "{}", value),
            ExprKind::ZeroMatrix => write!(f, "0"),
            ExprKind::IdentityMatrix => write!(f, "I"),
            ExprKind::Symbol(name, _) | ExprKind::Wild(name, _) => write!(f, "{}", name),
            ExprKind::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, " + ")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
            ExprKind::Mul(factors) => {
                let rest = match factors.split_first() {
                    Some((first, rest))
                        if matches!(first.data(), ExprKind::Num(-1)) && !rest.is_empty() =>
                    {
                        write!(f, "-")?;
                        rest
                    }
                    _ => &factors[..],
                };
                for (i, factor) in rest.iter().enumerate() {
                    if i > 0 {
                        write!(f, "*")?;
                    }
                    write_wrapped(f, factor, needs_parens_in_product(factor))?;
                }
                Ok(())
            }
            ExprKind::Inverse(arg) => {
                write_wrapped(f, arg, needs_parens_in_postfix(arg))?;
                write!(f, ".I")
            }
            ExprKind::Transpose(arg) => {
                write_wrapped(f, arg, needs_parens_in_postfix(arg))?;
                write!(f, ".T")
            }
            ExprKind::Func(name, _, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr({})", self)
    }
}

macro_rules! binary_ops {
    ($($trait:ident :: $method:ident => $combine:expr;)*) => {
        $(
            impl ops::$trait<Expr> for Expr {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Expr {
                    ($combine)(self, rhs)
                }
            }

            impl ops::$trait<&Expr> for &Expr {
                type Output = Expr;

                fn $method(self, rhs: &Expr) -> Expr {
                    ($combine)(self.clone(), rhs.clone())
                }
            }
        )*
    };
}

binary_ops! {
    Add::add => |lhs: Expr, rhs: Expr| Expr::sum([lhs, rhs]);
    Sub::sub => |lhs: Expr, rhs: Expr| Expr::sum([lhs, -rhs]);
    Mul::mul => |lhs: Expr, rhs: Expr| Expr::product([lhs, rhs]);
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::product([Expr::num(-1), self])
    }
}

impl ops::Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -self.clone()
    }
}

impl ops::Mul<Expr> for i64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::product([Expr::num(self), rhs])
    }
}

impl ops::Add<i64> for Expr {
    type Output = Expr;

    fn add(self, rhs: i64) -> Expr {
        Expr::sum([self, Expr::num(rhs)])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sum_canonical() {
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");
        assert_eq!(x.clone() + y.clone(), y.clone() + x.clone());
        assert_eq!((x.clone() + y.clone()) + x.clone(), x.clone() + (y.clone() + x.clone()));
        assert_eq!(x.clone() + Expr::zero_matrix(), x);

        let a = Expr::scalar("a");
        assert_eq!(a.clone() + 1 + 2, a.clone() + 3);
        assert_eq!(a.clone() - a.clone() + 1 + (-1), a.clone() - a.clone());
    }

    #[test]
    fn test_product_canonical() {
        let a = Expr::scalar("a");
        let b = Expr::scalar("b");
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");

        assert_eq!(
            x.clone() * a.clone() * y.clone() * b.clone(),
            b.clone() * a.clone() * x.clone() * y.clone()
        );
        assert_ne!(x.clone() * y.clone(), y.clone() * x.clone());
        assert_eq!(1 * x.clone(), x);
        assert_eq!(0 * x.clone(), Expr::zero_matrix());
        assert_eq!(x.clone() * Expr::identity_matrix(), x);
        assert_eq!(
            Expr::identity_matrix() * Expr::identity_matrix(),
            Expr::identity_matrix()
        );
        assert_eq!(2 * (3 * a.clone()), 6 * a.clone());

        match (a.clone() * x.clone() * y.clone()).data() {
            ExprKind::Mul(factors) => assert_eq!(factors, &vec![a, x, y]),
            other => panic!("expected a product, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_overflow() {
        let x = Expr::matrix("X");
        let big = 1_i64 << 62;

        let scaled = Expr::product([Expr::num(2), Expr::num(big), x.clone()]);
        match scaled.data() {
            ExprKind::Mul(factors) => {
                assert_eq!(factors, &vec![Expr::num(2), Expr::num(big), x.clone()])
            }
            other => panic!("expected a product, got {:?}", other),
        }
        assert_eq!(scaled.kind(), Kind::Matrix);

        let a = Expr::scalar("a");
        let shifted = Expr::sum([Expr::num(i64::MAX), Expr::num(1), a.clone()]);
        match shifted.data() {
            ExprKind::Add(terms) => {
                assert_eq!(terms.len(), 3);
                assert!(terms.contains(&Expr::num(i64::MAX)));
                assert!(terms.contains(&Expr::num(1)));
                assert!(terms.contains(&a));
            }
            other => panic!("expected a sum, got {:?}", other),
        }
    }

    #[test]
    fn test_inverse_transpose() {
        let x = Expr::matrix("X");
        let a = Expr::scalar("a");
        assert_eq!(x.inv().inv(), x);
        assert_eq!(x.t().t(), x);
        assert_eq!(a.t(), a);
        assert_eq!(Expr::identity_matrix().inv(), Expr::identity_matrix());
        assert_eq!(x.t().kind(), Kind::Matrix);
    }

    #[test]
    fn test_kind() {
        let a = Expr::scalar("a");
        let x = Expr::matrix("X");
        assert_eq!((a.clone() * a.clone()).kind(), Kind::Scalar);
        assert_eq!((a.clone() * x.clone()).kind(), Kind::Matrix);
        assert_eq!((x.clone() + x.clone().t()).kind(), Kind::Matrix);
        assert_eq!(Expr::func("INFO", Kind::Scalar, vec![x]).kind(), Kind::Scalar);
    }

    #[test]
    fn test_subst() {
        let alpha = Expr::wild("alpha", Kind::Scalar);
        let m = Expr::wild("A", Kind::Matrix);
        let pattern = alpha.clone() * m.clone() + m.t();

        let binding = Binding::new()
            .update("alpha".into(), Expr::num(1))
            .update("A".into(), Expr::matrix("X").t());
        let x = Expr::matrix("X");
        assert_eq!(pattern.subst(&binding), x.t() + x);
        assert!(pattern.has_wilds());
        assert!(!pattern.subst(&binding).has_wilds());
        assert_eq!(pattern.wilds().len(), 2);
    }

    #[test]
    fn test_display() {
        let a = Expr::scalar("a");
        let b = Expr::scalar("b");
        let x = Expr::matrix("X");
        let y = Expr::matrix("Y");
        let z = Expr::matrix("Z");
        let v = Expr::matrix("x");

        let expr = (a * x.clone() * y.clone() + b * z).inv() * v;
        assert_eq!(expr.to_string(), "(a*X*Y + b*Z).I*x");
        assert_eq!((x.clone() * y.clone()).t().to_string(), "(X*Y).T");
        assert_eq!((-x.clone()).to_string(), "-X");
        assert_eq!(x.inv().t().to_string(), "X.I.T");
    }

    #[test]
    fn test_name_hint() {
        let x = Expr::matrix("X");
        assert_eq!(x.name_hint(), "X");
        assert_eq!(x.inv().name_hint(), "X_inv");
        assert_eq!((x.clone() * x.clone()).name_hint(), "tmp");
        assert_eq!(Expr::num(-2).name_hint(), "cm2");
        assert_eq!(Expr::zero_matrix().name_hint(), "zero");
    }
}
