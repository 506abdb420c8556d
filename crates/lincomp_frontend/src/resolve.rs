use lalrpop_util::ParseError;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::lex;
use crate::parse;
use crate::parse_error;
use crate::raw_ast as raw;
use lincomp_common::data::condition::Predicate;
use lincomp_common::data::expr::{Expr, Kind};
use lincomp_common::file_cache::FileCache;
use lincomp_common::kernels::lapack;
use lincomp_common::lines;
use lincomp_common::report_error::{locate_path, locate_span, Locate, Reportable};

#[derive(Debug)]
pub enum ErrorKind {
    ReadFailed(PathBuf, io::Error),
    ParseFailed(ParseError<usize, lex::Token, lex::Error>),
    UndeclaredName(String),
    Redeclared(String),
    UnknownFunction(String),
    FunctionArity {
        name: String,
        expected: usize,
        actual: usize,
    },
    UnknownPredicate(String),
    PredicateArity(String, usize),
    PredicateInExpr(String),
    NotAPredicate,
    KindMismatch(Kind, Kind),
    NoOutputs,
}

type RawError = Locate<ErrorKind>;

#[derive(Debug)]
pub struct Error(RawError);

impl Reportable for Error {
    fn report(&self, dest: &mut impl io::Write, files: &FileCache) -> io::Result<()> {
        use ErrorKind::*;

        match &self.0.error {
            ReadFailed(path, err) if err.kind() != io::ErrorKind::NotFound => {
                writeln!(dest, "Could not read {}: {}", path.display(), err)?;
                return Ok(());
            }
            ParseFailed(err) => {
                return parse_error::report(dest, files, self.0.path.as_deref(), err);
            }
            _ => {}
        }

        self.0.report_with(dest, files, |kind| match kind {
            ReadFailed(path, _) => (
                "File Not Found",
                format!(
                    lines!["I couldn't find a file at this path:", "", "    {}"],
                    path.display()
                ),
            ),
            // Handled above
            ParseFailed(_) => unreachable!(),
            UndeclaredName(name) => (
                "Undeclared Name",
                format!(
                    lines![
                        "I can't find a declaration for '{name}'.",
                        "",
                        "Declare it before its first use with 'scalar {name};' or 'matrix {name};'.",
                    ],
                    name = name
                ),
            ),
            Redeclared(name) => (
                "Duplicate Declaration",
                format!("The name '{}' is already declared earlier in this file.", name),
            ),
            UnknownFunction(name) => (
                "Unknown Function",
                format!(
                    lines![
                        "I don't know a function called '{}'.",
                        "",
                        "The functions I know are {}.",
                    ],
                    name,
                    known_list(FUNCTIONS.iter().map(|(name, _)| *name)),
                ),
            ),
            FunctionArity {
                name,
                expected,
                actual,
            } => (
                "Wrong Number of Arguments",
                format!(
                    "The function '{}' takes {} argument(s), but it is applied to {} here.",
                    name, expected, actual
                ),
            ),
            UnknownPredicate(name) => (
                "Unknown Predicate",
                format!(
                    lines![
                        "I don't know a predicate called '{}'.",
                        "",
                        "The predicates I know are {}.",
                    ],
                    name,
                    known_list(Predicate::ALL.iter().map(|p| p.name())),
                ),
            ),
            PredicateArity(name, actual) => (
                "Wrong Number of Arguments",
                format!(
                    "The predicate '{}' takes exactly one argument, but it is applied to {} here.",
                    name, actual
                ),
            ),
            PredicateInExpr(name) => (
                "Predicate Used as a Value",
                format!(
                    lines![
                        "'{}' is a predicate, so it can only appear at the top of an 'assume'",
                        "declaration, not inside an expression.",
                    ],
                    name
                ),
            ),
            NotAPredicate => (
                "Expected a Predicate",
                lines![
                    "Every 'assume' entry must be a predicate applied to an expression, like",
                    "",
                    "    assume symmetric(X);",
                ]
                .to_owned(),
            ),
            KindMismatch(left, right) => (
                "Kind Mismatch",
                format!(
                    "I can't add a {} and a {}. Both sides of '+' and '-' must have the same kind.",
                    left, right
                ),
            ),
            NoOutputs => (
                "No Outputs",
                "This problem never says what to compute. Add at least one 'output' line."
                    .to_owned(),
            ),
        })
    }

    fn exit_status(&self) -> i32 {
        1
    }
}

fn known_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

type FunctionBuilder = fn(Expr) -> Expr;

const FUNCTIONS: &[(&str, FunctionBuilder)] = &[
    ("LU", lapack::lu),
    ("CHOL", lapack::cholesky),
    ("IPIV", lapack::ipiv),
    ("INFO", lapack::info),
];

/// A fully resolved problem: what to compute, what the caller supplies, and what is known about
/// it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub outputs: Vec<Expr>,
    pub inputs: Vec<Expr>,
    pub facts: Vec<(Predicate, Expr)>,
}

#[derive(Clone, Debug, Default)]
struct Scope {
    names: BTreeMap<String, Kind>,
}

impl Scope {
    fn declare(&mut self, name: &raw::Name, kind: Kind) -> Result<(), RawError> {
        match self.names.entry(name.name.clone()) {
            Entry::Occupied(_) => Err(Locate::from(ErrorKind::Redeclared(name.name.clone())))
                .map_err(locate_span(name.lo, name.hi)),
            Entry::Vacant(entry) => {
                entry.insert(kind);
                Ok(())
            }
        }
    }
}

fn resolve_expr(scope: &Scope, expr: &raw::Expr) -> Result<Expr, RawError> {
    match expr {
        raw::Expr::Var(name) => match scope.names.get(name) {
            Some(kind) => Ok(Expr::symbol(name.as_str(), *kind)),
            None => Err(ErrorKind::UndeclaredName(name.clone()).into()),
        },

        raw::Expr::IntLit(value) => Ok(Expr::num(*value)),

        raw::Expr::App(name, args) => {
            if Predicate::from_name(name).is_some() {
                return Err(ErrorKind::PredicateInExpr(name.clone()).into());
            }
            let (_, build) = FUNCTIONS
                .iter()
                .find(|(known, _)| *known == name.as_str())
                .ok_or_else(|| ErrorKind::UnknownFunction(name.clone()))?;
            if args.len() != 1 {
                return Err(ErrorKind::FunctionArity {
                    name: name.clone(),
                    expected: 1,
                    actual: args.len(),
                }
                .into());
            }
            Ok(build(resolve_expr(scope, &args[0])?))
        }

        raw::Expr::Add(left, right) | raw::Expr::Sub(left, right) => {
            let left = resolve_expr(scope, left)?;
            let right = resolve_expr(scope, right)?;
            if left.kind() != right.kind() {
                return Err(ErrorKind::KindMismatch(left.kind(), right.kind()).into());
            }
            Ok(match expr {
                raw::Expr::Sub(_, _) => left - right,
                _ => left + right,
            })
        }

        raw::Expr::Mul(left, right) => Ok(resolve_expr(scope, left)? * resolve_expr(scope, right)?),

        raw::Expr::Neg(arg) => Ok(-resolve_expr(scope, arg)?),

        raw::Expr::Inverse(arg) => Ok(resolve_expr(scope, arg)?.inv()),

        raw::Expr::Transpose(arg) => Ok(resolve_expr(scope, arg)?.t()),

        raw::Expr::Span(lo, hi, body) => resolve_expr(scope, body).map_err(locate_span(*lo, *hi)),
    }
}

fn resolve_fact(scope: &Scope, expr: &raw::Expr) -> Result<(Predicate, Expr), RawError> {
    match expr {
        raw::Expr::Span(lo, hi, body) => resolve_fact(scope, body).map_err(locate_span(*lo, *hi)),

        raw::Expr::App(name, args) => {
            let predicate = Predicate::from_name(name)
                .ok_or_else(|| ErrorKind::UnknownPredicate(name.clone()))?;
            if args.len() != 1 {
                return Err(ErrorKind::PredicateArity(name.clone(), args.len()).into());
            }
            Ok((predicate, resolve_expr(scope, &args[0])?))
        }

        _ => Err(ErrorKind::NotAPredicate.into()),
    }
}

fn push_unique(dest: &mut Vec<Expr>, expr: Expr) {
    if !dest.contains(&expr) {
        dest.push(expr);
    }
}

fn resolve_items(items: &[raw::Item]) -> Result<Problem, RawError> {
    let mut scope = Scope::default();
    let mut problem = Problem {
        outputs: Vec::new(),
        inputs: Vec::new(),
        facts: Vec::new(),
    };

    // Names must be declared before they are used.
    for item in items {
        match item {
            raw::Item::Declare(kind, names) => {
                for name in names {
                    scope.declare(name, *kind)?;
                }
            }
            raw::Item::Input(exprs) => {
                for expr in exprs {
                    push_unique(&mut problem.inputs, resolve_expr(&scope, expr)?);
                }
            }
            raw::Item::Output(exprs) => {
                for expr in exprs {
                    push_unique(&mut problem.outputs, resolve_expr(&scope, expr)?);
                }
            }
            raw::Item::Assume(exprs) => {
                for expr in exprs {
                    let fact = resolve_fact(&scope, expr)?;
                    if !problem.facts.contains(&fact) {
                        problem.facts.push(fact);
                    }
                }
            }
        }
    }

    if problem.outputs.is_empty() {
        return Err(ErrorKind::NoOutputs.into());
    }

    Ok(problem)
}

fn resolve_raw(files: &mut FileCache, path: &Path) -> Result<Problem, RawError> {
    let src = files.read(path).map_err(|err| Locate {
        error: ErrorKind::ReadFailed(path.to_owned(), err),
        span: None,
        path: None,
    })?;

    let content = parse::ProblemParser::new()
        .parse(lex::Lexer::new(src))
        .map_err(|err| Locate::from(ErrorKind::ParseFailed(err)))
        .map_err(locate_path(path))?;

    resolve_items(&content.0).map_err(locate_path(path))
}

pub fn resolve_problem(files: &mut FileCache, path: &Path) -> Result<Problem, Error> {
    resolve_raw(files, path).map_err(Error)
}

#[cfg(test)]
mod test {
    use super::*;

    fn resolve_str(src: &str) -> Result<Problem, Error> {
        let mut files = FileCache::new();
        files.insert("problem.lin", src);
        resolve_problem(&mut files, Path::new("problem.lin"))
    }

    fn error_kind(src: &str) -> ErrorKind {
        match resolve_str(src) {
            Ok(problem) => panic!("expected an error, got {:?}", problem),
            Err(Error(err)) => err.error,
        }
    }

    #[test]
    fn test_resolve_problem() {
        let problem = resolve_str(lines![
            "scalar a, b;",
            "matrix X, Y, Z, x;",
            "input a, X, Y, b, Z, x;",
            "output (a*X*Y + b*Z).I*x;",
            "assume symmetric(a*X*Y + b*Z), positive_definite(a*X*Y + b*Z);",
        ])
        .unwrap();

        let a = Expr::scalar("a");
        let b = Expr::scalar("b");
        let (x_big, y, z, x) = (
            Expr::matrix("X"),
            Expr::matrix("Y"),
            Expr::matrix("Z"),
            Expr::matrix("x"),
        );
        let lhs = a.clone() * x_big.clone() * y.clone() + b.clone() * z.clone();

        assert_eq!(problem.outputs, vec![lhs.inv() * x.clone()]);
        assert_eq!(problem.inputs, vec![a, x_big, y, b, z, x]);
        assert_eq!(
            problem.facts,
            vec![
                (Predicate::Symmetric, lhs.clone()),
                (Predicate::PositiveDefinite, lhs)
            ]
        );
    }

    #[test]
    fn test_functions_and_sugar() {
        let problem = resolve_str(lines![
            "matrix A, B;",
            "input LU(A), IPIV(A), B;",
            "output A.T.I*B - B, INFO(A);",
        ])
        .unwrap();

        let a = Expr::matrix("A");
        let b = Expr::matrix("B");
        assert_eq!(
            problem.inputs,
            vec![lapack::lu(a.clone()), lapack::ipiv(a.clone()), b.clone()]
        );
        assert_eq!(
            problem.outputs,
            vec![a.t().inv() * b.clone() - b, lapack::info(a)]
        );
    }

    #[test]
    fn test_resolve_errors() {
        assert!(matches!(
            error_kind("matrix X; output X + Y;"),
            ErrorKind::UndeclaredName(name) if name == "Y"
        ));
        assert!(matches!(
            error_kind("matrix X; scalar X; output X;"),
            ErrorKind::Redeclared(name) if name == "X"
        ));
        assert!(matches!(
            error_kind("scalar a; matrix X; output a + X;"),
            ErrorKind::KindMismatch(Kind::Scalar, Kind::Matrix)
        ));
        assert!(matches!(
            error_kind("matrix X; output X; assume hermitian(X);"),
            ErrorKind::UnknownPredicate(name) if name == "hermitian"
        ));
        assert!(matches!(
            error_kind("matrix X; output X; assume X;"),
            ErrorKind::NotAPredicate
        ));
        assert!(matches!(
            error_kind("matrix X; output symmetric(X);"),
            ErrorKind::PredicateInExpr(_)
        ));
        assert!(matches!(
            error_kind("matrix X; output QR(X);"),
            ErrorKind::UnknownFunction(_)
        ));
        assert!(matches!(error_kind("matrix X; input X;"), ErrorKind::NoOutputs));
        assert!(matches!(
            error_kind("matrix X; output X +;"),
            ErrorKind::ParseFailed(_)
        ));
    }

    #[test]
    fn test_error_span() {
        let src = "scalar a; matrix X;\noutput X * (a + X);\n";
        let mut files = FileCache::new();
        files.insert("problem.lin", src);
        let err = resolve_problem(&mut files, Path::new("problem.lin")).unwrap_err();

        let (lo, hi) = err.0.span.unwrap();
        assert_eq!(&src[lo..hi], "a + X");

        let mut out = Vec::new();
        err.report(&mut out, &files).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Kind Mismatch"));
        assert!(out.contains("problem.lin:2:13"));
    }
}
