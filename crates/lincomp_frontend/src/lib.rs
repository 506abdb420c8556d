mod lex;
mod parse_error;
mod raw_ast;

pub mod error;
pub mod oracle;
pub mod resolve;
pub mod rewrite;
pub mod signature;
pub mod unify;

use lalrpop_util::lalrpop_mod;
lalrpop_mod!(parse);

use crate::error::Error;
use crate::oracle::Assumptions;
use crate::resolve::Problem;
use crate::rewrite::Compilations;
use lincomp_common::config::SearchOptions;
use lincomp_common::data::descriptor::Catalog;
use lincomp_common::file_cache::FileCache;
use std::path::Path;

pub fn load_problem(files: &mut FileCache, path: &Path) -> Result<Problem, Error> {
    resolve::resolve_problem(files, path).map_err(Error::ResolveFailed)
}

/// Starts the search for ways to compute `problem` with the operations in `catalog`, deciding
/// side conditions from the problem's own assumptions.
pub fn compile_problem<'a>(
    problem: &Problem,
    catalog: &'a Catalog,
    options: &SearchOptions,
) -> Compilations<'a, Assumptions> {
    let oracle = Assumptions::from_facts(problem.facts.iter().cloned());
    rewrite::compile(&problem.outputs, &problem.inputs, oracle, catalog, options)
}
