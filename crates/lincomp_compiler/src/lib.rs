#[cfg(test)]
mod test;

pub mod cli;
pub mod report;

use lincomp_backend::inplace_compile;
use lincomp_backend::intent::intents;
use lincomp_common::config::EmitFormat;
use lincomp_common::data::computation::Node;
use lincomp_common::data::descriptor::{Catalog, OpDescriptor};
use lincomp_common::data::token::{ExprToken, Intent, Token};
use lincomp_common::file_cache::FileCache;
use lincomp_common::kernels::reference_catalog;
use lincomp_common::pretty_print::{write_candidate, write_plan};
use lincomp_common::report_error::Reportable;
use lincomp_common::util::name_gen::TokenNamer;
use lincomp_frontend::rewrite::SearchError;
use lincomp_frontend::{compile_problem, load_problem};
use log::{info, warn};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::report::PlanReport;

#[derive(Debug)]
enum ErrorKind {
    FrontendError(lincomp_frontend::error::Error),
    BackendError(lincomp_backend::error::Error),
    NoCompilationFound(PathBuf),
    WriteFailed(io::Error),
    SerializeFailed(serde_json::Error),
}

// This type is separate from 'ErrorKind' because enums cannot have private variants, and we don't
// want to expose the internal compiler error types appearing in the variants of 'ErrorKind'.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl Reportable for Error {
    fn report(&self, dest: &mut impl io::Write, files: &FileCache) -> io::Result<()> {
        use ErrorKind::*;
        match &self.kind {
            FrontendError(err) => err.report(dest, files),
            BackendError(err) => err.report(dest, files),
            NoCompilationFound(path) => writeln!(
                dest,
                "No sequence of operations computes the outputs of {} from its inputs.",
                path.display()
            ),
            WriteFailed(err) => writeln!(dest, "Could not write output: {}", err),
            SerializeFailed(err) => writeln!(dest, "Could not serialize plan: {}", err),
        }
    }

    fn exit_status(&self) -> i32 {
        match &self.kind {
            ErrorKind::FrontendError(err) => err.exit_status(),
            ErrorKind::BackendError(err) => err.exit_status(),
            _ => 1,
        }
    }
}

/// One compiled candidate: its steps in execution order and how each token meets the caller.
#[derive(Clone, Debug)]
pub struct Plan {
    pub steps: Vec<Node<ExprToken>>,
    pub intents: BTreeMap<Token, Intent>,
}

impl Plan {
    pub fn op_names(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|step| !step.is_identity())
            .map(|step| step.op.name())
            .collect()
    }

    pub fn copy_count(&self) -> usize {
        let copy = OpDescriptor::copy();
        self.steps
            .iter()
            .filter(|step| step.op.descriptor().is_some_and(|op| **op == copy))
            .count()
    }
}

fn catalog() -> Result<Catalog, Error> {
    reference_catalog().map_err(|err| {
        ErrorKind::FrontendError(lincomp_frontend::error::Error::MalformedCatalog(err)).into()
    })
}

fn nothing_found(path: &Path, first_error: Option<SearchError>) -> Error {
    match first_error {
        Some(err) => ErrorKind::FrontendError(lincomp_frontend::error::Error::SearchFailed(err)),
        None => ErrorKind::NoCompilationFound(path.to_owned()),
    }
    .into()
}

pub fn handle_config(config: cli::Config, files: &mut FileCache) -> Result<(), Error> {
    let stdout = io::stdout();
    let mut dest = stdout.lock();
    match config {
        cli::Config::BuildConfig(build_config) => {
            let plans = build(&build_config, files)?;
            emit(&plans, build_config.emit, &mut dest)
        }
        cli::Config::CandidatesConfig(candidates_config) => {
            candidates(&candidates_config, files, &mut dest)
        }
    }
}

/// Searches for candidates and plans the storage of the first `config.limit` of them.
///
/// A branch of the search that fails is skipped. Its error is only reported when no candidate
/// at all is found.
pub fn build(config: &cli::BuildConfig, files: &mut FileCache) -> Result<Vec<Plan>, Error> {
    let problem = load_problem(files, &config.src_path).map_err(ErrorKind::FrontendError)?;
    let catalog = catalog()?;
    let copy = Rc::new(OpDescriptor::copy());

    let mut plans = Vec::new();
    let mut first_error = None;
    for candidate in compile_problem(&problem, &catalog, &config.options.search) {
        let comp = match candidate {
            Ok(comp) => comp,
            Err(err) => {
                warn!("skipping a search branch: {}", err);
                first_error.get_or_insert(err);
                continue;
            }
        };

        // Each plan gets its own names, so plans don't depend on how many came before them.
        let mut namer = TokenNamer::new();
        let plan = inplace_compile(&comp, &copy, &mut namer, &config.options.passes)
            .map_err(ErrorKind::BackendError)?;
        let steps = plan
            .toposort()
            .map_err(|err| ErrorKind::BackendError(err.into()))?;
        plans.push(Plan {
            intents: intents(&plan),
            steps,
        });
        if config.limit.is_some_and(|limit| plans.len() >= limit) {
            break;
        }
    }

    if plans.is_empty() {
        return Err(nothing_found(&config.src_path, first_error));
    }
    info!("planned {} candidate(s)", plans.len());
    Ok(plans)
}

pub fn emit(plans: &[Plan], format: EmitFormat, dest: &mut impl io::Write) -> Result<(), Error> {
    match format {
        EmitFormat::Text => {
            for (i, plan) in plans.iter().enumerate() {
                writeln!(dest, "plan {}:", i + 1).map_err(ErrorKind::WriteFailed)?;
                write_plan(dest, &plan.steps, &plan.intents).map_err(ErrorKind::WriteFailed)?;
            }
        }
        EmitFormat::Json => {
            let reports: Vec<PlanReport> = plans
                .iter()
                .map(|plan| PlanReport::new(&plan.steps, &plan.intents))
                .collect();
            serde_json::to_writer_pretty(&mut *dest, &reports)
                .map_err(ErrorKind::SerializeFailed)?;
            writeln!(dest).map_err(ErrorKind::WriteFailed)?;
        }
    }
    Ok(())
}

/// Lists math-level candidates, before any storage is assigned.
pub fn candidates(
    config: &cli::CandidatesConfig,
    files: &mut FileCache,
    dest: &mut impl io::Write,
) -> Result<(), Error> {
    let problem = load_problem(files, &config.src_path).map_err(ErrorKind::FrontendError)?;
    let catalog = catalog()?;

    let mut count = 0;
    let mut first_error = None;
    for candidate in compile_problem(&problem, &catalog, &config.search) {
        match candidate {
            Ok(comp) => {
                count += 1;
                let steps = comp
                    .toposort()
                    .map_err(|err| ErrorKind::BackendError(err.into()))?;
                writeln!(dest, "candidate {}:", count).map_err(ErrorKind::WriteFailed)?;
                write_candidate(dest, &steps).map_err(ErrorKind::WriteFailed)?;
                if config.limit.is_some_and(|limit| count >= limit) {
                    break;
                }
            }
            Err(err) => {
                warn!("skipping a search branch: {}", err);
                first_error.get_or_insert(err);
            }
        }
    }

    if count == 0 {
        return Err(nothing_found(&config.src_path, first_error));
    }
    Ok(())
}
