use lincomp_common::data::computation::MalformedGraph;
use lincomp_common::data::expr::Expr;
use lincomp_common::data::token::Token;
use lincomp_common::file_cache;
use lincomp_common::report_error::Reportable;
use std::io;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Malformed(#[from] MalformedGraph),
    #[error(
        "'{reader}' expects token '{token}' to hold {expected}, but it was overwritten with {found}"
    )]
    AliasConflict {
        token: Token,
        reader: String,
        expected: Expr,
        found: Expr,
    },
}

impl Reportable for Error {
    fn report(&self, dest: &mut impl io::Write, _files: &file_cache::FileCache) -> io::Result<()> {
        use Error::*;

        match self {
            Malformed(err) => writeln!(dest, "Internal error, malformed computation: {}", err),
            AliasConflict { .. } => {
                writeln!(dest, "Internal error, unsafe in-place plan: {}", self)
            }
        }
    }

    fn exit_status(&self) -> i32 {
        // Both cases are compiler bugs rather than problems with the input.
        101
    }
}
