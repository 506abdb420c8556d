use crate::resolve;
use crate::rewrite::SearchError;
use lincomp_common::data::computation::MalformedGraph;
use lincomp_common::file_cache::FileCache;
use lincomp_common::report_error::Reportable;
use std::io;

#[derive(Debug)]
pub enum Error {
    ResolveFailed(resolve::Error),
    SearchFailed(SearchError),
    MalformedCatalog(MalformedGraph),
}

impl Reportable for Error {
    fn report(&self, dest: &mut impl io::Write, files: &FileCache) -> io::Result<()> {
        use Error::*;

        match self {
            ResolveFailed(err) => err.report(dest, files),
            SearchFailed(err) => writeln!(dest, "Search failed: {}", err),
            MalformedCatalog(err) => writeln!(dest, "Malformed operation catalog: {}", err),
        }
    }

    fn exit_status(&self) -> i32 {
        match self {
            Error::ResolveFailed(err) => err.exit_status(),
            Error::SearchFailed(_) | Error::MalformedCatalog(_) => 1,
        }
    }
}
