use crate::data::computation::MalformedGraph;
use crate::data::descriptor::Catalog;

pub mod blas;
pub mod lapack;
pub mod toy;

/// The LAPACK solvers followed by the BLAS kernels.
pub fn reference_catalog() -> Result<Catalog, MalformedGraph> {
    Catalog::new(lapack::descriptors().into_iter().chain(blas::descriptors()))
}
