#[macro_use]
pub mod lines;
pub mod name_gen;
