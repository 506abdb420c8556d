pub mod config;
pub mod data;
pub mod file_cache;
pub mod kernels;
pub mod pretty_print;
pub mod report_error;
pub mod util;
