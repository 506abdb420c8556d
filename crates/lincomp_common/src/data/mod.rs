pub mod computation;
pub mod condition;
pub mod descriptor;
pub mod expr;
pub mod token;
