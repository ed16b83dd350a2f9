pub mod domain;
pub mod extract;
pub mod inference;
pub mod names;
pub mod patterns;
