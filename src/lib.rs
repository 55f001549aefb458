// Library exports for py-dep-why
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod explain;
pub mod graph;
pub mod interpreter;
pub mod metadata;
pub mod normalize;
pub mod output;
pub mod pep508;
