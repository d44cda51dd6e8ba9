#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod flake;
pub mod generate;
pub mod graph;
pub mod lookup;
pub mod util;
