pub mod analysis;
pub mod config;
pub mod constraints;
pub mod data;
pub mod defrag;
pub mod difficulty;
pub mod error;
pub mod filters;
pub mod schedule;
pub mod score;
pub mod server;
pub mod solver;
