// src/lib.rs — Library root for reviser

pub mod agents;
pub mod cli;
pub mod core;
pub mod infra;
pub mod provider;
pub mod search;
pub mod util;
