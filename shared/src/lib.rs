//! Roast import pipeline shared by the backend and the browser (via WASM)
//!
//! Parses roaster-logger exports, normalizes temperatures, resolves roast
//! milestones, computes phase percentages and decomposes an import into the
//! rows the roast-tracking store expects. Everything here is pure.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
