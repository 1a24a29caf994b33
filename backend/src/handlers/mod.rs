//! HTTP request handlers

pub mod health;
pub mod roasts;

pub use health::health_check;
pub use roasts::{clear_roast_data, get_roast, import_roast, reimport_roast};
