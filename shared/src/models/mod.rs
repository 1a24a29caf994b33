//! Domain models for roast imports

mod artisan;
mod roast;
mod rows;

pub use artisan::*;
pub use roast::*;
pub use rows::*;
