//! Business logic services for roast import and backfill

pub mod backfill;
pub mod import;

pub use backfill::{BackfillItemError, BackfillReport, BackfillService};
pub use import::{ImportReport, ImportService};
