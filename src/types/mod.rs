//! Shared data structures for the MPT consistency engine
//!
//! - `Table`: columnar record store used for location sets and check results
//! - Location ids, CAW codes, geometry and CRS
//! - Id-map entries and hist-tag records
//! - `YYYYMMDD` and hist-tag date handling

mod table;
mod location;
mod idmap;
pub mod dates;

pub use table::*;
pub use location::*;
pub use idmap::*;
pub use dates::EndDate;
