//! Types library for the market view engine
//!
//! Value types shared by every crate that touches the live market stream:
//! the market identity, ingested trades and order-book snapshots, and the
//! numeric coercion rules applied to loosely typed transport payloads.
//!
//! # Modules
//! - `ids`: Market identity (`MarketKey`)
//! - `numeric`: Best-effort coercion of JSON values into `Decimal` / epoch-ms
//! - `trade`: Trade side and ingested trade events
//! - `book`: Order-book levels and snapshots
//! - `errors`: Error taxonomy

pub mod book;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod trade;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::book::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::trade::*;
}
