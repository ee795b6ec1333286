//! Inventory domain module (stock records and the movement log).
//!
//! Pure domain rules only: parsing and validating movement requests and
//! applying signed deltas to a per-SKU record. Storage lives in the
//! infrastructure crate.

pub mod movement;
pub mod stock;

pub use movement::{MovementType, StockMovement, StockUpdate, StockUpdateRequest};
pub use stock::StockRecord;
