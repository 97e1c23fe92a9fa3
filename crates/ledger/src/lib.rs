//! Stock ledger domain module.
//!
//! Append-only movement records plus the rules that turn a movement request into
//! a signed stock change. Pure domain logic: storage and locking live in infra.

pub mod movement;

pub use movement::{
    MovementId, MovementQuery, MovementRequest, MovementType, ReferenceType, StockDirection,
    StockMovement, classify, verify_chain,
};
