//! Infrastructure layer: storage, the unit of work, the stock mutation engine
//! and the workflows built on top of them.

pub mod config;
pub mod engine;
pub mod error;
pub mod numbering;
pub mod services;
pub mod store;
pub mod unit_of_work;


pub use config::StockroomConfig;
pub use engine::{AppliedMovement, apply_movement};
pub use error::{StoreError, WorkflowError};
pub use services::{
    CatalogService, NewPurchaseOrder, OrderWorkflow, PurchaseOrderFilter, PurchaseOrderWorkflow,
    StockAlert, StockService,
};
pub use store::{ChangeSet, InMemoryStore, InventoryStore};
pub use unit_of_work::{UnitOfWork, transact};
