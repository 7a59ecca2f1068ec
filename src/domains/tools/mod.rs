//! Tools domain module.
//!
//! Tool catalogs, tenant/agent selection filtering, and per-request dispatch.
//!
//! ## Architecture
//!
//! - `definitions/` - integration definitions (one file per integration)
//! - `catalog.rs` - catalog registration, deny-by-default filtering
//! - `dispatch.rs` - dispatch tables built from the filtered set only
//! - `selection.rs` - read-only agent tool selections
//! - `error.rs` - tool-specific error types
//!
//! ## Adding an Integration
//!
//! 1. Create a new file in `definitions/` (e.g. `my_backend.rs`)
//! 2. Define the tool params, `execute()`, and a `ToolHandler` impl per tool
//! 3. Assemble descriptor + catalog in an `integration()` builder
//! 4. Add the builder to `definitions::default_integrations()`

pub mod catalog;
pub mod definitions;
mod dispatch;
mod error;
mod selection;

pub use catalog::{
    SelectionReport, ToolCallEnv, ToolCatalog, ToolDescriptor, ToolHandler, ToolMetadata,
};
pub use dispatch::{DispatchTable, ToolCallOutput};
pub use error::ToolError;
pub use selection::{AgentToolSelection, MemorySelectionStore, SelectionStore};
