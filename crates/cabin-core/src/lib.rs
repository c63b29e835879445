//! cabin-core library.
//!
//! A cabin-rental portal whose changes never leave the machine: static
//! fixture JSON is the record of truth, and every mutation lands in a local
//! overlay that is merged back in on read.
//!
//! - [`fixtures`]: read-only fixture store and query layer
//! - [`overlay`]: the generic created/updated/deleted overlay
//! - [`store`]: per-kind overlay persistence and mutation handlers
//! - [`session`]: the simulated actor and the route gate
//! - [`portal`]: screen-level views built from all of the above
//!
//! # Conventions
//!
//! - **Errors**: `PortalError` for library paths, `anyhow::Result` for config loading.
//! - **Logging**: `tracing` macros (`info!` for mutations, `debug!` for reads,
//!   `warn!` for discarded data).

pub mod config;
pub mod error;
pub mod fixtures;
pub mod lock;
pub mod model;
pub mod overlay;
pub mod portal;
pub mod session;
pub mod storage;
pub mod store;
pub mod time;

pub use error::{ErrorCode, PortalError, Result};
pub use portal::Portal;
