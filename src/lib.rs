//! Core engine for a dual-pane, cross-storage terminal file manager.
//!
//! The binary (`src/main.rs`) is a thin shell around this library: it
//! parses CLI arguments, wires up logging and persisted state, and runs
//! an [`ui::UILayerStack`] event loop. Everything that actually knows
//! about paths, listings, transfers, search, and archives lives here so
//! it can be exercised directly by tests without a terminal attached.

pub mod batch_rename;
pub mod cli;
pub mod entry;
pub mod error;
pub mod external;
pub mod fs_list;
pub mod logging;
pub mod ops;
pub mod pane;
pub mod path;
pub mod search;
pub mod state;
pub mod ui;
pub mod util;

pub use error::{Result, TfmError};
