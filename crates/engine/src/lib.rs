// SPDX-License-Identifier: MIT

//! Session orchestration: the components that sit between the Frontdoor
//! and the adapters/storage layers (spec §4).

pub mod error;
pub mod executor_interface;
pub mod registry;
pub mod rich_bridge;
pub mod session_manager;
pub mod terminal_bridge;

pub use error::EngineError;
pub use executor_interface::{ExecutorInterface, LocalExecutor, RemoteExecutor};
pub use registry::ExecutorRegistry;
pub use rich_bridge::{BridgeToClient, ClientToBridge, RichBridgeHandle};
pub use session_manager::SessionManager;
pub use terminal_bridge::{ClientId, TerminalBridge};
