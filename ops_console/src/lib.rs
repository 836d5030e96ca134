//! Client library behind the Project Tauntaun operations console.
//!
//! The binary wires these modules to a terminal. Integration tests drive the
//! gateway, bootstrap, and stores directly against a live mission server.

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod gateway;
pub mod selection;
pub mod shell;
pub mod stores;
pub mod ui;

pub use bootstrap::{
    run_bootstrap, Bootstrap, BootstrapConfig, BootstrapError, ConnectionFlag, InitStep,
    InitializationStatus,
};
pub use config::{resolve_port, DEFAULT_PORT};
pub use gateway::{Gateway, GatewayError};
pub use selection::{resolve, CommanderSelection, GroupClick, ResolvedSelection, Selection};
pub use shell::{shell_view, ShellView};
pub use stores::{MissionStore, ReadyWorld, SessionStore, StaticDataStore, StoreError, WorldState};
