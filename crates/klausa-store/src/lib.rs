pub mod backend;
pub mod config;
mod error;
pub mod feed;
pub mod live;
pub mod memory;
#[cfg(feature = "http")]
pub mod rest;

pub use backend::{ContractBackend, ContractDossier, ContractQuery, load_dossier};
pub use config::BackendConfig;
pub use error::StoreError;
pub use feed::{Change, ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription, Interest};
pub use live::{LiveView, LoadState};
pub use memory::{Fixture, MemoryBackend};
#[cfg(feature = "http")]
pub use rest::RestBackend;
