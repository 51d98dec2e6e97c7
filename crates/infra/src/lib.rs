//! Infrastructure layer: config, event store, dispatch, read models, services.

pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod services;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{ConfigError, InfraConfig};
pub use services::origin_names::{OriginNameService, ServiceError};
