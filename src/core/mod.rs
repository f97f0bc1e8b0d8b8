//! Core module - store, configuration, and the shared request/response plumbing

pub mod collection;
pub mod config;
pub mod crud;
pub mod dates;
pub mod envelope;
pub mod error;
pub mod export;
pub mod fields;
pub mod logging;
pub mod paginate;
pub mod params;
pub mod project;
pub mod store;

pub use collection::Collection;
pub use config::Config;
pub use envelope::Envelope;
pub use error::{ImsError, ImsResult};
pub use paginate::{PageInfo, Paginator};
pub use params::{ParamError, ParamTable};
pub use project::{Project, ProjectError};
pub use store::{DocumentStore, Filter, WriteOutcome};
