//! Hot-reloadable, hierarchical commands for chat bots.
//!
//! A [`Command`] is built from a [`RawDefinition`], validated against a
//! [`Validator`] and can hold any number of subcommands. Its definition can
//! be fetched again from a [`DefinitionSource`](source::DefinitionSource)
//! at runtime and swapped in place using a [`Reloader`].
pub mod builtin;
pub mod command;
pub mod config;
pub mod definition;
pub mod error;
pub mod executor;
pub mod handler;
pub mod help;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod reload;
pub mod router;
pub mod source;
pub mod validate;

pub use command::{Command, CommandSnapshot};
pub use config::{Config, PermissionScale};
pub use definition::{Callable, Meta, RawDefinition};
pub use error::{Error, Result};
pub use executor::Executor;
pub use handler::CommandSet;
pub use model::{Context, Invocation, Message, Override};
pub use registry::{RegistryError, Removed};
pub use reload::{ReloadReport, Reloader};
pub use validate::{Metadata, ValidationError, Validator};
