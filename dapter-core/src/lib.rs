//! Adapter registry and dispatch core.
//!
//! Record types convert to and from external representations through
//! pluggable format adapters:
//! - [`Adapter`] / [`AsyncAdapter`]: the plugin contracts
//! - [`KeyedRegistry`]: identifier → plugin storage, shared by every plugin family
//! - [`RegistryTable`]: one registry per record type, with explicit inheritance
//! - [`Adaptable`] / [`AsyncAdaptable`]: `adapt_to` / `adapt_from` on record types
//! - [`AdapterError`]: the error taxonomy every failure is normalized into
//!
//! The core knows nothing about any concrete format; see `dapter-formats`
//! for the built-in ones.

mod adaptable;
mod adapter;
mod async_dispatch;
mod dispatch;
mod error;
mod lenient;
mod options;
mod record;
mod records;
mod registry;

pub use adaptable::Adaptable;
pub use adapter::{
    Adapter, AdapterRegistry, AdapterTable, AsyncAdapter, AsyncAdapterRegistry,
};
pub use async_dispatch::{AsyncAdaptable, AsyncAdapterTable};
pub use dispatch::{Direction, normalize};
pub use error::{
    AdapterError, AdapterResult, BoxError, Context, ContextValue, ErrorKind, excerpt,
};
pub use options::Options;
pub use record::{Record, short_type_name};
pub use records::{Conversion, Records, Representation};
pub use registry::{KeyedRegistry, Registrable, RegistryTable};
