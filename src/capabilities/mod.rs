//! # Capability Catalog
//!
//! Everything the Discord client surface exposes, as classified symbols.
//!
//! ## Sources
//!
//! 1. The curated runtime table in [`table`]: classes with their instance
//!    and static methods, top-level functions and declarations. Callable
//!    entries carry a handler and are invokable.
//! 2. Declared-only YAML manifests found under `catalog.manifest_paths`.
//!    Their symbols are discoverable but never invokable.
//!
//! Each symbol gets a [`BehaviorClass`] from [`classify`], which the policy
//! engine consumes as advisory risk metadata.

pub mod catalog;
pub mod classify;
pub mod symbol;
pub mod table;

pub use catalog::{
    CapabilityCatalog, CatalogError, CatalogService, RuntimeEntry, SortOrder, SymbolFilter, SymbolPage,
};
pub use classify::classify;
pub use symbol::{BehaviorClass, CapabilitySymbol, PackageDescriptor, SymbolId, SymbolKind, SymbolOrigin};
pub use table::Binding;
