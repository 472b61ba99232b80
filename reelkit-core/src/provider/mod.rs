// Content Provider System
//
// Two tiers:
//
// Tier 1: provider API implementations (loaded plugins, or the bundled
//   StaticCatalogProvider driven by configuration)
//   - Implement ProviderApi: test film, catalogs, filters, search, details, links
//
// Tier 2: ProviderApiRegistry
//   - Maps provider ids to live ProviderApi instances
//   - Consumed by the link resolver and the provider test runner

pub mod config;
pub mod error;
pub mod registry;
pub mod static_catalog;
pub mod traits;

pub use config::*;
pub use error::*;
pub use registry::*;
pub use traits::*;

pub use static_catalog::StaticCatalogProvider;
