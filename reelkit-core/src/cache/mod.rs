pub mod key;
pub mod links;
pub mod repository;

pub use key::CacheKey;
pub use links::CachedLinks;
pub use repository::{CachedLinksRepository, CurrentCache, InMemoryCachedLinksRepository};
