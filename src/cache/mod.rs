//! Cache storage backends.
//!
//! Both backends implement [`CacheStorage`]:
//! - Entities are upserted by `(entity_type, cache_key)`
//! - Each entity remembers the page it arrived on and its arrival order
//! - Pages and single entities can be read back with their cache time

mod memory;
mod storage;
mod traits;

pub use memory::MemoryStorage;
pub use storage::SqliteStorage;
pub use traits::{CacheStorage, CachedEntity, CachedPage, Cacheable};
