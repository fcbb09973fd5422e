//! In-memory result cache with stale-while-revalidate semantics.
//!
//! This module is independent of DART specifics. It provides:
//! - A per-key lifecycle of Empty, Fresh and Stale driven by a [`CachePolicy`]
//! - Lazy expiry, checked on access and swept on every store
//! - Coalescing of concurrent fetches for the same key
//! - A generation guard so an invalidated fetch never writes its result

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, CachedEntry, MemoryStorage, NoopStorage};
pub use traits::{CachePolicy, CacheResult, CacheSource, QueryKey};
