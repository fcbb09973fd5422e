//! OpenDART API access: endpoint registry, parameter mapping, request
//! execution and the cached client built on top of them.

pub mod cache;
pub mod cached_client;
pub mod client;
pub mod codes;
pub mod endpoints;
pub mod error;
pub mod params;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use cached_client::{CachedDartClient, PreparedQuery};
pub use endpoints::Operation;
pub use error::DartError;
pub use params::{DisclosureListOptions, FinancialInfoOptions, MainInfoOptions};
pub use types::{ApiResult, DisclosureInfo, FinancialInfo};
