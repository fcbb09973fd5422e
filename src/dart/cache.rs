//! Cache keys for DART queries.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::cache::QueryKey;

use super::endpoints::Operation;
use super::params::{WireParams, CREDENTIAL_PARAM};

/// Normalized identity of a DART query: the operation plus its wire parameters.
///
/// The credential is never part of the key, so rotating it does not split
/// the cache and it cannot leak through key descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DartQueryKey {
  pub operation: Operation,
  pub params: BTreeMap<String, String>,
}

impl DartQueryKey {
  pub fn new(operation: Operation, wire: &WireParams) -> Self {
    let params = wire
      .iter()
      .filter(|(name, _)| name.as_str() != CREDENTIAL_PARAM)
      .map(|(name, value)| (name.clone(), value.clone()))
      .collect();

    Self { operation, params }
  }

  /// Canonical `op?k=v&k=v` form. Parameters are already sorted by name,
  /// and each pair is form-encoded so `&` or `=` in a value stays inside it.
  fn canonical(&self) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
      .extend_pairs(self.params.iter())
      .finish();
    format!("{}?{}", self.operation.id(), query)
  }
}

impl QueryKey for DartQueryKey {
  fn cache_hash(&self) -> String {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(self.canonical().as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    if self.params.is_empty() {
      self.operation.id().to_string()
    } else {
      self.canonical()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dart::params::{map_params, DisclosureListOptions, QueryOptions};

  fn key_for(options: &DisclosureListOptions, credential: &str) -> DartQueryKey {
    let wire = map_params(options.operation().spec(), &options.to_raw(), credential).unwrap();
    DartQueryKey::new(options.operation(), &wire)
  }

  #[test]
  fn test_equal_queries_share_a_key() {
    let options = DisclosureListOptions {
      bgn_de: Some("20240101".into()),
      ..DisclosureListOptions::new("00126380")
    };
    let padded = DisclosureListOptions {
      bgn_de: Some(" 20240101 ".into()),
      end_de: Some(String::new()),
      ..DisclosureListOptions::new("00126380")
    };

    let a = key_for(&options, "key-a");
    let b = key_for(&padded, "key-b");
    assert_eq!(a, b);
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_different_parameters_differ() {
    let first = DisclosureListOptions {
      page_no: Some(1),
      ..DisclosureListOptions::new("00126380")
    };
    let second = DisclosureListOptions {
      page_no: Some(2),
      ..DisclosureListOptions::new("00126380")
    };
    assert_ne!(
      key_for(&first, "k").cache_hash(),
      key_for(&second, "k").cache_hash()
    );
  }

  #[test]
  fn test_separators_in_values_do_not_collide() {
    let first: WireParams = [
      ("bgn_de".to_string(), "20240101&corp_code=00126380".to_string()),
      ("corp_code".to_string(), "X".to_string()),
    ]
    .into_iter()
    .collect();
    let second: WireParams = [
      ("bgn_de".to_string(), "20240101".to_string()),
      ("corp_code".to_string(), "00126380&corp_code=X".to_string()),
    ]
    .into_iter()
    .collect();

    let a = DartQueryKey::new(Operation::DisclosureList, &first);
    let b = DartQueryKey::new(Operation::DisclosureList, &second);
    assert_ne!(a, b);
    assert_ne!(a.cache_hash(), b.cache_hash());
    assert_ne!(a.description(), b.description());
  }

  #[test]
  fn test_operation_is_part_of_identity() {
    let wire: WireParams = [("corp_code".to_string(), "00126380".to_string())]
      .into_iter()
      .collect();
    let financial = DartQueryKey::new(Operation::FinancialInfo, &wire);
    let main = DartQueryKey::new(Operation::MainInfo, &wire);
    assert_ne!(financial.cache_hash(), main.cache_hash());
  }

  #[test]
  fn test_description_never_contains_credential() {
    let key = key_for(&DisclosureListOptions::new("00126380"), "super-secret");
    assert!(!key.params.contains_key(CREDENTIAL_PARAM));
    assert_eq!(key.description(), "disclosureList?corp_code=00126380");
    assert!(!key.description().contains("super-secret"));
  }

  #[test]
  fn test_hash_is_hex_sha256() {
    let key = DartQueryKey::new(Operation::CompanyList, &WireParams::new());
    let hash = key.cache_hash();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(key.description(), "companyList");
  }
}
