//! Translation of caller options into DART query parameters.
//!
//! Callers describe a request with an option struct per operation. The
//! struct is flattened into [`RawParams`] keyed by the caller-facing
//! (camelCase) names, then [`map_params`] validates it against the
//! registry and produces the snake_case [`WireParams`] sent upstream.

use std::collections::BTreeMap;

use super::endpoints::{EndpointSpec, Operation};
use super::error::DartError;

/// Name of the query parameter carrying the API credential.
pub const CREDENTIAL_PARAM: &str = "crtfc_key";

/// A caller-supplied parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
  Text(String),
  Number(u32),
}

impl ParamValue {
  /// Wire form of the value, or `None` if it should be treated as not supplied.
  fn to_wire(&self) -> Option<String> {
    match self {
      ParamValue::Text(text) => {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
      }
      ParamValue::Number(n) => Some(n.to_string()),
    }
  }
}

impl From<&str> for ParamValue {
  fn from(value: &str) -> Self {
    ParamValue::Text(value.to_string())
  }
}

impl From<String> for ParamValue {
  fn from(value: String) -> Self {
    ParamValue::Text(value)
  }
}

impl From<u32> for ParamValue {
  fn from(value: u32) -> Self {
    ParamValue::Number(value)
  }
}

/// Caller-named parameters. A missing key means "not supplied".
pub type RawParams = BTreeMap<&'static str, ParamValue>;

/// Wire-named parameters, ordered so equal inputs produce equal output.
pub type WireParams = BTreeMap<String, String>;

/// Translate a caller parameter name to its wire form (`bgnDe` -> `bgn_de`).
pub fn to_snake_case(name: &str) -> String {
  let mut out = String::with_capacity(name.len() + 4);
  for ch in name.chars() {
    if ch.is_ascii_uppercase() {
      out.push('_');
      out.push(ch.to_ascii_lowercase());
    } else {
      out.push(ch);
    }
  }
  out
}

/// Validate caller parameters against the registry and produce wire parameters.
///
/// Absent or blank optional values are omitted entirely. A missing required
/// value fails with [`DartError::MissingRequiredParameter`] naming the first
/// such field in registry order. The credential is always appended.
pub fn map_params(
  spec: &EndpointSpec,
  raw: &RawParams,
  credential: &str,
) -> Result<WireParams, DartError> {
  let mut wire = WireParams::new();

  for param in spec.params {
    match raw.get(param.name).and_then(ParamValue::to_wire) {
      Some(value) => {
        wire.insert(to_snake_case(param.name), value);
      }
      None if param.required => {
        return Err(DartError::MissingRequiredParameter {
          operation: spec.id,
          field: param.name,
        });
      }
      None => {}
    }
  }

  for name in raw.keys() {
    if spec.param(name).is_none() {
      tracing::debug!(operation = spec.id, param = *name, "ignoring unrecognized parameter");
    }
  }

  wire.insert(CREDENTIAL_PARAM.to_string(), credential.to_string());
  Ok(wire)
}

/// Option structs for the domain operations.
pub trait QueryOptions {
  fn operation(&self) -> Operation;

  /// Flatten into caller-named parameters, leaving out fields that are `None`.
  fn to_raw(&self) -> RawParams;
}

fn put(raw: &mut RawParams, name: &'static str, value: Option<impl Into<ParamValue>>) {
  if let Some(value) = value {
    raw.insert(name, value.into());
  }
}

/// The corporation code registry takes no parameters.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompanyListOptions;

#[cfg(test)]
impl QueryOptions for CompanyListOptions {
  fn operation(&self) -> Operation {
    Operation::CompanyList
  }

  fn to_raw(&self) -> RawParams {
    RawParams::new()
  }
}

/// Disclosure search for one corporation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisclosureListOptions {
  pub corp_code: String,
  /// Search start date, `YYYYMMDD`
  pub bgn_de: Option<String>,
  /// Search end date, `YYYYMMDD`
  pub end_de: Option<String>,
  /// `Y` to only return the latest amended report
  pub last_reprt_at: Option<String>,
  pub pblntf_detail_ty: Option<String>,
  pub pblntf_detail_ty_cd: Option<String>,
  pub corp_cls: Option<String>,
  pub sort: Option<String>,
  /// Sort direction, `asc` or `desc`
  pub sort_mn: Option<String>,
  pub page_no: Option<u32>,
  pub page_count: Option<u32>,
}

impl DisclosureListOptions {
  pub fn new(corp_code: impl Into<String>) -> Self {
    Self {
      corp_code: corp_code.into(),
      ..Self::default()
    }
  }
}

impl QueryOptions for DisclosureListOptions {
  fn operation(&self) -> Operation {
    Operation::DisclosureList
  }

  fn to_raw(&self) -> RawParams {
    let mut raw = RawParams::new();
    raw.insert("corpCode", self.corp_code.clone().into());
    put(&mut raw, "bgnDe", self.bgn_de.clone());
    put(&mut raw, "endDe", self.end_de.clone());
    put(&mut raw, "lastReprtAt", self.last_reprt_at.clone());
    put(&mut raw, "pblntfDetailTy", self.pblntf_detail_ty.clone());
    put(&mut raw, "pblntfDetailTyCd", self.pblntf_detail_ty_cd.clone());
    put(&mut raw, "corpCls", self.corp_cls.clone());
    put(&mut raw, "sort", self.sort.clone());
    put(&mut raw, "sortMn", self.sort_mn.clone());
    put(&mut raw, "pageNo", self.page_no);
    put(&mut raw, "pageCount", self.page_count);
    raw
  }
}

/// Key accounts of a periodic report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinancialInfoOptions {
  pub corp_code: String,
  /// Business year, `YYYY`
  pub bsns_year: String,
  pub reprt_code: String,
  pub fs_div: Option<String>,
  pub sj_div: Option<String>,
}

impl QueryOptions for FinancialInfoOptions {
  fn operation(&self) -> Operation {
    Operation::FinancialInfo
  }

  fn to_raw(&self) -> RawParams {
    let mut raw = RawParams::new();
    raw.insert("corpCode", self.corp_code.clone().into());
    raw.insert("bsnsYear", self.bsns_year.clone().into());
    raw.insert("reprtCode", self.reprt_code.clone().into());
    put(&mut raw, "fsDiv", self.fs_div.clone());
    put(&mut raw, "sjDiv", self.sj_div.clone());
    raw
  }
}

/// Full financial statements of a periodic report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MainInfoOptions {
  pub corp_code: String,
  pub bsns_year: String,
  pub reprt_code: String,
  pub fs_div: Option<String>,
}

impl QueryOptions for MainInfoOptions {
  fn operation(&self) -> Operation {
    Operation::MainInfo
  }

  fn to_raw(&self) -> RawParams {
    let mut raw = RawParams::new();
    raw.insert("corpCode", self.corp_code.clone().into());
    raw.insert("bsnsYear", self.bsns_year.clone().into());
    raw.insert("reprtCode", self.reprt_code.clone().into());
    put(&mut raw, "fsDiv", self.fs_div.clone());
    raw
  }
}
