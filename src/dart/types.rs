//! Serde types matching DART API responses.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// DART status for a normal response
pub const STATUS_OK: &str = "000";
/// DART status for "no data matched the query"
pub const STATUS_NO_DATA: &str = "013";

/// Response envelope shared by every DART endpoint.
///
/// `list` is always present, even when the upstream omits it. Pagination
/// fields only appear on list-style endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResult<T> {
  pub status: String,
  pub message: String,
  #[serde(default = "Vec::new")]
  pub list: Vec<T>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_no: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page_count: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_count: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_page: Option<u32>,
}

/// Envelope with untyped rows, as held by the cache.
pub type RawResult = ApiResult<serde_json::Value>;

/// Pagination metadata of a list-style response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  pub page_no: u32,
  pub page_count: u32,
  pub total_count: u32,
  pub total_page: u32,
}

impl<T> ApiResult<T> {
  pub fn is_empty(&self) -> bool {
    self.list.is_empty()
  }

  pub fn pagination(&self) -> Option<Pagination> {
    Some(Pagination {
      page_no: self.page_no?,
      page_count: self.page_count?,
      total_count: self.total_count?,
      total_page: self.total_page?,
    })
  }
}

impl RawResult {
  /// Convert the cached rows into the row type of the operation.
  pub fn to_typed<T: DeserializeOwned>(&self) -> serde_json::Result<ApiResult<T>> {
    let list = self
      .list
      .iter()
      .map(|row| serde_json::from_value(row.clone()))
      .collect::<serde_json::Result<Vec<T>>>()?;

    Ok(ApiResult {
      status: self.status.clone(),
      message: self.message.clone(),
      list,
      page_no: self.page_no,
      page_count: self.page_count,
      total_count: self.total_count,
      total_page: self.total_page,
    })
  }
}

/// Entry of the corporation code registry
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
  pub corp_code: String,
  pub corp_name: String,
  #[serde(default)]
  pub stock_code: String,
  #[serde(default)]
  pub modify_date: String,
}

/// A single filing in a disclosure search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureInfo {
  pub rcept_no: String,
  #[serde(default)]
  pub corp_cls: String,
  pub corp_code: String,
  pub corp_name: String,
  #[serde(default)]
  pub flr_nm: String,
  pub rcept_dt: String,
  #[serde(default)]
  pub rm: String,
  #[serde(default)]
  pub stock_code: String,
  pub report_nm: String,
}

/// One account line of a periodic report's financial statements.
///
/// DART omits different columns depending on the endpoint and the report
/// period, so every field defaults to an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialInfo {
  pub rcept_no: String,
  pub reprt_code: String,
  pub bsns_year: String,
  pub corp_code: String,
  pub sj_div: String,
  pub sj_nm: String,
  pub account_id: String,
  pub account_nm: String,
  pub account_detail: String,
  pub thstrm_nm: String,
  pub thstrm_amount: String,
  pub thstrm_add_amount: String,
  pub frmtrm_nm: String,
  pub frmtrm_amount: String,
  pub frmtrm_add_amount: String,
  pub bfefrmtrm_nm: String,
  pub bfefrmtrm_amount: String,
  pub ord: String,
  pub currency: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_list_defaults_to_empty() {
    let raw: RawResult =
      serde_json::from_str(r#"{"status":"013","message":"no data"}"#).unwrap();
    assert!(raw.list.is_empty());
    assert!(raw.is_empty());
    assert_eq!(raw.pagination(), None);
  }

  #[test]
  fn test_pagination_requires_all_fields() {
    let raw: RawResult = serde_json::from_str(
      r#"{"status":"000","message":"ok","list":[],"page_no":2,"page_count":20,"total_count":45,"total_page":3}"#,
    )
    .unwrap();
    assert_eq!(
      raw.pagination(),
      Some(Pagination {
        page_no: 2,
        page_count: 20,
        total_count: 45,
        total_page: 3,
      })
    );

    let partial: RawResult =
      serde_json::from_str(r#"{"status":"000","message":"ok","list":[],"page_no":1}"#).unwrap();
    assert_eq!(partial.pagination(), None);
  }

  #[test]
  fn test_to_typed_disclosures() {
    let raw: RawResult = serde_json::from_str(
      r#"{"status":"000","message":"ok","list":[{"rcept_no":"20240312000736","corp_cls":"Y","corp_code":"00126380","corp_name":"Samsung Electronics","flr_nm":"Samsung Electronics","rcept_dt":"20240312","rm":"","stock_code":"005930","report_nm":"Annual Report (2023.12)"}]}"#,
    )
    .unwrap();

    let typed: ApiResult<DisclosureInfo> = raw.to_typed().unwrap();
    assert_eq!(typed.list.len(), 1);
    assert_eq!(typed.list[0].corp_code, "00126380");
    assert_eq!(typed.list[0].rcept_dt, "20240312");
    assert_eq!(typed.status, STATUS_OK);
  }

  #[test]
  fn test_financial_info_tolerates_missing_columns() {
    let row: FinancialInfo =
      serde_json::from_str(r#"{"account_nm":"Revenue","thstrm_amount":"258,935,494,000,000"}"#)
        .unwrap();
    assert_eq!(row.account_nm, "Revenue");
    assert_eq!(row.frmtrm_amount, "");
  }

  #[test]
  fn test_to_typed_rejects_mismatched_rows() {
    let raw: RawResult =
      serde_json::from_str(r#"{"status":"000","message":"ok","list":[{"unexpected":1}]}"#).unwrap();
    assert!(raw.to_typed::<DisclosureInfo>().is_err());
  }
}
