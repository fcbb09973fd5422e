//! DART code tables with display labels.

/// A code accepted by a DART parameter and its human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code {
  pub value: &'static str,
  pub label: &'static str,
}

const fn code(value: &'static str, label: &'static str) -> Code {
  Code { value, label }
}

/// Detailed disclosure types (`pblntf_detail_ty`)
pub const DISCLOSURE_TYPES: &[Code] = &[
  code("A001", "Annual report"),
  code("A002", "Semi-annual report"),
  code("A003", "Quarterly report"),
  code("B001", "Major events report"),
  code("C001", "Other"),
];

/// Periodic report codes (`reprt_code`)
pub const REPORT_CODES: &[Code] = &[
  code("11011", "Annual report"),
  code("11012", "Semi-annual report"),
  code("11013", "Q1 report"),
  code("11014", "Q3 report"),
];

/// Corporation classes (`corp_cls`)
pub const CORP_CLASSES: &[Code] = &[
  code("Y", "KOSPI"),
  code("K", "KOSDAQ"),
  code("N", "KONEX"),
  code("E", "Other"),
];

/// Sort keys for disclosure search (`sort`)
pub const SORT_KEYS: &[Code] = &[
  code("date", "Receipt date"),
  code("crp", "Company name"),
  code("rpt", "Report name"),
];

/// Consolidated vs separate statements (`fs_div`)
pub const FS_DIVS: &[Code] = &[
  code("CFS", "Consolidated"),
  code("OFS", "Separate"),
];

/// Statement kinds (`sj_div`)
pub const SJ_DIVS: &[Code] = &[
  code("BS", "Balance sheet"),
  code("IS", "Income statement"),
  code("CF", "Cash flow statement"),
  code("SCE", "Statement of changes in equity"),
];

/// Find the label for a code value within a table.
pub fn label_for(table: &[Code], value: &str) -> Option<&'static str> {
  table.iter().find(|c| c.value == value).map(|c| c.label)
}
