//! Static registry of DART operations.
//!
//! Each operation maps to a fixed upstream path, the caller-facing
//! parameters it recognizes, and the cache lifetime of its results.

use std::time::Duration;

use crate::cache::CachePolicy;

use super::error::DartError;

const fn minutes(n: u64) -> Duration {
  Duration::from_secs(n * 60)
}

const fn hours(n: u64) -> Duration {
  minutes(n * 60)
}

/// Logical DART operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
  /// Corporation code registry
  CompanyList,
  /// Disclosure (filing) search
  DisclosureList,
  /// Key accounts from a periodic report
  FinancialInfo,
  /// Full financial statements from a periodic report
  MainInfo,
}

impl Operation {
  pub const ALL: [Operation; 4] = [
    Operation::CompanyList,
    Operation::DisclosureList,
    Operation::FinancialInfo,
    Operation::MainInfo,
  ];

  /// Stable identifier used in keys and logs.
  pub fn id(self) -> &'static str {
    self.spec().id
  }

  pub fn spec(self) -> &'static EndpointSpec {
    match self {
      Operation::CompanyList => &COMPANY_LIST,
      Operation::DisclosureList => &DISCLOSURE_LIST,
      Operation::FinancialInfo => &FINANCIAL_INFO,
      Operation::MainInfo => &MAIN_INFO,
    }
  }
}

impl std::fmt::Display for Operation {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.id())
  }
}

/// A recognized parameter, named the way callers name it (camelCase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
  pub name: &'static str,
  pub required: bool,
}

impl ParamSpec {
  const fn required(name: &'static str) -> Self {
    Self {
      name,
      required: true,
    }
  }

  const fn optional(name: &'static str) -> Self {
    Self {
      name,
      required: false,
    }
  }
}

#[derive(Debug)]
pub struct EndpointSpec {
  pub operation: Operation,
  pub id: &'static str,
  pub path: &'static str,
  pub params: &'static [ParamSpec],
  pub policy: CachePolicy,
}

impl EndpointSpec {
  pub fn required(&self) -> impl Iterator<Item = &'static ParamSpec> {
    let params: &'static [ParamSpec] = self.params;
    params.iter().filter(|p| p.required)
  }

  pub fn optional(&self) -> impl Iterator<Item = &'static ParamSpec> {
    let params: &'static [ParamSpec] = self.params;
    params.iter().filter(|p| !p.required)
  }

  pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
    self.params.iter().find(|p| p.name == name)
  }
}

static COMPANY_LIST: EndpointSpec = EndpointSpec {
  operation: Operation::CompanyList,
  id: "companyList",
  path: "/corpCode.xml",
  params: &[],
  // Reference data: the company registry changes rarely
  policy: CachePolicy::new(hours(1), hours(24)),
};

static DISCLOSURE_LIST: EndpointSpec = EndpointSpec {
  operation: Operation::DisclosureList,
  id: "disclosureList",
  path: "/list.json",
  params: &[
    ParamSpec::required("corpCode"),
    ParamSpec::optional("bgnDe"),
    ParamSpec::optional("endDe"),
    ParamSpec::optional("lastReprtAt"),
    ParamSpec::optional("pblntfDetailTy"),
    ParamSpec::optional("pblntfDetailTyCd"),
    ParamSpec::optional("corpCls"),
    ParamSpec::optional("sort"),
    ParamSpec::optional("sortMn"),
    ParamSpec::optional("pageNo"),
    ParamSpec::optional("pageCount"),
  ],
  policy: CachePolicy::new(minutes(5), minutes(30)),
};

static FINANCIAL_INFO: EndpointSpec = EndpointSpec {
  operation: Operation::FinancialInfo,
  id: "financialInfo",
  path: "/fnlttSinglAcnt.json",
  params: &[
    ParamSpec::required("corpCode"),
    ParamSpec::required("bsnsYear"),
    ParamSpec::required("reprtCode"),
    ParamSpec::optional("fsDiv"),
    ParamSpec::optional("sjDiv"),
  ],
  policy: CachePolicy::new(minutes(10), hours(1)),
};

static MAIN_INFO: EndpointSpec = EndpointSpec {
  operation: Operation::MainInfo,
  id: "mainInfo",
  path: "/fnlttSinglAcntAll.json",
  params: &[
    ParamSpec::required("corpCode"),
    ParamSpec::required("bsnsYear"),
    ParamSpec::required("reprtCode"),
    ParamSpec::optional("fsDiv"),
  ],
  policy: CachePolicy::new(minutes(10), hours(1)),
};

/// Look up an operation by its string identifier.
pub fn lookup(id: &str) -> Result<&'static EndpointSpec, DartError> {
  Operation::ALL
    .iter()
    .map(|op| op.spec())
    .find(|spec| spec.id == id)
    .ok_or_else(|| DartError::UnknownOperation(id.to_string()))
}
