//! IPO listing records and search over them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle stage of an offering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpoStatus {
  Live,
  Upcoming,
  Listed,
}

/// Board the offering is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpoCategory {
  Mainline,
  Sme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialHighlights {
  pub revenue: String,
  pub profit: String,
  pub debt_to_equity: String,
  pub roe: String,
}

/// A single IPO listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ipo {
  pub id: String,
  pub company_name: String,
  pub symbol: String,
  #[serde(default)]
  pub logo: String,
  pub price_range: String,
  pub lot_size: u32,
  pub issue_size: String,
  pub open_date: String,
  pub close_date: String,
  pub listing_date: String,
  pub status: IpoStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subscription_rate: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub listing_gain: Option<f64>,
  #[serde(default)]
  pub sector: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub financial_highlights: FinancialHighlights,
  #[serde(default)]
  pub lead_managers: Vec<String>,
  #[serde(default)]
  pub registrar: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<IpoCategory>,
}

impl fmt::Display for IpoStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      IpoStatus::Live => "live",
      IpoStatus::Upcoming => "upcoming",
      IpoStatus::Listed => "listed",
    };
    f.pad(s)
  }
}

impl FromStr for IpoStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "live" => Ok(IpoStatus::Live),
      "upcoming" => Ok(IpoStatus::Upcoming),
      "listed" => Ok(IpoStatus::Listed),
      other => Err(format!("unknown IPO status: {}", other)),
    }
  }
}

impl fmt::Display for IpoCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IpoCategory::Mainline => f.pad("mainline"),
      IpoCategory::Sme => f.pad("sme"),
    }
  }
}

impl FromStr for IpoCategory {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "mainline" => Ok(IpoCategory::Mainline),
      "sme" => Ok(IpoCategory::Sme),
      other => Err(format!("unknown IPO category: {}", other)),
    }
  }
}

/// Criteria for narrowing a listing. Empty criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct IpoFilter {
  pub status: Option<IpoStatus>,
  pub category: Option<IpoCategory>,
  /// Case-insensitive text matched against name, symbol, sector and description
  pub query: Option<String>,
}

impl IpoFilter {
  pub fn matches(&self, ipo: &Ipo) -> bool {
    if let Some(category) = self.category {
      if ipo.category != Some(category) {
        return false;
      }
    }

    if let Some(status) = self.status {
      if ipo.status != status {
        return false;
      }
    }

    match self.query.as_deref().map(str::trim) {
      Some(q) if !q.is_empty() => {
        let q = q.to_lowercase();
        [&ipo.company_name, &ipo.symbol, &ipo.sector, &ipo.description]
          .iter()
          .any(|field| field.to_lowercase().contains(&q))
      }
      _ => true,
    }
  }

  /// Listings matching this filter, in their original order.
  pub fn apply<'a>(&self, ipos: &'a [Ipo]) -> Vec<&'a Ipo> {
    ipos.iter().filter(|ipo| self.matches(ipo)).collect()
  }
}

pub fn find_by_id<'a>(ipos: &'a [Ipo], id: &str) -> Option<&'a Ipo> {
  ipos.iter().find(|ipo| ipo.id == id)
}
