use super::{AdStatus, Condition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort key for the listing view
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    Popular,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::PriceLow => "price-low",
            Self::PriceHigh => "price-high",
            Self::Popular => "popular",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Newest => "Newest First",
            Self::Oldest => "Oldest First",
            Self::PriceLow => "Price: Low to High",
            Self::PriceHigh => "Price: High to Low",
            Self::Popular => "Most Popular",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "popular" => Ok(Self::Popular),
            other => Err(format!(
                "unknown sort '{other}' (expected newest, oldest, price-low, price-high or popular)"
            )),
        }
    }
}

/// Transient listing filter. Every field is optional; unset fields do not
/// constrain the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AdFilter {
    pub fn search_term(&self) -> Option<&str> {
        non_blank(&self.search)
    }

    pub fn category_name(&self) -> Option<&str> {
        non_blank(&self.category)
    }

    pub fn location_term(&self) -> Option<&str> {
        non_blank(&self.location)
    }

    /// True when any criterion is set to something other than empty or zero.
    pub fn has_active_filters(&self) -> bool {
        let price_set = |p: Option<f64>| p.is_some_and(|p| p != 0.0);
        self.search_term().is_some()
            || self.category_name().is_some()
            || self.location_term().is_some()
            || price_set(self.min_price)
            || price_set(self.max_price)
            || self.status.is_some()
            || self.condition.is_some()
            || self.sort_by.is_some()
    }
}
