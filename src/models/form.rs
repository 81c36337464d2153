use super::{AdStatus, Condition};
use crate::error::{ClassifiedsError, Result};
use serde::{Deserialize, Serialize};

/// Input for posting a new ad. The server assigns the id, the dates and
/// the initial view count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewAd {
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub original_price: Option<f64>,
    pub status: AdStatus,
    pub images: Vec<String>,
    pub is_featured: bool,
    pub is_looking_for: bool,
    pub created_by: String,
    pub location: Option<String>,
    pub condition: Option<Condition>,
    pub tags: Vec<String>,
}

impl Default for NewAd {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            category: String::new(),
            price: 0.0,
            original_price: None,
            status: AdStatus::Active,
            images: Vec::new(),
            is_featured: false,
            is_looking_for: false,
            created_by: String::new(),
            location: None,
            condition: Some(Condition::Good),
            tags: Vec::new(),
        }
    }
}

impl NewAd {
    /// Apply the posting rules: required text fields, a non-negative price,
    /// and an original price (when given) above the asking price.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.category.trim().is_empty()
        {
            return Err(ClassifiedsError::Validation(
                "Please fill in all required fields".to_string(),
            ));
        }

        if self.price < 0.0 || self.price.is_nan() {
            return Err(ClassifiedsError::Validation(
                "Price cannot be negative".to_string(),
            ));
        }

        if let Some(original) = self.original_price {
            if original > 0.0 && original <= self.price {
                return Err(ClassifiedsError::Validation(
                    "Original price must be greater than current price".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Add a trimmed tag. Blank and duplicate tags are ignored; returns
    /// whether the tag was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) {
        self.tags.retain(|t| t != tag);
    }
}

/// Partial update of an ad; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub status: Option<AdStatus>,
    pub images: Option<Vec<String>>,
    pub view_count: Option<u64>,
    pub is_featured: Option<bool>,
    pub is_looking_for: Option<bool>,
    pub location: Option<String>,
    pub condition: Option<Condition>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSavedSearch {
    pub user_id: String,
    pub name: String,
    pub query: String,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub from_user_id: String,
    pub to_user_id: String,
    pub ad_id: String,
    pub subject: String,
    pub content: String,
}

/// Format a price as US dollars with thousands separators and at most two
/// fraction digits, e.g. `$1,200`, `$12.5`, `$0.99`.
pub fn format_price(price: f64) -> String {
    let cents = (price.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if price < 0.0 && cents > 0 { "-" } else { "" };
    if fraction == 0 {
        format!("{sign}${grouped}")
    } else {
        let fraction = format!("{fraction:02}");
        format!("{sign}${grouped}.{}", fraction.trim_end_matches('0'))
    }
}
