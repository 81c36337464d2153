//! Client-side filtering, sorting and sectioning of the ad collection.

mod favorites;

pub use favorites::FavoriteSet;

use crate::models::{AdFilter, ClassifiedAd, SortBy};
use std::cmp::Ordering;

fn matches_search(ad: &ClassifiedAd, needle: &str) -> bool {
    ad.title.to_lowercase().contains(needle)
        || ad.description.to_lowercase().contains(needle)
        || ad.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
}

/// Apply `filter` to `ads`: search, category, status, condition, price
/// bounds and location, then a stable sort on the selected key.
pub fn filter_ads(ads: &[ClassifiedAd], filter: &AdFilter) -> Vec<ClassifiedAd> {
    let search = filter.search_term().map(str::to_lowercase);
    let location = filter.location_term().map(str::to_lowercase);

    let mut filtered: Vec<ClassifiedAd> = ads
        .iter()
        .filter(|ad| search.as_deref().map_or(true, |s| matches_search(ad, s)))
        .filter(|ad| filter.category_name().map_or(true, |c| ad.category == c))
        .filter(|ad| filter.status.map_or(true, |s| ad.status == s))
        .filter(|ad| filter.condition.map_or(true, |c| ad.condition == Some(c)))
        .filter(|ad| filter.min_price.map_or(true, |min| ad.price >= min))
        .filter(|ad| filter.max_price.map_or(true, |max| ad.price <= max))
        .filter(|ad| {
            location.as_deref().map_or(true, |needle| {
                ad.location
                    .as_deref()
                    .is_some_and(|l| l.to_lowercase().contains(needle))
            })
        })
        .cloned()
        .collect();

    sort_ads(&mut filtered, filter.sort_by.unwrap_or_default());
    filtered
}

/// Stable sort, so ties keep their incoming order.
pub fn sort_ads(ads: &mut [ClassifiedAd], sort_by: SortBy) {
    let compare: fn(&ClassifiedAd, &ClassifiedAd) -> Ordering = match sort_by {
        SortBy::Newest => |a, b| b.created_date.cmp(&a.created_date),
        SortBy::Oldest => |a, b| a.created_date.cmp(&b.created_date),
        SortBy::PriceLow => |a, b| a.price.total_cmp(&b.price),
        SortBy::PriceHigh => |a, b| b.price.total_cmp(&a.price),
        SortBy::Popular => |a, b| b.view_count.cmp(&a.view_count),
    };
    ads.sort_by(compare);
}

/// The rendered listing: featured ads in their own leading section
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub featured: Vec<ClassifiedAd>,
    pub regular: Vec<ClassifiedAd>,
    /// Size of the unfiltered collection.
    pub total: usize,
}

impl Listing {
    pub fn build(ads: &[ClassifiedAd], filter: &AdFilter) -> Self {
        let (featured, regular) = filter_ads(ads, filter)
            .into_iter()
            .partition(|ad| ad.is_featured);
        Self {
            featured,
            regular,
            total: ads.len(),
        }
    }

    pub fn shown(&self) -> usize {
        self.featured.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown() == 0
    }
}
