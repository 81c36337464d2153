//! Internal classifieds marketplace backed by SharePoint lists through
//! Microsoft Graph.

pub mod config;
pub mod error;
pub mod graph;
pub mod listing;
pub mod models;
pub mod sharepoint;

pub use config::{AppConfig, ListIds};
pub use error::{ClassifiedsError, Result};
pub use listing::{filter_ads, FavoriteSet, Listing};
pub use sharepoint::SharePointService;
