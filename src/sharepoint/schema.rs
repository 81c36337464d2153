use crate::config::ListIds;
use crate::models::{Category, Condition};
use serde_json::{json, Value};
use std::fmt;

/// The SharePoint lists the marketplace persists to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Ads,
    Categories,
    Users,
    Favorites,
    SavedSearches,
    Messages,
}

impl ListKind {
    /// Creation order used by `initialize_lists`.
    pub const ALL: [ListKind; 6] = [
        Self::Ads,
        Self::Categories,
        Self::Users,
        Self::Favorites,
        Self::SavedSearches,
        Self::Messages,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Ads => "ClassifiedAds",
            Self::Categories => "Categories",
            Self::Users => "Users",
            Self::Favorites => "Favorites",
            Self::SavedSearches => "SavedSearches",
            Self::Messages => "Messages",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Ads => "Classified Ads",
            Self::Categories => "Categories",
            Self::Users => "Users",
            Self::Favorites => "Favorites",
            Self::SavedSearches => "Saved Searches",
            Self::Messages => "Messages",
        }
    }

    /// Column definitions in Graph's `columnDefinition` shape. `Title` is
    /// built into every generic list and is not redeclared.
    pub fn columns(&self) -> Vec<Value> {
        match self {
            Self::Ads => vec![
                multiline("Description"),
                text("Category"),
                number("Price"),
                number("OriginalPrice"),
                choice("Status", &["Active", "Pending", "Sold"]),
                multiline("Images"),
                number("ViewCount"),
                boolean("IsFeatured"),
                boolean("IsLookingFor"),
                text("CreatedBy"),
                date_time("CreatedDate"),
                date_time("UpdatedDate"),
                text("Location"),
                choice("Condition", &Condition::ALL.map(|c| c.as_str())),
                multiline("Tags"),
            ],
            Self::Categories => vec![multiline("Description"), text("Icon")],
            Self::Users => vec![
                text("Email"),
                text("Department"),
                text("Location"),
                text("Avatar"),
            ],
            Self::Favorites => vec![text("UserId"), text("AdId"), date_time("AddedDate")],
            Self::SavedSearches => vec![
                text("UserId"),
                text("Query"),
                text("Category"),
                number("MinPrice"),
                number("MaxPrice"),
                boolean("IsActive"),
                date_time("CreatedDate"),
            ],
            Self::Messages => vec![
                text("FromUserId"),
                text("ToUserId"),
                text("AdId"),
                multiline("Content"),
                date_time("SentDate"),
                boolean("IsRead"),
            ],
        }
    }

    /// Request body for `POST /sites/{site}/lists`.
    pub fn create_body(&self) -> Value {
        json!({
            "displayName": self.display_name(),
            "description": self.description(),
            "columns": self.columns(),
            "list": { "template": "genericList" },
        })
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl ListIds {
    pub fn id_for(&self, kind: ListKind) -> &str {
        match kind {
            ListKind::Ads => &self.ads,
            ListKind::Categories => &self.categories,
            ListKind::Users => &self.users,
            ListKind::Favorites => &self.favorites,
            ListKind::SavedSearches => &self.saved_searches,
            ListKind::Messages => &self.messages,
        }
    }
}

/// Seed rows for the `Categories` list: (name, description, icon).
pub const DEFAULT_CATEGORIES: [(&str, &str, &str); 8] = [
    ("Electronics", "Electronic devices and gadgets", "\u{1F4F1}"),
    ("Furniture", "Home and office furniture", "\u{1FA91}"),
    ("Clothing", "Apparel and accessories", "\u{1F455}"),
    ("Books", "Books and publications", "\u{1F4DA}"),
    ("Sports", "Sports equipment and gear", "\u{26BD}"),
    ("Automotive", "Car parts and accessories", "\u{1F697}"),
    ("Home & Garden", "Home improvement and garden items", "\u{1F3E0}"),
    ("Other", "Miscellaneous items", "\u{1F4E6}"),
];

/// The default categories, numbered from 1 in display order.
pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, (name, description, icon))| Category {
            id: (i + 1).to_string(),
            name: name.to_string(),
            description: description.to_string(),
            icon: icon.to_string(),
        })
        .collect()
}

fn text(name: &str) -> Value {
    json!({ "name": name, "text": {} })
}

fn multiline(name: &str) -> Value {
    json!({ "name": name, "text": { "allowMultipleLines": true } })
}

fn number(name: &str) -> Value {
    json!({ "name": name, "number": {} })
}

fn boolean(name: &str) -> Value {
    json!({ "name": name, "boolean": {} })
}

fn date_time(name: &str) -> Value {
    json!({ "name": name, "dateTime": {} })
}

fn choice(name: &str, choices: &[&str]) -> Value {
    json!({ "name": name, "choice": { "choices": choices } })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(kind: ListKind) -> Vec<String> {
        kind.columns()
            .iter()
            .filter_map(|c| c["name"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn ads_list_declares_every_mapped_column() {
        let names = column_names(ListKind::Ads);
        for expected in [
            "Description",
            "Category",
            "Price",
            "OriginalPrice",
            "Status",
            "Images",
            "ViewCount",
            "IsFeatured",
            "IsLookingFor",
            "CreatedBy",
            "CreatedDate",
            "UpdatedDate",
            "Location",
            "Condition",
            "Tags",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert!(!names.iter().any(|n| n == "Title"));
    }

    #[test]
    fn status_and_condition_are_choice_columns() {
        let columns = ListKind::Ads.columns();
        let status = columns.iter().find(|c| c["name"] == "Status").unwrap();
        assert_eq!(status["choice"]["choices"], json!(["Active", "Pending", "Sold"]));

        let condition = columns.iter().find(|c| c["name"] == "Condition").unwrap();
        assert_eq!(
            condition["choice"]["choices"],
            json!(["New", "Like New", "Good", "Fair", "Poor"])
        );
    }

    #[test]
    fn create_body_uses_generic_list_template() {
        let body = ListKind::SavedSearches.create_body();
        assert_eq!(body["displayName"], "SavedSearches");
        assert_eq!(body["description"], "Saved Searches");
        assert_eq!(body["list"]["template"], "genericList");
    }

    #[test]
    fn default_categories_are_numbered() {
        let categories = default_categories();
        assert_eq!(categories.len(), 8);
        assert_eq!(categories[0].id, "1");
        assert_eq!(categories[0].name, "Electronics");
        assert_eq!(categories[7].name, "Other");
    }

    #[test]
    fn list_ids_resolve_per_kind() {
        let ids = ListIds::default();
        for kind in ListKind::ALL {
            assert_eq!(ids.id_for(kind), kind.display_name());
        }
    }
}
