//! Translation between SharePoint list items and the marketplace entities.
//!
//! Columns are PascalCase (`Title`, `ViewCount`, ...). Missing booleans and
//! counts read as `false`/`0`; multi-value columns (`Images`, `Tags`) are
//! stored as one text value using [`join_values`].

use crate::error::Result;
use crate::models::{
    AdStatus, AdUpdate, Category, ClassifiedAd, Condition, Favorite, Message, NewAd, NewMessage,
    NewSavedSearch, SavedSearch, UserProfile,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const SEPARATOR: char = ',';
const ESCAPE: char = '\\';

/// Join values into a single comma-separated column value. Commas and
/// backslashes inside a value are backslash-escaped.
pub fn join_values(values: &[String]) -> String {
    let mut joined = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            joined.push(SEPARATOR);
        }
        for c in value.chars() {
            if c == SEPARATOR || c == ESCAPE {
                joined.push(ESCAPE);
            }
            joined.push(c);
        }
    }
    joined
}

/// Inverse of [`join_values`]. Plain unescaped values (`"a,b,c"`) split on
/// every comma; an empty column yields no values.
pub fn split_values(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == ESCAPE {
            escaped = true;
        } else if c == SEPARATOR {
            values.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        current.push(ESCAPE);
    }
    values.push(current);
    values
}

/// Envelope shared by every list item Graph returns
#[derive(Debug, Deserialize)]
pub struct ListItem<F> {
    pub id: String,
    #[serde(rename = "eTag", default)]
    pub etag: Option<String>,
    #[serde(rename = "createdDateTime", default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedDateTime", default)]
    pub modified: Option<DateTime<Utc>>,
    pub fields: F,
}

impl<F: DeserializeOwned> ListItem<F> {
    pub fn parse(item: &Value) -> Result<Self> {
        Ok(Self::deserialize(item)?)
    }
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AdFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub status: Option<AdStatus>,
    pub images: Option<String>,
    pub view_count: Option<f64>,
    pub is_featured: Option<bool>,
    pub is_looking_for: Option<bool>,
    pub created_by: Option<String>,
    pub created_date: Option<DateTime<Utc>>,
    pub updated_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub condition: Option<Condition>,
    pub tags: Option<String>,
}

impl AdFields {
    pub fn into_ad(
        self,
        id: String,
        created_fallback: Option<DateTime<Utc>>,
        modified_fallback: Option<DateTime<Utc>>,
    ) -> ClassifiedAd {
        let created_date = self
            .created_date
            .or(created_fallback)
            .unwrap_or_else(epoch);
        let updated_date = self
            .updated_date
            .or(modified_fallback)
            .unwrap_or(created_date);

        ClassifiedAd {
            id,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            category: self.category.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            original_price: self.original_price,
            status: self.status.unwrap_or_default(),
            images: self.images.as_deref().map(split_values).unwrap_or_default(),
            view_count: self.view_count.map(|c| c.max(0.0) as u64).unwrap_or(0),
            is_featured: self.is_featured.unwrap_or(false),
            is_looking_for: self.is_looking_for.unwrap_or(false),
            created_by: self.created_by.unwrap_or_default(),
            created_date,
            updated_date,
            location: self.location.filter(|l| !l.is_empty()),
            condition: self.condition,
            tags: self.tags.as_deref().map(split_values).unwrap_or_default(),
        }
    }
}

/// Map a Graph list item (`$expand=fields`) to an ad.
pub fn ad_from_item(item: &Value) -> Result<ClassifiedAd> {
    let item = ListItem::<AdFields>::parse(item)?;
    Ok(item.fields.into_ad(item.id, item.created, item.modified))
}

/// Map a bare `fields` object, as returned by `PATCH .../fields`.
pub fn ad_from_fields(id: &str, fields: &Value) -> Result<ClassifiedAd> {
    let fields = AdFields::deserialize(fields)?;
    Ok(fields.into_ad(id.to_string(), None, None))
}

/// Column values for a newly posted ad.
pub fn new_ad_fields(ad: &NewAd, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    fields.insert("Title".into(), json!(ad.title));
    fields.insert("Description".into(), json!(ad.description));
    fields.insert("Category".into(), json!(ad.category));
    fields.insert("Price".into(), json!(ad.price));
    if let Some(original) = ad.original_price.filter(|p| *p > 0.0) {
        fields.insert("OriginalPrice".into(), json!(original));
    }
    fields.insert("Status".into(), json!(ad.status));
    fields.insert("Images".into(), json!(join_values(&ad.images)));
    fields.insert("ViewCount".into(), json!(0));
    fields.insert("IsFeatured".into(), json!(ad.is_featured));
    fields.insert("IsLookingFor".into(), json!(ad.is_looking_for));
    fields.insert("CreatedBy".into(), json!(ad.created_by));
    fields.insert("CreatedDate".into(), json!(now));
    fields.insert("UpdatedDate".into(), json!(now));
    if let Some(location) = ad.location.as_deref().filter(|l| !l.trim().is_empty()) {
        fields.insert("Location".into(), json!(location));
    }
    if let Some(condition) = ad.condition {
        fields.insert("Condition".into(), json!(condition));
    }
    fields.insert("Tags".into(), json!(join_values(&ad.tags)));
    Value::Object(fields)
}

/// Column values for a partial update; always stamps `UpdatedDate`.
pub fn update_fields(update: &AdUpdate, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    let mut set = |name: &str, value: Option<Value>| {
        if let Some(value) = value {
            fields.insert(name.to_string(), value);
        }
    };

    set("Title", update.title.as_ref().map(|v| json!(v)));
    set("Description", update.description.as_ref().map(|v| json!(v)));
    set("Category", update.category.as_ref().map(|v| json!(v)));
    set("Price", update.price.map(|v| json!(v)));
    set("OriginalPrice", update.original_price.map(|v| json!(v)));
    set("Status", update.status.map(|v| json!(v)));
    set("Images", update.images.as_ref().map(|v| json!(join_values(v))));
    set("ViewCount", update.view_count.map(|v| json!(v)));
    set("IsFeatured", update.is_featured.map(|v| json!(v)));
    set("IsLookingFor", update.is_looking_for.map(|v| json!(v)));
    set("Location", update.location.as_ref().map(|v| json!(v)));
    set("Condition", update.condition.map(|v| json!(v)));
    set("Tags", update.tags.as_ref().map(|v| json!(join_values(v))));
    set("UpdatedDate", Some(json!(now)));

    Value::Object(fields)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CategoryFields {
    title: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

pub fn category_from_item(item: &Value) -> Result<Category> {
    let item = ListItem::<CategoryFields>::parse(item)?;
    Ok(Category {
        id: item.id,
        name: item.fields.title.unwrap_or_default(),
        description: item.fields.description.unwrap_or_default(),
        icon: item.fields.icon.unwrap_or_default(),
    })
}

pub fn category_fields(category: &Category) -> Value {
    json!({
        "Title": category.name,
        "Description": category.description,
        "Icon": category.icon,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct FavoriteFields {
    user_id: Option<String>,
    ad_id: Option<String>,
    added_date: Option<DateTime<Utc>>,
}

pub fn favorite_from_item(item: &Value) -> Result<Favorite> {
    let item = ListItem::<FavoriteFields>::parse(item)?;
    Ok(Favorite {
        id: item.id,
        user_id: item.fields.user_id.unwrap_or_default(),
        ad_id: item.fields.ad_id.unwrap_or_default(),
        added_date: item
            .fields
            .added_date
            .or(item.created)
            .unwrap_or_else(epoch),
    })
}

pub fn favorite_fields(user_id: &str, ad_id: &str, now: DateTime<Utc>) -> Value {
    json!({
        "UserId": user_id,
        "AdId": ad_id,
        "AddedDate": now,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SavedSearchFields {
    user_id: Option<String>,
    title: Option<String>,
    query: Option<String>,
    category: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    is_active: Option<bool>,
    created_date: Option<DateTime<Utc>>,
}

pub fn saved_search_from_item(item: &Value) -> Result<SavedSearch> {
    let item = ListItem::<SavedSearchFields>::parse(item)?;
    let fields = item.fields;
    Ok(SavedSearch {
        id: item.id,
        user_id: fields.user_id.unwrap_or_default(),
        name: fields.title.unwrap_or_default(),
        query: fields.query.unwrap_or_default(),
        category: fields.category.filter(|c| !c.is_empty()),
        min_price: fields.min_price,
        max_price: fields.max_price,
        is_active: fields.is_active.unwrap_or(true),
        created_date: fields
            .created_date
            .or(item.created)
            .unwrap_or_else(epoch),
    })
}

pub fn saved_search_fields(search: &NewSavedSearch, now: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    fields.insert("UserId".into(), json!(search.user_id));
    fields.insert("Title".into(), json!(search.name));
    fields.insert("Query".into(), json!(search.query));
    if let Some(category) = &search.category {
        fields.insert("Category".into(), json!(category));
    }
    if let Some(min) = search.min_price {
        fields.insert("MinPrice".into(), json!(min));
    }
    if let Some(max) = search.max_price {
        fields.insert("MaxPrice".into(), json!(max));
    }
    fields.insert("IsActive".into(), json!(true));
    fields.insert("CreatedDate".into(), json!(now));
    Value::Object(fields)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct MessageFields {
    from_user_id: Option<String>,
    to_user_id: Option<String>,
    ad_id: Option<String>,
    title: Option<String>,
    content: Option<String>,
    sent_date: Option<DateTime<Utc>>,
    is_read: Option<bool>,
}

pub fn message_from_item(item: &Value) -> Result<Message> {
    let item = ListItem::<MessageFields>::parse(item)?;
    let fields = item.fields;
    Ok(Message {
        id: item.id,
        from_user_id: fields.from_user_id.unwrap_or_default(),
        to_user_id: fields.to_user_id.unwrap_or_default(),
        ad_id: fields.ad_id.unwrap_or_default(),
        subject: fields.title.unwrap_or_default(),
        content: fields.content.unwrap_or_default(),
        sent_date: fields
            .sent_date
            .or(item.created)
            .unwrap_or_else(epoch),
        is_read: fields.is_read.unwrap_or(false),
    })
}

pub fn message_fields(message: &NewMessage, now: DateTime<Utc>) -> Value {
    json!({
        "FromUserId": message.from_user_id,
        "ToUserId": message.to_user_id,
        "AdId": message.ad_id,
        "Title": message.subject,
        "Content": message.content,
        "SentDate": now,
        "IsRead": false,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    user_principal_name: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    office_location: Option<String>,
}

/// Map Graph's `/me` user resource.
pub fn user_from_graph(user: &Value) -> Result<UserProfile> {
    let user = GraphUser::deserialize(user)?;
    Ok(UserProfile {
        id: user.id,
        display_name: user.display_name.unwrap_or_default(),
        email: user.mail.or(user.user_principal_name).unwrap_or_default(),
        department: user.department,
        location: user.office_location,
    })
}
