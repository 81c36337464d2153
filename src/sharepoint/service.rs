use crate::config::ListIds;
use crate::error::{ClassifiedsError, Result};
use crate::graph::{Filter, GraphRequest, GraphTransport};
use crate::models::{
    AdFilter, AdStatus, AdUpdate, Category, ClassifiedAd, Favorite, Message, NewAd, NewMessage,
    NewSavedSearch, SavedSearch, UserProfile,
};
use crate::sharepoint::mapping::{self, AdFields, ListItem};
use crate::sharepoint::schema::{default_categories, ListKind};
use chrono::Utc;
use futures::future::try_join_all;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Characters escaped in a single URL path segment. Commas stay as-is so
/// composite site ids (`host,site-guid,web-guid`) keep their Graph form.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Lets Graph filter and sort on list columns that are not indexed.
const PREFER_NON_INDEXED: &str = "HonorNonIndexedQueriesWarningMayFailRandomly";

/// Attempts at an optimistic view-count increment before giving up.
pub const VIEW_COUNT_ATTEMPTS: usize = 3;

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Build the single conjunctive `$filter` for the server-side ad query.
pub fn ad_query_filter(filter: &AdFilter) -> Option<Filter> {
    let mut terms = Vec::new();
    if let Some(search) = filter.search_term() {
        terms.push(
            Filter::contains("fields/Title", search)
                .or(Filter::contains("fields/Description", search)),
        );
    }
    if let Some(category) = filter.category_name() {
        terms.push(Filter::eq("fields/Category", category));
    }
    if let Some(status) = filter.status {
        terms.push(Filter::eq("fields/Status", status.as_str()));
    }
    Filter::all(terms)
}

/// Typed access to the marketplace's SharePoint lists through Graph.
pub struct SharePointService<T> {
    transport: T,
    site_id: String,
    lists: ListIds,
}

impl<T: GraphTransport> SharePointService<T> {
    pub fn new(transport: T, site_id: impl Into<String>, lists: ListIds) -> Self {
        Self {
            transport,
            site_id: site_id.into(),
            lists,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn list_path(&self, kind: ListKind) -> String {
        format!(
            "/sites/{}/lists/{}",
            segment(&self.site_id),
            segment(self.lists.id_for(kind))
        )
    }

    fn items_path(&self, kind: ListKind) -> String {
        format!("{}/items", self.list_path(kind))
    }

    fn item_path(&self, kind: ListKind, id: &str) -> String {
        format!("{}/items/{}", self.list_path(kind), segment(id))
    }

    /// Run a list-items query and follow `@odata.nextLink` until every page
    /// has been read.
    async fn collect_items(&self, request: GraphRequest) -> Result<Vec<Value>> {
        let headers = request.headers.clone();
        let mut next = Some(request);
        let mut items = Vec::new();

        while let Some(request) = next.take() {
            let response = self.transport.send(request).await?;
            match response.body.get("value") {
                Some(Value::Array(page)) => items.extend(page.iter().cloned()),
                _ => {
                    return Err(ClassifiedsError::Decode(
                        "list items response has no `value` array".to_string(),
                    ))
                }
            }

            if let Some(link) = response.body.get("@odata.nextLink").and_then(Value::as_str) {
                debug!("Following nextLink after {} items", items.len());
                let mut request = GraphRequest::get(link);
                request.headers = headers.clone();
                next = Some(request);
            }
        }

        Ok(items)
    }

    fn filtered_items_request(&self, kind: ListKind, filter: Filter) -> GraphRequest {
        GraphRequest::get(self.items_path(kind))
            .query("$expand", "fields")
            .query("$filter", filter.to_string())
            .header("Prefer", PREFER_NON_INDEXED)
    }

    /// Make sure all six lists exist, creating missing ones with their
    /// column schema. Returns the lists that were created.
    pub async fn initialize_lists(&self) -> Result<Vec<ListKind>> {
        let mut created = Vec::new();
        for kind in ListKind::ALL {
            if self.create_list_if_not_exists(kind).await? {
                created.push(kind);
            }
        }
        Ok(created)
    }

    async fn create_list_if_not_exists(&self, kind: ListKind) -> Result<bool> {
        match self.transport.send(GraphRequest::get(self.list_path(kind))).await {
            Ok(_) => {
                info!("List {} already exists", kind);
                return Ok(false);
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        let request = GraphRequest::post(
            format!("/sites/{}/lists", segment(&self.site_id)),
            kind.create_body(),
        );
        match self.transport.send(request).await {
            Ok(_) => {
                info!("Created list: {}", kind);
                Ok(true)
            }
            Err(err) if err.is_conflict() => {
                warn!("List {} was created concurrently, keeping it", kind);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn create_ad(&self, ad: &NewAd) -> Result<ClassifiedAd> {
        ad.validate()?;
        let fields = mapping::new_ad_fields(ad, Utc::now());
        let response = self
            .transport
            .send(GraphRequest::post(
                self.items_path(ListKind::Ads),
                json!({ "fields": fields }),
            ))
            .await?;

        let created = mapping::ad_from_item(&response.body)?;
        info!("Created ad {} ({})", created.id, created.title);
        Ok(created)
    }

    pub async fn update_ad(&self, id: &str, update: &AdUpdate) -> Result<ClassifiedAd> {
        let fields = mapping::update_fields(update, Utc::now());
        let response = self
            .transport
            .send(GraphRequest::patch(
                format!("{}/fields", self.item_path(ListKind::Ads, id)),
                fields,
            ))
            .await?;

        mapping::ad_from_fields(id, &response.body)
    }

    /// Load every ad, newest first. `search`, `category` and `status` are
    /// pushed to Graph as one conjunctive `$filter`; the other criteria are
    /// left to the listing engine.
    pub async fn get_ads(&self, filter: Option<&AdFilter>) -> Result<Vec<ClassifiedAd>> {
        let mut request = GraphRequest::get(self.items_path(ListKind::Ads))
            .query("$expand", "fields")
            .query("$orderby", "fields/CreatedDate desc");

        if let Some(expr) = filter.and_then(ad_query_filter) {
            debug!("Ad query filter: {}", expr);
            request = request
                .query("$filter", expr.to_string())
                .header("Prefer", PREFER_NON_INDEXED);
        }

        let items = self.collect_items(request).await?;
        let ads = items
            .iter()
            .map(mapping::ad_from_item)
            .collect::<Result<Vec<_>>>()?;
        info!("Loaded {} ads", ads.len());
        Ok(ads)
    }

    pub async fn get_ad_by_id(&self, id: &str) -> Result<ClassifiedAd> {
        let item = self.fetch_ad_item(id).await?;
        mapping::ad_from_item(&item)
    }

    async fn fetch_ad_item(&self, id: &str) -> Result<Value> {
        let request =
            GraphRequest::get(self.item_path(ListKind::Ads, id)).query("$expand", "fields");
        Ok(self.transport.send(request).await?.body)
    }

    /// Increment the view count with an `If-Match` on the item's eTag,
    /// re-reading and retrying when another writer got there first.
    /// Returns the new count.
    pub async fn increment_view_count(&self, id: &str) -> Result<u64> {
        for attempt in 1..=VIEW_COUNT_ATTEMPTS {
            let item = ListItem::<AdFields>::parse(&self.fetch_ad_item(id).await?)?;
            let etag = item.etag;
            let views = item
                .fields
                .into_ad(item.id, item.created, item.modified)
                .view_count
                + 1;

            let mut request = GraphRequest::patch(
                format!("{}/fields", self.item_path(ListKind::Ads, id)),
                json!({ "ViewCount": views, "UpdatedDate": Utc::now() }),
            );
            if let Some(etag) = etag {
                request = request.if_match(etag);
            }

            match self.transport.send(request).await {
                Ok(_) => return Ok(views),
                Err(err) if err.is_precondition_failed() => {
                    warn!(
                        "View count for ad {} changed concurrently (attempt {}/{})",
                        id, attempt, VIEW_COUNT_ATTEMPTS
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(ClassifiedsError::Conflict(format!(
            "view count for ad {id} kept changing after {VIEW_COUNT_ATTEMPTS} attempts"
        )))
    }

    pub async fn delete_ad(&self, id: &str) -> Result<()> {
        self.transport
            .send(GraphRequest::delete(self.item_path(ListKind::Ads, id)))
            .await?;
        info!("Deleted ad {}", id);
        Ok(())
    }

    /// Upload an image into the ad item's folder and return its URL.
    pub async fn upload_image(
        &self,
        ad_id: &str,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<String> {
        let stored_name = format!("{}_{}_{}", ad_id, Utc::now().timestamp_millis(), file_name);
        let path = format!(
            "{}/driveItem/children/{}/content",
            self.item_path(ListKind::Ads, ad_id),
            segment(&stored_name)
        );

        debug!("Uploading {} bytes as {}", content.len(), stored_name);
        let response = self
            .transport
            .send(GraphRequest::put_bytes(path, content, content_type))
            .await?;

        response
            .body
            .get("webUrl")
            .or_else(|| response.body.get("@microsoft.graph.downloadUrl"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClassifiedsError::Decode("upload response carries no URL".to_string()))
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let request =
            GraphRequest::get(self.items_path(ListKind::Categories)).query("$expand", "fields");
        let items = self.collect_items(request).await?;
        items.iter().map(mapping::category_from_item).collect()
    }

    /// Add any default category missing from the list; returns how many
    /// were added.
    pub async fn seed_categories(&self) -> Result<usize> {
        let existing: HashSet<String> = self
            .get_categories()
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut added = 0;
        for category in default_categories() {
            if existing.contains(&category.name) {
                continue;
            }
            self.transport
                .send(GraphRequest::post(
                    self.items_path(ListKind::Categories),
                    json!({ "fields": mapping::category_fields(&category) }),
                ))
                .await?;
            added += 1;
        }
        info!("Seeded {} categories", added);
        Ok(added)
    }

    async fn find_favorite(&self, user_id: &str, ad_id: &str) -> Result<Option<Value>> {
        let filter =
            Filter::eq("fields/UserId", user_id).and(Filter::eq("fields/AdId", ad_id));
        let items = self
            .collect_items(self.filtered_items_request(ListKind::Favorites, filter))
            .await?;
        Ok(items.into_iter().next())
    }

    /// Favorite an ad. An existing (user, ad) favorite is returned instead of
    /// adding a duplicate.
    pub async fn add_to_favorites(&self, user_id: &str, ad_id: &str) -> Result<Favorite> {
        if let Some(existing) = self.find_favorite(user_id, ad_id).await? {
            debug!("Ad {} is already a favorite of {}", ad_id, user_id);
            return mapping::favorite_from_item(&existing);
        }

        let response = self
            .transport
            .send(GraphRequest::post(
                self.items_path(ListKind::Favorites),
                json!({ "fields": mapping::favorite_fields(user_id, ad_id, Utc::now()) }),
            ))
            .await?;
        mapping::favorite_from_item(&response.body)
    }

    /// Remove a favorite; returns whether one was found.
    pub async fn remove_from_favorites(&self, user_id: &str, ad_id: &str) -> Result<bool> {
        let Some(existing) = self.find_favorite(user_id, ad_id).await? else {
            return Ok(false);
        };
        let favorite = mapping::favorite_from_item(&existing)?;
        self.transport
            .send(GraphRequest::delete(
                self.item_path(ListKind::Favorites, &favorite.id),
            ))
            .await?;
        Ok(true)
    }

    /// The user's favorite rows, without loading the ads they point at.
    pub async fn get_favorite_entries(&self, user_id: &str) -> Result<Vec<Favorite>> {
        let request =
            self.filtered_items_request(ListKind::Favorites, Filter::eq("fields/UserId", user_id));
        let items = self.collect_items(request).await?;
        items.iter().map(mapping::favorite_from_item).collect()
    }

    /// The user's favorited ads that are still active. Favorites left behind
    /// by a deleted ad are skipped.
    pub async fn get_favorites(&self, user_id: &str) -> Result<Vec<ClassifiedAd>> {
        let favorites = self.get_favorite_entries(user_id).await?;
        let ads = try_join_all(favorites.iter().map(|f| self.favorite_ad(&f.ad_id))).await?;
        Ok(ads
            .into_iter()
            .flatten()
            .filter(|ad| ad.status == AdStatus::Active)
            .collect())
    }

    async fn favorite_ad(&self, ad_id: &str) -> Result<Option<ClassifiedAd>> {
        match self.get_ad_by_id(ad_id).await {
            Ok(ad) => Ok(Some(ad)),
            Err(err) if err.is_not_found() => {
                warn!("Favorite refers to missing ad {}", ad_id);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn save_search(&self, search: &NewSavedSearch) -> Result<SavedSearch> {
        let response = self
            .transport
            .send(GraphRequest::post(
                self.items_path(ListKind::SavedSearches),
                json!({ "fields": mapping::saved_search_fields(search, Utc::now()) }),
            ))
            .await?;
        mapping::saved_search_from_item(&response.body)
    }

    pub async fn get_saved_searches(&self, user_id: &str) -> Result<Vec<SavedSearch>> {
        let items = self
            .collect_items(self.filtered_items_request(
                ListKind::SavedSearches,
                Filter::eq("fields/UserId", user_id),
            ))
            .await?;
        items.iter().map(mapping::saved_search_from_item).collect()
    }

    pub async fn send_message(&self, message: &NewMessage) -> Result<Message> {
        let response = self
            .transport
            .send(GraphRequest::post(
                self.items_path(ListKind::Messages),
                json!({ "fields": mapping::message_fields(message, Utc::now()) }),
            ))
            .await?;
        let sent = mapping::message_from_item(&response.body)?;
        info!("Message {} sent to {}", sent.id, sent.to_user_id);
        Ok(sent)
    }

    /// Messages addressed to `user_id`, newest first.
    pub async fn get_inbox(&self, user_id: &str) -> Result<Vec<Message>> {
        let items = self
            .collect_items(self.filtered_items_request(
                ListKind::Messages,
                Filter::eq("fields/ToUserId", user_id),
            ))
            .await?;
        let mut messages = items
            .iter()
            .map(mapping::message_from_item)
            .collect::<Result<Vec<_>>>()?;
        messages.sort_by(|a, b| b.sent_date.cmp(&a.sent_date));
        Ok(messages)
    }

    pub async fn mark_message_read(&self, id: &str) -> Result<()> {
        self.transport
            .send(GraphRequest::patch(
                format!("{}/fields", self.item_path(ListKind::Messages, id)),
                json!({ "IsRead": true }),
            ))
            .await?;
        Ok(())
    }

    /// Profile of the signed-in user.
    pub async fn current_user(&self) -> Result<UserProfile> {
        let response = self.transport.send(GraphRequest::get("/me")).await?;
        mapping::user_from_graph(&response.body)
    }
}
