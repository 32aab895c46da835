pub mod schema;

use anyhow::{anyhow, Context, Result};
use futures::stream::{self, Stream, TryStreamExt};
use log::{debug, info, warn};
use std::sync::Arc;
use url::Url;

use crate::api::transport::HttpTransport;
use crate::models::mod_info::{ModFile, ModSummary};
use crate::utils::errors::BananasyncError;
use crate::utils::html;

use schema::{DownloadPageResponse, ProfilePageResponse, SubfeedRecord, SubfeedResponse};

/// Stops paging if the feed never returns an empty page.
pub const MAX_CATALOG_PAGES: u32 = 1000;
const DEFAULT_SORT: &str = "default";

pub struct GamebananaClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl GamebananaClient {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Cannot append path to base URL {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn subfeed_url(&self, game_id: &str, page: u32) -> Result<Url> {
        let mut url = self.endpoint(&["Game", game_id, "Subfeed"])?;
        url.query_pairs_mut()
            .append_pair("_nPage", &page.to_string())
            .append_pair("_sSort", DEFAULT_SORT);
        Ok(url)
    }

    /// Fetches one page of the subfeed and returns the mods on it, plus the raw record count.
    async fn fetch_catalog_page(&self, game_id: &str, page: u32) -> Result<(usize, Vec<ModSummary>)> {
        let url = self.subfeed_url(game_id, page)?;
        debug!("Fetching catalog page {} from {}", page, url);

        let response = self.transport.get_ok(url.as_str()).await?;
        let feed: SubfeedResponse = serde_json::from_slice(&response.body).map_err(|err| {
            anyhow!(BananasyncError::MalformedResponse(format!(
                "catalog page {} has no record list: {}",
                page, err
            )))
        })?;

        let record_count = feed.records.len();
        let mods = feed
            .records
            .into_iter()
            .filter_map(|value| SubfeedRecord::from_value(value).into_summary())
            .collect();
        Ok((record_count, mods))
    }

    /// Lazily walks the subfeed from page 1 and yields the mods of each page.
    ///
    /// The stream ends after the first page with no records. Each call starts over at page 1.
    pub fn catalog_pages<'a>(
        &'a self,
        game_id: &'a str,
    ) -> impl Stream<Item = Result<Vec<ModSummary>>> + 'a {
        stream::try_unfold(Some(1u32), move |page| async move {
            let Some(page) = page else {
                return Ok::<_, anyhow::Error>(None);
            };
            let (record_count, mods) = self.fetch_catalog_page(game_id, page).await?;
            if record_count == 0 {
                return Ok(None);
            }
            let next = if page >= MAX_CATALOG_PAGES {
                warn!("Catalog exceeded {} pages, stopping", MAX_CATALOG_PAGES);
                None
            } else {
                Some(page + 1)
            };
            Ok(Some((mods, next)))
        })
    }

    /// Fetches every mod for `game_id`. Any page failure fails the whole call.
    pub async fn fetch_catalog(&self, game_id: &str) -> Result<Vec<ModSummary>> {
        let pages: Vec<Vec<ModSummary>> = self
            .catalog_pages(game_id)
            .try_collect()
            .await
            .with_context(|| format!("Failed to fetch mod catalog for game {}", game_id))?;
        let mods: Vec<ModSummary> = pages.into_iter().flatten().collect();
        info!("Fetched {} mods for game {}", mods.len(), game_id);
        Ok(mods)
    }

    pub async fn fetch_file_list(&self, mod_id: &str) -> Result<Vec<ModFile>> {
        let url = self.endpoint(&["Mod", mod_id, "DownloadPage"])?;
        let response = self
            .transport
            .get_ok(url.as_str())
            .await
            .with_context(|| format!("Failed to fetch file list for mod {}", mod_id))?;

        let page: DownloadPageResponse = serde_json::from_slice(&response.body).map_err(|err| {
            anyhow!(BananasyncError::MalformedResponse(format!(
                "download page for mod {}: {}",
                mod_id, err
            )))
        })?;

        Ok(page
            .files
            .into_iter()
            .filter_map(|file| file.into_mod_file())
            .collect())
    }

    /// Best-effort: failures come back as a readable message instead of an error.
    pub async fn fetch_full_description(&self, mod_id: &str) -> String {
        if mod_id.is_empty() {
            return "No description available.".to_string();
        }
        match self.try_fetch_description(mod_id).await {
            Ok(Some(text)) => text,
            Ok(None) => "Description not found.".to_string(),
            Err(err) => format!("Could not load full description. Error: {:#}", err),
        }
    }

    async fn try_fetch_description(&self, mod_id: &str) -> Result<Option<String>> {
        let url = self.endpoint(&["Mod", mod_id, "ProfilePage"])?;
        let response = self.transport.get_ok(url.as_str()).await?;
        let page: ProfilePageResponse = serde_json::from_slice(&response.body)?;
        Ok(page.raw_text().map(|raw| html::to_plain_text(&raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::HttpResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StubTransport {
        routes: HashMap<String, HttpResponse>,
        requested: Mutex<Vec<String>>,
    }

    impl StubTransport {
        fn route(mut self, url: &str, status: u16, body: serde_json::Value) -> Self {
            self.routes
                .insert(url.to_string(), HttpResponse::new(status, body.to_string()));
            self
        }
    }

    #[async_trait]
    impl HttpTransport for StubTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse> {
            self.requested.lock().unwrap().push(url.to_string());
            Ok(self
                .routes
                .get(url)
                .cloned()
                .unwrap_or_else(|| HttpResponse::new(404, "")))
        }
    }

    const BASE: &str = "https://gb.test/apiv11";

    fn page_url(page: u32) -> String {
        format!("{}/Game/18557/Subfeed?_nPage={}&_sSort=default", BASE, page)
    }

    fn mod_record(id: u64, name: &str) -> serde_json::Value {
        json!({ "_sModelName": "Mod", "_idRow": id, "_sName": name, "_tsDateUpdated": id * 10 })
    }

    #[tokio::test]
    async fn catalog_stops_at_first_empty_page() {
        let transport = StubTransport::default()
            .route(
                &page_url(1),
                200,
                json!({ "_aRecords": [mod_record(1, "a"), mod_record(2, "b"), mod_record(3, "c")] }),
            )
            .route(&page_url(2), 200, json!({ "_aRecords": [mod_record(4, "d")] }))
            .route(&page_url(3), 200, json!({ "_aRecords": [] }))
            .route(&page_url(4), 200, json!({ "_aRecords": [mod_record(5, "never")] }));
        let transport = Arc::new(transport);
        let client = GamebananaClient::new(transport.clone(), BASE);

        let mods = client.fetch_catalog("18557").await.unwrap();

        let ids: Vec<_> = mods.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(transport.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn catalog_skips_non_mod_records_without_ending_paging() {
        let transport = StubTransport::default()
            .route(
                &page_url(1),
                200,
                json!({ "_aRecords": [{ "_sModelName": "Wip", "_idRow": 9, "_sName": "wip" }] }),
            )
            .route(&page_url(2), 200, json!({ "_aRecords": [mod_record(1, "a")] }))
            .route(&page_url(3), 200, json!({ "_aRecords": [] }));
        let client = GamebananaClient::new(Arc::new(transport), BASE);

        let mods = client.fetch_catalog("18557").await.unwrap();

        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].name, "a");
    }

    #[tokio::test]
    async fn catalog_is_all_or_nothing() {
        let transport = StubTransport::default()
            .route(&page_url(1), 200, json!({ "_aRecords": [mod_record(1, "a")] }))
            .route(&page_url(2), 500, json!({}));
        let client = GamebananaClient::new(Arc::new(transport), BASE);

        let err = client.fetch_catalog("18557").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BananasyncError>(),
            Some(BananasyncError::Transport { status: Some(500), .. })
        ));
    }

    #[tokio::test]
    async fn file_list_handles_missing_array() {
        let transport = StubTransport::default()
            .route(
                &format!("{}/Mod/1/DownloadPage", BASE),
                200,
                json!({ "_aFiles": [
                    { "_sFile": "garden.zip", "_sDownloadUrl": "https://gb.test/dl/1" },
                    { "_sDownloadUrl": "https://gb.test/dl/2" },
                    { "_sFile": "no-url.zip" }
                ]}),
            )
            .route(&format!("{}/Mod/2/DownloadPage", BASE), 200, json!({}));
        let client = GamebananaClient::new(Arc::new(transport), BASE);

        let files = client.fetch_file_list("1").await.unwrap();
        assert_eq!(
            files,
            vec![
                ModFile::new("garden.zip", "https://gb.test/dl/1"),
                ModFile::new("unknown.zip", "https://gb.test/dl/2"),
            ]
        );
        assert!(client.fetch_file_list("2").await.unwrap().is_empty());
        assert!(client.fetch_file_list("3").await.is_err());
    }

    #[tokio::test]
    async fn description_is_plain_text_or_fallback() {
        let transport = StubTransport::default()
            .route(
                &format!("{}/Mod/1/ProfilePage", BASE),
                200,
                json!({ "_sText": ["Line one<br>Line &amp; two"] }),
            )
            .route(&format!("{}/Mod/2/ProfilePage", BASE), 200, json!({}));
        let client = GamebananaClient::new(Arc::new(transport), BASE);

        assert_eq!(client.fetch_full_description("1").await, "Line one\nLine & two");
        assert_eq!(client.fetch_full_description("2").await, "Description not found.");
        assert_eq!(client.fetch_full_description("").await, "No description available.");
        assert!(client
            .fetch_full_description("3")
            .await
            .starts_with("Could not load full description. Error:"));
    }
}
