#![allow(dead_code)]

use anyhow::{anyhow, Result};
use assert_fs::TempDir;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;

use bananasync::api::transport::{HttpResponse, HttpTransport};
use bananasync::models::config::SyncConfig;
use bananasync::utils::errors::BananasyncError;
use bananasync::utils::Env;

pub const BASE: &str = "https://gamebanana.test/apiv11";
pub const GAME_ID: &str = "18557";

/// In-memory GameBanana: serves a catalog, download pages and file bodies.
#[derive(Default)]
pub struct FakeGamebanana {
    routes: Mutex<HashMap<String, HttpResponse>>,
    unreachable: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

pub struct FakeMod<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub updated_at: i64,
    pub files: Vec<&'a str>,
}

impl FakeGamebanana {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::new(status, body));
    }

    pub fn unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    /// Requests to `url` never complete.
    pub fn stall(&self, url: &str) {
        self.stalled.lock().unwrap().insert(url.to_string());
    }

    pub fn file_url(name: &str) -> String {
        format!("https://files.gamebanana.test/dl/{}", name)
    }

    pub fn page_url(page: u32) -> String {
        format!(
            "{}/Game/{}/Subfeed?_nPage={}&_sSort=default",
            BASE, GAME_ID, page
        )
    }

    /// Publishes `mods` on a single catalog page followed by an empty one.
    pub fn publish(&self, mods: &[FakeMod]) {
        let records: Vec<Value> = mods
            .iter()
            .map(|m| {
                json!({
                    "_sModelName": "Mod",
                    "_idRow": m.id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(m.id)),
                    "_sName": m.name,
                    "_tsDateUpdated": m.updated_at,
                    "_aSubmitter": { "_sName": "tester" }
                })
            })
            .collect();
        self.route(&Self::page_url(1), 200, json!({ "_aRecords": records }).to_string());
        self.route(&Self::page_url(2), 200, json!({ "_aRecords": [] }).to_string());

        for m in mods {
            let files: Vec<Value> = m
                .files
                .iter()
                .map(|f| json!({ "_sFile": f, "_sDownloadUrl": Self::file_url(f) }))
                .collect();
            self.route(
                &format!("{}/Mod/{}/DownloadPage", BASE, m.id),
                200,
                json!({ "_aFiles": files }).to_string(),
            );
            for f in &m.files {
                self.route(&Self::file_url(f), 200, format!("contents of {}", f));
            }
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn file_downloads(&self) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.starts_with("https://files.gamebanana.test/"))
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpTransport for FakeGamebanana {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(url.to_string());
        let stalled = self.stalled.lock().unwrap().contains(url);
        if stalled {
            std::future::pending::<()>().await;
        }
        if self.unreachable.lock().unwrap().contains(url) {
            return Err(anyhow!(BananasyncError::transport(
                None,
                format!("connection refused: {}", url)
            )));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "not found")))
    }
}

pub struct TestEnv {
    pub tempdir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            tempdir: TempDir::new().unwrap(),
        }
    }

    pub fn config(&self) -> SyncConfig {
        let mut config = SyncConfig::new(
            GAME_ID.to_string(),
            PathBuf::from("mods"),
            PathBuf::from("mods.json"),
        );
        config.api_base_url = Some(BASE.to_string());
        config
    }
}

impl Env for TestEnv {
    fn current_dir(&self) -> Result<PathBuf> {
        Ok(self.tempdir.path().to_path_buf())
    }
}
