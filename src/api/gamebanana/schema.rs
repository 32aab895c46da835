use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::mod_info::{ModFile, ModSummary};

/// Response from GET /Game/{id}/Subfeed
#[derive(Debug, Deserialize)]
pub struct SubfeedResponse {
    #[serde(rename = "_aRecords")]
    pub records: Vec<Value>,
}

/// A single entry in the subfeed. The feed mixes mods with other content, so every
/// field is optional and type mismatches on non-essential fields fall back to `None`.
#[derive(Debug, Deserialize, Default)]
pub struct SubfeedRecord {
    #[serde(rename = "_sModelName", default, deserialize_with = "lenient_string")]
    pub model_name: Option<String>,
    #[serde(rename = "_idRow", default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(rename = "_sName", default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "_sProfileUrl", default, deserialize_with = "lenient_string")]
    pub profile_url: Option<String>,
    #[serde(rename = "_sBody", default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
    #[serde(rename = "_tsDateUpdated", default, deserialize_with = "lenient_i64")]
    pub date_updated: Option<i64>,
    #[serde(rename = "_tsDateAdded", default, deserialize_with = "lenient_i64")]
    pub date_added: Option<i64>,
    #[serde(rename = "_nViewCount", default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(rename = "_nLikeCount", default, deserialize_with = "lenient_u64")]
    pub like_count: Option<u64>,
    #[serde(rename = "_aSubmitter", default)]
    pub submitter: Option<Value>,
    #[serde(rename = "_aPreviewMedia", default)]
    pub preview_media: Option<Value>,
}

pub const MOD_MODEL_NAME: &str = "Mod";

impl SubfeedRecord {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }

    pub fn is_mod(&self) -> bool {
        self.model_name.as_deref() == Some(MOD_MODEL_NAME)
    }

    fn creator(&self) -> String {
        self.submitter
            .as_ref()
            .and_then(|s| s.get("_sName"))
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string()
    }

    fn image_url(&self) -> String {
        let first_image = self
            .preview_media
            .as_ref()
            .and_then(|m| m.get("_aImages"))
            .and_then(Value::as_array)
            .and_then(|images| images.first());

        match first_image {
            Some(image) => match (
                image.get("_sBaseUrl").and_then(Value::as_str),
                image.get("_sFile").and_then(Value::as_str),
            ) {
                (Some(base), Some(file)) => format!("{}/{}", base, file),
                _ => String::new(),
            },
            None => String::new(),
        }
    }

    /// Returns `None` for non-mod entries and for mods without an ID or name.
    pub fn into_summary(self) -> Option<ModSummary> {
        if !self.is_mod() {
            return None;
        }
        let creator = self.creator();
        let image_url = self.image_url();
        let id = self.id?;
        let name = self.name?;

        Some(ModSummary {
            id,
            name,
            creator,
            description: self.body.unwrap_or_default(),
            image_url,
            page_url: self.profile_url.unwrap_or_default(),
            updated_at: self.date_updated.unwrap_or(0),
            added_at: self.date_added.unwrap_or(0),
            views: self.view_count.unwrap_or(0),
            likes: self.like_count.unwrap_or(0),
        })
    }
}

/// Response from GET /Mod/{id}/DownloadPage
#[derive(Debug, Deserialize, Default)]
pub struct DownloadPageResponse {
    #[serde(rename = "_aFiles", default, deserialize_with = "lenient_files")]
    pub files: Vec<DownloadPageFile>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadPageFile {
    #[serde(rename = "_sFile", default, deserialize_with = "lenient_string")]
    pub file: Option<String>,
    #[serde(rename = "_sDownloadUrl", default, deserialize_with = "lenient_string")]
    pub download_url: Option<String>,
}

impl DownloadPageFile {
    pub fn into_mod_file(self) -> Option<ModFile> {
        let download_url = self.download_url.filter(|url| !url.is_empty())?;
        let file_name = self.file.unwrap_or_else(|| "unknown.zip".to_string());
        Some(ModFile {
            file_name,
            download_url,
        })
    }
}

/// Response from GET /Mod/{id}/ProfilePage. `_sText` is either a string or a one-element array.
#[derive(Debug, Deserialize)]
pub struct ProfilePageResponse {
    #[serde(rename = "_sText", default)]
    pub text: Option<Value>,
}

impl ProfilePageResponse {
    pub fn raw_text(&self) -> Option<String> {
        match self.text.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => Some(
                items
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            ),
            Value::Null => None,
            _ => Some(String::new()),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_string)))
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

fn lenient_files<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<DownloadPageFile>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_record_maps_to_summary() {
        let record = SubfeedRecord::from_value(json!({
            "_sModelName": "Mod",
            "_idRow": 512345,
            "_sName": "Better Garden",
            "_sProfileUrl": "https://gamebanana.com/mods/512345",
            "_sBody": "Adds plants",
            "_tsDateUpdated": 1700000100,
            "_tsDateAdded": 1690000000,
            "_nViewCount": 1234,
            "_nLikeCount": 56,
            "_aSubmitter": { "_sName": "gardener" },
            "_aPreviewMedia": { "_aImages": [
                { "_sBaseUrl": "https://images.gamebanana.com/img/ss/mods", "_sFile": "abc.jpg" }
            ]}
        }));

        let summary = record.into_summary().unwrap();
        assert_eq!(summary.id, "512345");
        assert_eq!(summary.name, "Better Garden");
        assert_eq!(summary.creator, "gardener");
        assert_eq!(
            summary.image_url,
            "https://images.gamebanana.com/img/ss/mods/abc.jpg"
        );
        assert_eq!(summary.updated_at, 1700000100);
        assert_eq!(summary.views, 1234);
        assert_eq!(summary.likes, 56);
    }

    #[test]
    fn optional_fields_default_when_missing_or_mistyped() {
        let record = SubfeedRecord::from_value(json!({
            "_sModelName": "Mod",
            "_idRow": "77",
            "_sName": "Bare",
            "_nViewCount": "lots",
            "_aPreviewMedia": { "_aImages": [] }
        }));

        let summary = record.into_summary().unwrap();
        assert_eq!(summary.creator, "N/A");
        assert_eq!(summary.image_url, "");
        assert_eq!(summary.description, "");
        assert_eq!(summary.views, 0);
        assert_eq!(summary.updated_at, 0);
    }

    #[test]
    fn non_mod_and_incomplete_records_are_rejected() {
        let wip = SubfeedRecord::from_value(json!({
            "_sModelName": "Wip", "_idRow": 1, "_sName": "Work in progress"
        }));
        assert!(wip.into_summary().is_none());

        let nameless = SubfeedRecord::from_value(json!({ "_sModelName": "Mod", "_idRow": 2 }));
        assert!(nameless.into_summary().is_none());

        let idless = SubfeedRecord::from_value(json!({ "_sModelName": "Mod", "_sName": "x" }));
        assert!(idless.into_summary().is_none());
    }

    #[test]
    fn download_page_tolerates_missing_files() {
        let page: DownloadPageResponse = serde_json::from_value(json!({})).unwrap();
        assert!(page.files.is_empty());

        let page: DownloadPageResponse = serde_json::from_value(json!({ "_aFiles": null })).unwrap();
        assert!(page.files.is_empty());
    }

    #[test]
    fn profile_text_accepts_string_or_array() {
        let page: ProfilePageResponse =
            serde_json::from_value(json!({ "_sText": ["<b>hi</b>"] })).unwrap();
        assert_eq!(page.raw_text().as_deref(), Some("<b>hi</b>"));

        let page: ProfilePageResponse = serde_json::from_value(json!({ "_sText": "plain" })).unwrap();
        assert_eq!(page.raw_text().as_deref(), Some("plain"));

        let page: ProfilePageResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(page.raw_text(), None);
    }
}
