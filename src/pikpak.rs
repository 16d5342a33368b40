//! PikPak drive API client.

use crate::catalog::{DownloadableFile, RemoteCatalog};
use crate::download::HttpContent;
use crate::error::DownloadError;
use crate::types::{EntryKind, RemoteEntry};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Default endpoint of the PikPak drive API.
pub const DEFAULT_API_URL: &str = "https://api-drive.mypikpak.com";

const FOLDER_KIND: &str = "drive#folder";
const OCTET_STREAM_LINK: &str = "application/octet-stream";

/// Connection settings for [`PikPakClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the drive API (default: [`DEFAULT_API_URL`]).
    pub base_url: String,
    /// Bearer token of an already established session.
    pub access_token: String,
    /// Entries requested per listing page (default: 100).
    pub page_size: u32,
}

impl ApiConfig {
    pub fn with_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            ..Self::default()
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            access_token: String::new(),
            page_size: 100,
        }
    }
}

#[derive(Deserialize, Debug)]
struct FileList {
    #[serde(default)]
    files: Vec<FileStat>,
    #[serde(default)]
    next_page_token: String,
}

#[derive(Deserialize, Debug)]
struct FileStat {
    id: String,
    name: String,
    kind: String,
    #[serde(default)]
    size: SizeField,
}

#[derive(Deserialize, Debug)]
struct FileDetail {
    id: String,
    name: String,
    #[serde(default)]
    size: SizeField,
    #[serde(default)]
    web_content_link: String,
    #[serde(default)]
    md5_checksum: String,
    #[serde(default)]
    links: HashMap<String, Link>,
}

#[derive(Deserialize, Debug)]
struct Link {
    #[serde(default)]
    url: String,
}

/// The API reports sizes as decimal strings; accept plain numbers too.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SizeField {
    Text(String),
    Number(u64),
}

impl Default for SizeField {
    fn default() -> Self {
        SizeField::Number(0)
    }
}

impl SizeField {
    fn bytes(&self) -> u64 {
        match self {
            SizeField::Text(text) => text.trim().parse().unwrap_or(0),
            SizeField::Number(n) => *n,
        }
    }
}

impl From<FileStat> for RemoteEntry {
    fn from(stat: FileStat) -> Self {
        let kind = if stat.kind == FOLDER_KIND {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        let size = match kind {
            EntryKind::Folder => 0,
            EntryKind::File => stat.size.bytes(),
        };
        RemoteEntry {
            id: stat.id,
            name: stat.name,
            kind,
            size,
        }
    }
}

/// Client for the PikPak drive API.
#[derive(Clone)]
pub struct PikPakClient {
    http: Client,
    base_url: Url,
    access_token: String,
    page_size: u32,
}

impl PikPakClient {
    pub fn new(config: ApiConfig) -> Result<Self, DownloadError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(&config.base_url)?,
            access_token: config.access_token,
            page_size: config.page_size.max(1),
        })
    }

    /// Checks that the access token is accepted by the drive.
    pub async fn authenticate(&self) -> Result<(), DownloadError> {
        if self.access_token.is_empty() {
            return Err(DownloadError::Unauthorized(
                "no access token configured".to_string(),
            ));
        }
        let url = self.endpoint("/drive/v1/about")?;
        let response = self.http.get(url).bearer_auth(&self.access_token).send().await?;
        let _: serde_json::Value = Self::handle_response(response).await?;
        Ok(())
    }

    async fn list_page(
        &self,
        folder_id: &str,
        page_token: &str,
    ) -> Result<FileList, DownloadError> {
        let filters = serde_json::json!({
            "trashed": { "eq": false },
            "phase": { "eq": "PHASE_TYPE_COMPLETE" },
        });

        let mut url = self.endpoint("/drive/v1/files")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("parent_id", folder_id)
                .append_pair("limit", &self.page_size.to_string())
                .append_pair("filters", &filters.to_string());
            if !page_token.is_empty() {
                query.append_pair("page_token", page_token);
            }
        }

        let response = self.http.get(url).bearer_auth(&self.access_token).send().await?;
        Self::handle_response(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, DownloadError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, DownloadError> {
        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DownloadError::Unauthorized(format!("{}: {}", status, body)))
            }
            _ => Err(DownloadError::Api { status, body }),
        }
    }
}

#[async_trait]
impl RemoteCatalog for PikPakClient {
    async fn list_folder(&self, folder_id: &str) -> Result<Vec<RemoteEntry>, DownloadError> {
        let mut entries = Vec::new();
        let mut page_token = String::new();
        loop {
            let page = self.list_page(folder_id, &page_token).await?;
            entries.extend(page.files.into_iter().map(RemoteEntry::from));
            if page.next_page_token.is_empty() {
                break;
            }
            page_token = page.next_page_token;
        }
        debug!("Folder {:?} has {} entries", folder_id, entries.len());
        Ok(entries)
    }

    async fn open_file(&self, file_id: &str) -> Result<DownloadableFile, DownloadError> {
        let mut url = self.endpoint(&format!("/drive/v1/files/{}", file_id))?;
        url.query_pairs_mut().append_pair("usage", "FETCH");
        let response = self.http.get(url).bearer_auth(&self.access_token).send().await?;
        let detail: FileDetail = Self::handle_response(response).await?;

        let link = detail
            .links
            .get(OCTET_STREAM_LINK)
            .map(|l| l.url.clone())
            .filter(|u| !u.is_empty())
            .or_else(|| Some(detail.web_content_link.clone()).filter(|u| !u.is_empty()))
            .ok_or_else(|| DownloadError::MissingDownloadLink(detail.id.clone()))?;
        let md5_checksum = Some(detail.md5_checksum).filter(|sum| !sum.is_empty());

        let size = detail.size.bytes();
        let content = HttpContent::new(self.http.clone(), link, size, md5_checksum);
        Ok(DownloadableFile::new(
            detail.id,
            detail.name,
            size,
            Arc::new(content),
        ))
    }
}
