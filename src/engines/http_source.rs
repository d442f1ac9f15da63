// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::{DiffKind, RemoteVersion};
use crate::domain::repositories::change_source::{ChangeSource, Listing};
use crate::utils::errors::SourceError;

/// 列表接口响应体
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<String>,
}

/// 列表接口中的页面记录
#[derive(Debug, Deserialize)]
struct RemotePage {
    id: String,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    view_url: Option<String>,
    #[serde(default, alias = "total_versions")]
    total_versions_hint: Option<u64>,
    #[serde(default)]
    last_change_date: Option<DateTime<Utc>>,
}

impl RemotePage {
    fn into_page(self, site_id: &str) -> Page {
        Page {
            id: self.id,
            site_id: site_id.to_string(),
            url: self.url,
            total_versions_hint: self.total_versions_hint,
            title: self.title,
            tags: self.tags,
            view_url: self.view_url,
            last_change_date: self.last_change_date,
        }
    }
}

/// 基于 reqwest 的变更源
///
/// 访问 JSON 接口：`{base}/sites`、`{base}/sites/{id}/pages`、`{base}/pages/{id}/versions`，
/// 每页响应形如 `{"data": [...], "links": {"next": ...}}`
pub struct HttpChangeSource {
    client: reqwest::Client,
    base_url: Url,
    api_token: String,
}

impl HttpChangeSource {
    /// 创建变更源客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 接口根地址
    /// * `api_token` - Bearer 访问令牌
    /// * `timeout` - 单次请求超时
    pub fn new(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SourceError::Other(format!("Invalid base url {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; versionwatch/0.1)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token: api_token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::Other(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(SourceError::Gone(url.to_string())),
            status => Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    async fn get_listing<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<ListResponse<T>, SourceError> {
        let body = self.get(url).await?.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| SourceError::Decode(format!("{}: {}", url, e)))
    }

    fn first_or_cursor(&self, cursor: Option<&str>, path: &str) -> Result<String, SourceError> {
        match cursor {
            Some(next) => Ok(self.endpoint(next)?.to_string()),
            None => Ok(self.endpoint(path)?.to_string()),
        }
    }
}

#[async_trait]
impl ChangeSource for HttpChangeSource {
    async fn list_sites(&self, cursor: Option<&str>) -> Result<Listing<Site>, SourceError> {
        let url = self.first_or_cursor(cursor, "sites")?;
        let response: ListResponse<Site> = self.get_listing(&url).await?;
        Ok(Listing {
            records: response.data,
            next: response.links.next,
        })
    }

    async fn list_pages(
        &self,
        site: &Site,
        cursor: Option<&str>,
    ) -> Result<Listing<Page>, SourceError> {
        let url = self.first_or_cursor(cursor, &format!("sites/{}/pages", site.id))?;
        let response: ListResponse<RemotePage> = self.get_listing(&url).await?;
        Ok(Listing {
            records: response
                .data
                .into_iter()
                .map(|page| page.into_page(&site.id))
                .collect(),
            next: response.links.next,
        })
    }

    async fn list_versions(
        &self,
        page: &Page,
        cursor: Option<&str>,
    ) -> Result<Listing<RemoteVersion>, SourceError> {
        let url = self.first_or_cursor(cursor, &format!("pages/{}/versions", page.id))?;
        let response: ListResponse<RemoteVersion> = self.get_listing(&url).await?;
        Ok(Listing {
            records: response.data,
            next: response.links.next,
        })
    }

    async fn fetch_content(&self, url: &str) -> Result<Bytes, SourceError> {
        Ok(self.get(url).await?.bytes().await?)
    }

    async fn fetch_diff(&self, url: &str, kind: DiffKind) -> Result<Bytes, SourceError> {
        let url = diff_url_for(url, kind)?;
        Ok(self.get(&url).await?.bytes().await?)
    }
}

/// 文本差异通过 `format=text` 查询参数请求
pub fn diff_url_for(url: &str, kind: DiffKind) -> Result<String, SourceError> {
    match kind {
        DiffKind::Full => Ok(url.to_string()),
        DiffKind::Text => {
            let mut parsed = Url::parse(url)
                .map_err(|e| SourceError::Other(format!("Invalid diff url {}: {}", url, e)))?;
            parsed.query_pairs_mut().append_pair("format", "text");
            Ok(parsed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_diff_url_gets_format_param() {
        assert_eq!(
            diff_url_for("https://source.test/diff/1:2", DiffKind::Text).unwrap(),
            "https://source.test/diff/1:2?format=text"
        );
        assert_eq!(
            diff_url_for("https://source.test/diff?a=1", DiffKind::Text).unwrap(),
            "https://source.test/diff?a=1&format=text"
        );
        assert_eq!(
            diff_url_for("https://source.test/diff/1:2", DiffKind::Full).unwrap(),
            "https://source.test/diff/1:2"
        );
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let source =
            HttpChangeSource::new("https://source.test/api/v1", "token", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            source.endpoint("sites").unwrap().as_str(),
            "https://source.test/api/v1/sites"
        );
    }
}
