// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 服务层单元测试共用的内存变更源

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::models::site::{Page, Site};
use crate::domain::models::version::{DiffKind, RemoteVersion, Version};
use crate::domain::repositories::change_source::{ChangeSource, Listing};
use crate::utils::errors::SourceError;

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Body(&'static str),
    Gone,
    Status(u16),
}

#[derive(Default)]
pub struct FakeSource {
    pub page_size: usize,
    pub sites: Vec<Site>,
    pub pages: HashMap<String, Vec<Page>>,
    pub versions: HashMap<String, Vec<RemoteVersion>>,
    pub responses: HashMap<String, FakeResponse>,
    pub fetch_delay: Duration,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            page_size: 2,
            ..Self::default()
        }
    }

    fn paged<T: Clone>(records: &[T], cursor: Option<&str>, size: usize, base: &str) -> Listing<T> {
        let offset: usize = cursor
            .and_then(|c| c.rsplit('=').next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let size = size.max(1);
        let end = (offset + size).min(records.len());
        let next = (end < records.len()).then(|| format!("{}?offset={}", base, end));
        Listing {
            records: records.get(offset..end).unwrap_or_default().to_vec(),
            next,
        }
    }

    async fn respond(&self, url: String) -> Result<Bytes, SourceError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls.lock().push(url.clone());
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.responses.get(&url) {
            Some(FakeResponse::Body(body)) => Ok(Bytes::from_static(body.as_bytes())),
            Some(FakeResponse::Gone) | None => Err(SourceError::Gone(url)),
            Some(FakeResponse::Status(status)) => Err(SourceError::Status {
                status: *status,
                url,
            }),
        }
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == url).count()
    }
}

#[async_trait]
impl ChangeSource for FakeSource {
    async fn list_sites(&self, cursor: Option<&str>) -> Result<Listing<Site>, SourceError> {
        self.calls.lock().push(format!("list sites {:?}", cursor));
        Ok(Self::paged(&self.sites, cursor, self.page_size, "sites"))
    }

    async fn list_pages(
        &self,
        site: &Site,
        cursor: Option<&str>,
    ) -> Result<Listing<Page>, SourceError> {
        self.calls.lock().push(format!("list pages {} {:?}", site.id, cursor));
        let pages = self.pages.get(&site.id).cloned().unwrap_or_default();
        Ok(Self::paged(&pages, cursor, self.page_size, "pages"))
    }

    async fn list_versions(
        &self,
        page: &Page,
        cursor: Option<&str>,
    ) -> Result<Listing<RemoteVersion>, SourceError> {
        let versions = self
            .versions
            .get(&page.id)
            .cloned()
            .ok_or_else(|| SourceError::Gone(page.id.clone()))?;
        Ok(Self::paged(&versions, cursor, self.page_size, "versions"))
    }

    async fn fetch_content(&self, url: &str) -> Result<Bytes, SourceError> {
        self.respond(url.to_string()).await
    }

    async fn fetch_diff(&self, url: &str, kind: DiffKind) -> Result<Bytes, SourceError> {
        self.respond(format!("{}#{}", url, kind)).await
    }
}

pub fn ts(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, day, hour, minute, 0).unwrap()
}

pub fn site(id: &str, name: &str) -> Site {
    Site {
        id: id.to_string(),
        name: name.to_string(),
        url: format!("https://{}.gov", id),
        last_change_date: None,
    }
}

pub fn page(id: &str, site_id: &str) -> Page {
    Page {
        id: id.to_string(),
        site_id: site_id.to_string(),
        url: format!("https://example.gov/{}", id),
        total_versions_hint: None,
        title: Some(format!("Page {}", id)),
        tags: Vec::new(),
        view_url: Some(format!("https://source.test/pages/{}", id)),
        last_change_date: None,
    }
}

pub fn remote(id: &str, date: Option<&str>, error_code: Option<u16>) -> RemoteVersion {
    RemoteVersion {
        id: id.to_string(),
        date: date.map(str::to_string),
        has_content: true,
        error_code,
        content_url: Some(format!("https://source.test/content/{}", id)),
        diff_url: Some(format!("https://source.test/diff/{}", id)),
        diff_safe_url: Some(format!("https://source.test/diff-safe/{}", id)),
    }
}

pub fn version(id: &str, page_id: &str, date: DateTime<Utc>) -> Version {
    let mut record = remote(id, Some(&date.to_rfc3339()), None);
    record.has_content = true;
    record
        .into_version("s1", page_id)
        .unwrap_or_else(|| panic!("fixture version {} must be dated", id))
}
