// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;

use crate::domain::models::archive::ArchiveEntry;
use crate::domain::repositories::archive_source::{ArchiveError, ArchiveProvider, ArchiveSource};

/// 目录形式的批量归档
///
/// 条目按文件名排序，时间戳取文件修改时间，内容在拉取时才读取。
pub struct DirectoryArchive {
    root: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
}

impl DirectoryArchive {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let root = root.into();
        if !fs::try_exists(&root).await? {
            return Err(ArchiveError::NotFound(root.display().to_string()));
        }

        let mut files = Vec::new();
        let mut dir = fs::read_dir(&root).await?;
        while let Some(item) = dir.next_entry().await? {
            if item.file_type().await?.is_file() {
                files.push(item.path());
            }
        }
        files.sort();

        Ok(Self {
            root,
            files,
            cursor: 0,
        })
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[async_trait]
impl ArchiveSource for DirectoryArchive {
    async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, ArchiveError> {
        let Some(path) = self.files.get(self.cursor).cloned() else {
            return Ok(None);
        };
        self.cursor += 1;

        let modified = fs::metadata(&path)
            .await?
            .modified()
            .map_err(|e| ArchiveError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let content = fs::read(&path).await?;

        Ok(Some(ArchiveEntry::new(
            self.relative(&path),
            DateTime::<Utc>::from(modified),
            Bytes::from(content),
        )))
    }

    async fn restart(&mut self) -> Result<(), ArchiveError> {
        self.cursor = 0;
        Ok(())
    }
}

/// 以 `<root>/<page_id>/` 目录作为每个页面的归档
pub struct DirectoryArchiveProvider {
    root: PathBuf,
}

impl DirectoryArchiveProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArchiveProvider for DirectoryArchiveProvider {
    async fn open(&self, page_id: &str) -> Result<Box<dyn ArchiveSource>, ArchiveError> {
        if page_id.is_empty() || page_id.contains(['/', '\\']) || page_id == ".." {
            return Err(ArchiveError::NotFound(page_id.to_string()));
        }
        let archive = DirectoryArchive::open(self.root.join(page_id)).await?;
        Ok(Box::new(archive))
    }
}

/// 内存归档（用于测试与试运行）
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchive {
    entries: Vec<ArchiveEntry>,
    cursor: usize,
}

impl InMemoryArchive {
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self { entries, cursor: 0 }
    }
}

#[async_trait]
impl ArchiveSource for InMemoryArchive {
    async fn next_entry(&mut self) -> Result<Option<ArchiveEntry>, ArchiveError> {
        let entry = self.entries.get(self.cursor).cloned();
        if entry.is_some() {
            self.cursor += 1;
        }
        Ok(entry)
    }

    async fn restart(&mut self) -> Result<(), ArchiveError> {
        self.cursor = 0;
        Ok(())
    }
}
