// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sha2::{Digest, Sha256};

/// 空内容 `""` 的 SHA-256
pub const EMPTY_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// 空差异列表 `"[]"` 的 SHA-256
pub const EMPTY_DIFF_HASH: &str = "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945";

/// 报告中代替"无变化"哈希的占位文本
pub const NO_CHANGE: &str = "no change";

/// 计算内容的 SHA-256 十六进制指纹
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 是否为表示"无变化"的哈希
pub fn is_no_change(hash: &str) -> bool {
    hash == EMPTY_HASH || hash == EMPTY_DIFF_HASH
}

/// 报告中展示的哈希文本
pub fn display_hash(hash: Option<&str>) -> String {
    match hash {
        Some(h) if is_no_change(h) => NO_CHANGE.to_string(),
        Some(h) => h.to_string(),
        None => String::new(),
    }
}
