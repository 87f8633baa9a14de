//! Security Module
//!
//! 入力ドキュメントに対するセキュリティ制限を実装するモジュール。
//! 巨大ファイル、ZIP bomb攻撃、パストラバーサル攻撃などへの対策を提供します。

use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::Doc2XlsxError;

/// セキュリティ設定
///
/// 組み込みコンバーターが入力ファイルを処理する際の上限値を定義します。
///
/// # 使用例
///
/// ```rust
/// use doc2xlsx::SecurityConfig;
///
/// let config = SecurityConfig {
///     max_input_file_size: 10 * 1024 * 1024,
///     ..SecurityConfig::default()
/// };
/// assert_eq!(config.max_file_count, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 512MB (536_870_912 bytes)
    pub max_input_file_size: u64,
    /// ZIPアーカイブ内の最大エントリ数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの最大展開サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 展開後の合計最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 536_870_912, // 512MB
            max_file_count: 10_000,
            max_file_size: 104_857_600,           // 100MB
            max_decompressed_size: 1_073_741_824, // 1GB
        }
    }
}

impl SecurityConfig {
    /// 入力ファイルのサイズを検証する
    ///
    /// # 戻り値
    ///
    /// * `Ok(u64)` - ファイルサイズ（バイト）
    /// * `Err(Doc2XlsxError::Io)` - メタデータが取得できない場合
    /// * `Err(Doc2XlsxError::SecurityViolation)` - 上限を超えた場合
    pub(crate) fn check_input_file(&self, path: &Path) -> Result<u64, Doc2XlsxError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_input_file_size {
            return Err(Doc2XlsxError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(size)
    }

    /// ZIPアーカイブ全体のエントリ数・サイズ・パスを検証する
    ///
    /// 実際にエントリを展開する前に呼び出します。
    pub(crate) fn check_zip_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), Doc2XlsxError> {
        if archive.len() > self.max_file_count {
            return Err(Doc2XlsxError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Doc2XlsxError::Zip(e.to_string()))?;

            validate_zip_path(entry.name()).map_err(|e| {
                Doc2XlsxError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let entry_size = entry.size();
            if entry_size > self.max_file_size {
                return Err(Doc2XlsxError::SecurityViolation(format!(
                    "ZIP entry '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    entry.name(),
                    entry_size,
                    self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(entry_size)
                .ok_or_else(|| {
                    Doc2XlsxError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(Doc2XlsxError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// ZIPエントリ名の検証
///
/// 空のパス、絶対パス、`..`を含むパス、バックスラッシュ区切りを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // Unix形式の`/`やドライブレター付きのパス
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || has_drive {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}
