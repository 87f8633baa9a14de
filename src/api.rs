//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::path::Path;

use serde::Serialize;

/// 入力ドキュメントの形式
///
/// 組み込みコンバーター（`NativeConverter`）が拡張子から判定する形式です。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum InputFormat {
    /// プレーンテキストまたはMarkdown
    ///
    /// 対応拡張子: `md`, `markdown`, `txt`, `text`, `log`
    Text,

    /// HTML
    ///
    /// 対応拡張子: `html`, `htm`, `xhtml`
    Html,

    /// Word文書（Office Open XML）
    ///
    /// 対応拡張子: `docx`
    Docx,

    /// PDF
    ///
    /// 対応拡張子: `pdf`
    Pdf,

    /// スプレッドシート
    ///
    /// 対応拡張子: `xlsx`, `xlsm`, `xls`, `xlsb`, `ods`
    Spreadsheet,
}

impl InputFormat {
    /// 拡張子（先頭の`.`の有無、大文字小文字は問わない）から形式を判定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use doc2xlsx::InputFormat;
    ///
    /// assert_eq!(InputFormat::from_extension("DOCX"), Some(InputFormat::Docx));
    /// assert_eq!(InputFormat::from_extension(".md"), Some(InputFormat::Text));
    /// assert_eq!(InputFormat::from_extension("exe"), None);
    /// ```
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "md" | "markdown" | "txt" | "text" | "log" => Some(InputFormat::Text),
            "html" | "htm" | "xhtml" => Some(InputFormat::Html),
            "docx" => Some(InputFormat::Docx),
            "pdf" => Some(InputFormat::Pdf),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(InputFormat::Spreadsheet),
            _ => None,
        }
    }

    /// パスの拡張子から形式を判定する
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}
