//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;

use thiserror::Error;

/// doc2xlsxクレート全体で使用するエラー型
///
/// ドキュメントの変換、Markdownファイルの読み書き、テーブルの構築、
/// ワークブックの書き込み中に発生するすべてのエラーを統一的に扱います。
///
/// # エラーの分類
///
/// - 抽出エラー（`Spreadsheet`, `Zip`, `Xml`, `Pdf`, `UnsupportedFormat`, `Conversion`,
///   `SecurityViolation`）: `Extractor`内で捕捉され、エラーレポートのMarkdownに変換される
/// - I/Oエラー（`Io`, `InputNotFound`, `MarkdownWrite`, `MarkdownRead`, `Utf8`, `Xlsx`）:
///   パイプラインを中断し、終了コード1になる
/// - テーブル構築エラー（`Table`）: テーブル単位で捕捉され、残りのテーブルは処理を続行する
///
/// # 使用例
///
/// ```rust,no_run
/// use doc2xlsx::Doc2XlsxError;
/// use std::fs::File;
///
/// fn open_input(path: &str) -> Result<(), Doc2XlsxError> {
///     let _file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum Doc2XlsxError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 入力ファイルが存在しない
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Markdownファイルの書き込みに失敗した
    #[error("Failed to write markdown file {}: {source}", path.display())]
    MarkdownWrite {
        /// 書き込み先のパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// Markdownファイルの読み込みに失敗した
    #[error("Failed to read markdown file {}: {source}", path.display())]
    MarkdownRead {
        /// 読み込み元のパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// ワークブックの書き込みエラー（rust_xlsxwriter由来）
    #[error("Failed to write Excel file: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// 入力スプレッドシートの解析エラー（calamine由来）
    #[error("Failed to parse spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// ZIPアーカイブの解析エラー
    ///
    /// DOCXファイル（ZIPアーカイブ）の解析中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// PDFからのテキスト抽出エラー
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),

    /// サポートされていない入力形式
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// その他の変換エラー
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// テーブルの構築に失敗したエラー
    ///
    /// `index`は検出順（1始まり）のブロック番号です。
    #[error("Error processing table {index}: {message}")]
    Table {
        /// ブロック番号（1始まり）
        index: usize,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `PipelineBuilder::build()`時に設定を検証し、無効な設定が検出された
    /// 場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use doc2xlsx::{PipelineBuilder, Doc2XlsxError};
    ///
    /// let result = PipelineBuilder::new()
    ///     .with_markdown_path("")
    ///     .build();
    ///
    /// match result {
    ///     Err(Doc2XlsxError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl Doc2XlsxError {
    /// エラーとその原因チェーンを1行の文字列に連結する
    ///
    /// ログ出力用です。例: `"Failed to write markdown file out.md: IO error: denied"`
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            let cause_message = cause.to_string();
            // thiserrorの表示文字列に原因が既に含まれている場合は重複させない
            if !message.contains(&cause_message) {
                message.push_str(": ");
                message.push_str(&cause_message);
            }
            source = cause.source();
        }
        message
    }
}
