//! Extractor Module
//!
//! ドキュメント変換エンジン（`DocumentConverter`）をラップし、
//! 入力ファイルからMarkdownテキストを取り出すモジュール。
//! 変換に失敗した場合もエラーを返さず、エラーレポートのMarkdownを生成します。

mod document;
mod docx;
mod native;

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::error::Doc2XlsxError;

pub use document::{Block, Document};
pub use native::NativeConverter;

/// ドキュメント変換エンジンの抽象化
///
/// ファイルパスを受け取り、Markdownにレンダリング可能な`Document`を返します。
/// 組み込みの`NativeConverter`の代わりに、任意の実装をパイプラインに注入できます。
/// `Fn(&Path) -> Result<Document, Doc2XlsxError>`を満たすクロージャもそのまま使用できます。
///
/// # 使用例
///
/// ```rust
/// use doc2xlsx::{Document, DocumentConverter, Doc2XlsxError};
/// use std::path::Path;
///
/// struct Fixed;
///
/// impl DocumentConverter for Fixed {
///     fn convert(&self, _path: &Path) -> Result<Document, Doc2XlsxError> {
///         Ok(Document::from_markdown("| a |\n|---|\n| 1 |\n"))
///     }
/// }
///
/// let document = Fixed.convert(Path::new("any.pdf")).unwrap();
/// assert_eq!(document.render_markdown(), "| a |\n|---|\n| 1 |\n");
/// ```
pub trait DocumentConverter {
    /// ファイルを構造化ドキュメントに変換する
    fn convert(&self, path: &Path) -> Result<Document, Doc2XlsxError>;

    /// ログ出力用の名前
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> DocumentConverter for F
where
    F: Fn(&Path) -> Result<Document, Doc2XlsxError>,
{
    fn convert(&self, path: &Path) -> Result<Document, Doc2XlsxError> {
        self(path)
    }
}

/// 抽出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Markdownテキスト（失敗時はエラーレポート）
    pub markdown: String,
    /// 変換に失敗した場合のエラーメッセージ
    pub error: Option<String>,
}

impl Extraction {
    /// 変換に失敗し、エラーレポートを返したかどうか
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// ドキュメント抽出器
///
/// 変換エンジンの呼び出しと、失敗時のフォールバックを担当します。
pub struct Extractor {
    converter: Box<dyn DocumentConverter>,
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("converter", &self.converter.name())
            .finish()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Box::new(NativeConverter::new()))
    }
}

impl Extractor {
    /// 変換エンジンを指定して抽出器を生成
    pub fn new(converter: Box<dyn DocumentConverter>) -> Self {
        Self { converter }
    }

    /// ファイルからMarkdownテキストを抽出する
    ///
    /// 変換エンジンが失敗した場合は、ファイル名とエラーメッセージを含む
    /// エラーレポートのMarkdownを返します。このメソッドは失敗しません。
    pub fn extract(&self, path: &Path) -> String {
        self.extract_with_status(path).markdown
    }

    /// `extract()`と同じだが、失敗したかどうかも返す
    pub fn extract_with_status(&self, path: &Path) -> Extraction {
        info!(
            "Extracting text from: {} (converter: {})",
            path.display(),
            self.converter.name()
        );

        match self.converter.convert(path) {
            Ok(document) => {
                for warning in document.warnings() {
                    warn!("{}", warning);
                }
                let markdown = document.render_markdown();
                info!(
                    "Successfully extracted {} chars of text",
                    markdown.chars().count()
                );
                Extraction {
                    markdown,
                    error: None,
                }
            }
            Err(e) => {
                warn!("Error extracting text: {}", e.chain());
                let message = e.to_string();
                Extraction {
                    markdown: error_report(path, &message),
                    error: Some(message),
                }
            }
        }
    }
}

/// 抽出失敗時に出力するMarkdown
pub(crate) fn error_report(path: &Path, message: &str) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!(
        "# Error extracting text\n\nFailed to extract text from {}\n\nError: {}",
        file_name, message
    )
}
