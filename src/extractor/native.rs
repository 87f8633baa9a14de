//! Native Converter Module
//!
//! 外部プロセスに依存せず、Rustだけで実装した組み込みのドキュメントコンバーター。
//! 拡張子から入力形式を判定し、形式ごとの変換処理に振り分けます。

use std::panic::{self, UnwindSafe};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use calamine::{open_workbook_auto, Data, Range, Reader};
use encoding_rs::{Encoding, WINDOWS_1252};
use tracing::debug;

use crate::api::InputFormat;
use crate::error::Doc2XlsxError;
use crate::extractor::document::{Block, Document};
use crate::extractor::{docx, DocumentConverter};
use crate::security::SecurityConfig;

/// 組み込みコンバーター
///
/// 対応形式は`InputFormat`を参照してください。
///
/// # 使用例
///
/// ```rust,no_run
/// use doc2xlsx::{DocumentConverter, NativeConverter};
/// use std::path::Path;
///
/// # fn main() -> Result<(), doc2xlsx::Doc2XlsxError> {
/// let converter = NativeConverter::new();
/// let document = converter.convert(Path::new("report.docx"))?;
/// println!("{}", document.render_markdown());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct NativeConverter {
    security: SecurityConfig,
}

impl NativeConverter {
    /// デフォルトのセキュリティ設定でコンバーターを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// セキュリティ設定を指定してコンバーターを生成
    pub fn with_security(security: SecurityConfig) -> Self {
        Self { security }
    }
}

impl DocumentConverter for NativeConverter {
    fn convert(&self, path: &Path) -> Result<Document, Doc2XlsxError> {
        let format = InputFormat::from_path(path).ok_or_else(|| {
            let extension = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| "(no extension)".to_string());
            Doc2XlsxError::UnsupportedFormat(extension)
        })?;

        let size = self.security.check_input_file(path)?;
        debug!("Converting {} ({:?}, {} bytes)", path.display(), format, size);

        let document = match format {
            InputFormat::Text => convert_text(path)?,
            InputFormat::Html => convert_html(path)?,
            InputFormat::Docx => docx::convert_docx(path, &self.security)?,
            InputFormat::Pdf => convert_pdf(path)?,
            InputFormat::Spreadsheet => convert_spreadsheet(path)?,
        };

        if document.is_blank() {
            return Err(Doc2XlsxError::Conversion(
                "document produced no text".to_string(),
            ));
        }

        Ok(document.with_format(format))
    }

    fn name(&self) -> &str {
        "native"
    }
}

/// テキストファイルをそのままMarkdownとして扱う
fn convert_text(path: &Path) -> Result<Document, Doc2XlsxError> {
    let data = std::fs::read(path)?;
    Ok(Document::from_markdown(decode_text(&data)))
}

/// HTMLをMarkdownに変換する
///
/// 変換結果が空の場合はタグを取り除いたテキストを使用します。
fn convert_html(path: &Path) -> Result<Document, Doc2XlsxError> {
    let data = std::fs::read(path)?;
    let html = decode_text(&data);
    let mut markdown = html2md::parse_html(&html);
    if markdown.trim().is_empty() {
        markdown = strip_tags(&html);
    }
    Ok(Document::from_markdown(markdown))
}

/// PDFからテキストを抽出し、空行区切りで段落に分割する
fn convert_pdf(path: &Path) -> Result<Document, Doc2XlsxError> {
    // pdf-extractは不正なPDFでpanicすることがあるため、エラーとして扱う
    let extracted = catch_quietly(|| pdf_extract::extract_text(path))
        .map_err(|_| Doc2XlsxError::Pdf("parser panicked".to_string()))?
        .map_err(|e| Doc2XlsxError::Pdf(e.to_string()))?;

    let blocks = split_paragraphs(&extracted)
        .into_iter()
        .map(Block::Paragraph)
        .collect();
    Ok(Document::new(blocks))
}

/// パニックフックの差し替えを直列化する
static PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

/// パニックを捕捉し、プロセス全体のパニックフックを呼ばずに`Err`として返す
///
/// 実行中だけフックをdebugログ出力に差し替え、終了後に元のフックへ戻します。
fn catch_quietly<T>(f: impl FnOnce() -> T + UnwindSafe) -> std::thread::Result<T> {
    let _lock = PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|info| debug!("Recovered panic: {}", info)));
    let result = panic::catch_unwind(f);
    panic::set_hook(previous);
    result
}

/// スプレッドシートの各シートを見出し＋テーブルに変換する
fn convert_spreadsheet(path: &Path) -> Result<Document, Doc2XlsxError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    let mut blocks = Vec::new();
    let mut warnings = Vec::new();
    for name in sheet_names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows = range_rows(&range);
                if rows.is_empty() {
                    continue;
                }
                blocks.push(Block::Heading {
                    level: 2,
                    text: name,
                });
                blocks.push(Block::Table(rows));
            }
            Err(e) => warnings.push(format!("sheet '{}' skipped: {}", name, e)),
        }
    }

    let mut document = Document::new(blocks);
    for warning in warnings {
        document.push_warning(warning);
    }
    Ok(document)
}

/// シートの値を文字列の行に変換する
///
/// 各行の末尾の空セルと、完全に空の行は除外します。
fn range_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .filter_map(|row| {
            let mut values: Vec<String> = row.iter().map(cell_text).collect();
            let last = values.iter().rposition(|value| !value.trim().is_empty())?;
            values.truncate(last + 1);
            Some(values)
        })
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// バイト列をテキストにデコードする
///
/// BOMがあればそのエンコーディング、なければUTF-8、UTF-8として不正ならWindows-1252。
pub(crate) fn decode_text(data: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(data) {
        let (text, _) = encoding.decode_without_bom_handling(&data[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(data);
            text.into_owned()
        }
    }
}

/// 空行で段落に分割し、段落内の空白を正規化する
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(normalize_spaces(&current.join("\n")));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(normalize_spaces(&current.join("\n")));
    }
    paragraphs
}

fn normalize_spaces(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}
