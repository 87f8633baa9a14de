//! Output Module
//!
//! Markdownファイルの読み書きと、テーブルをXLSXワークブックに書き出す処理を提供するモジュール。

mod workbook;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Doc2XlsxError;
use crate::table::find_tables;
use crate::types::{TableBlock, WorkbookReport};

pub(crate) use workbook::{WorkbookGuard, MAX_CELL_CHARS};

/// ワークブックの拡張子
pub const WORKBOOK_EXTENSION: &str = "xlsx";

/// テーブルがない場合のシート名
pub const INFO_SHEET: &str = "Info";

/// 全文を格納するシート名
pub const FULL_TEXT_SHEET: &str = "Full_Text";

/// テーブルシート名（1始まり）
pub fn table_sheet_name(index: usize) -> String {
    format!("Table_{}", index)
}

/// 出力パスの拡張子を`.xlsx`に正規化する
///
/// 大文字小文字を区別せず`.xlsx`で終わるパスはそのまま返し、
/// それ以外は拡張子を`.xlsx`に置き換えます（拡張子がなければ付加します）。
///
/// # 使用例
///
/// ```rust
/// use doc2xlsx::normalize_workbook_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(normalize_workbook_path(Path::new("out.XLSX")), PathBuf::from("out.XLSX"));
/// assert_eq!(normalize_workbook_path(Path::new("out.csv")), PathBuf::from("out.xlsx"));
/// assert_eq!(normalize_workbook_path(Path::new("out")), PathBuf::from("out.xlsx"));
/// ```
pub fn normalize_workbook_path(path: &Path) -> PathBuf {
    let lower = path.to_string_lossy().to_lowercase();
    if lower.ends_with(".xlsx") {
        return path.to_path_buf();
    }
    let normalized = path.with_extension(WORKBOOK_EXTENSION);
    info!(
        "Changed output extension to .xlsx: {}",
        normalized.display()
    );
    normalized
}

/// Markdownパスから既定のワークブックパスを求める
pub fn default_workbook_path(markdown_path: &Path) -> PathBuf {
    markdown_path.with_extension(WORKBOOK_EXTENSION)
}

/// MarkdownテキストをUTF-8でそのまま書き込む
pub fn write_markdown(path: &Path, markdown: &str) -> Result<(), Doc2XlsxError> {
    std::fs::write(path, markdown).map_err(|source| Doc2XlsxError::MarkdownWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// MarkdownファイルをUTF-8として読み込む
///
/// 改行コードは`\n`に統一します（`\r\n`と単独の`\r`を変換）。
pub fn read_markdown(path: &Path) -> Result<String, Doc2XlsxError> {
    let data = std::fs::read(path).map_err(|source| Doc2XlsxError::MarkdownRead {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(data)?;
    Ok(normalize_newlines(text))
}

fn normalize_newlines(text: String) -> String {
    if !text.contains('\r') {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// 全文をセル長の上限ごとに分割し、1チャンク1行の行列にする
///
/// 上限を超える全文も、続きの行に分けて欠落なく格納します。
fn text_rows(full_text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut chunk = String::new();
    let mut count = 0;
    for ch in full_text.chars() {
        if count == MAX_CELL_CHARS {
            rows.push(vec![std::mem::take(&mut chunk)]);
            count = 0;
        }
        chunk.push(ch);
        count += 1;
    }
    rows.push(vec![chunk]);
    rows
}

/// ワークブックライター
///
/// テーブルごとに`Table_<n>`シート、最後に`Full_Text`シートを書き込みます。
/// テーブルが1つもない場合は`Info`シートだけを書き込みます。
///
/// # 使用例
///
/// ```rust,no_run
/// use doc2xlsx::{find_tables, WorkbookWriter};
/// use std::path::Path;
///
/// # fn main() -> Result<(), doc2xlsx::Doc2XlsxError> {
/// let text = "| A | B |\n|---|---|\n| 1 | 2 |\n";
/// let report = WorkbookWriter::new()
///     .fit_columns(false)
///     .write(Path::new("tables.xlsx"), &find_tables(text), text)?;
/// assert_eq!(report.sheets, vec!["Table_1", "Full_Text"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WorkbookWriter {
    fit_columns: bool,
}

impl Default for WorkbookWriter {
    fn default() -> Self {
        Self { fit_columns: true }
    }
}

impl WorkbookWriter {
    /// デフォルト設定（列幅の自動調整あり）でライターを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 列幅をセルの表示幅に合わせるかどうか
    pub fn fit_columns(mut self, fit: bool) -> Self {
        self.fit_columns = fit;
        self
    }

    /// テーブルと全文をワークブックに書き込む
    ///
    /// # 引数
    ///
    /// * `output_path` - 出力先（拡張子は`.xlsx`に正規化されます）
    /// * `tables` - 書き込むテーブル
    /// * `full_text` - 全文（`Full_Text`または`Info`シートに格納。セル長の上限を超える分は続きの行に格納）
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookReport)` - 書き込んだパスとシート名
    /// * `Err(Doc2XlsxError)` - `Info`/`Full_Text`シートまたは保存に失敗した場合
    ///
    /// テーブルシートの書き込みに失敗した場合は警告を出力してスキップします。
    pub fn write(
        &self,
        output_path: &Path,
        tables: &[TableBlock],
        full_text: &str,
    ) -> Result<WorkbookReport, Doc2XlsxError> {
        let path = normalize_workbook_path(output_path);
        let mut guard = WorkbookGuard::open(&path, self.fit_columns);

        if tables.is_empty() {
            let mut rows = vec![
                vec!["No tables found in document".to_string()],
                vec!["Raw Text:".to_string()],
            ];
            rows.extend(text_rows(full_text));
            guard.add_sheet(INFO_SHEET, &[INFO_SHEET.to_string()], &rows)?;
        } else {
            for (i, table) in tables.iter().enumerate() {
                let name = table_sheet_name(i + 1);
                if let Err(e) = guard.add_sheet(&name, table.headers(), table.rows()) {
                    warn!("Error writing sheet {}: {}", name, e);
                }
            }
            let mut rows = vec![vec!["Full Text Content:".to_string()]];
            rows.extend(text_rows(full_text));
            guard.add_sheet(FULL_TEXT_SHEET, &["Content".to_string()], &rows)?;
        }

        let sheets = guard.finish()?;
        info!(
            "Excel file created successfully: {} ({} sheets)",
            path.display(),
            sheets.len()
        );

        Ok(WorkbookReport {
            path,
            sheets,
            table_count: tables.len(),
        })
    }

    /// Markdownファイルを読み込み、検出したテーブルをワークブックに書き込む
    ///
    /// `output_path`が`None`の場合は、Markdownパスの拡張子を`.xlsx`に置き換えたパスに書き込みます。
    pub fn write_from_markdown(
        &self,
        markdown_path: &Path,
        output_path: Option<&Path>,
    ) -> Result<WorkbookReport, Doc2XlsxError> {
        let output = output_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_workbook_path(markdown_path));

        let text = read_markdown(markdown_path)?;
        let tables = find_tables(&text);
        self.write(&output, &tables, &text)
    }
}

/// デフォルト設定でワークブックを書き込み、書き込んだパスを返す
pub fn write_workbook(
    output_path: &Path,
    tables: &[TableBlock],
    full_text: &str,
) -> Result<PathBuf, Doc2XlsxError> {
    WorkbookWriter::new()
        .write(output_path, tables, full_text)
        .map(|report| report.path)
}

/// デフォルト設定でMarkdownファイルをワークブックに変換する
///
/// # 使用例
///
/// ```rust,no_run
/// use doc2xlsx::markdown_to_workbook;
/// use std::path::Path;
///
/// # fn main() -> Result<(), doc2xlsx::Doc2XlsxError> {
/// let report = markdown_to_workbook(Path::new("output.md"), None)?;
/// println!("{} tables -> {}", report.table_count, report.path.display());
/// # Ok(())
/// # }
/// ```
pub fn markdown_to_workbook(
    markdown_path: &Path,
    output_path: Option<&Path>,
) -> Result<WorkbookReport, Doc2XlsxError> {
    WorkbookWriter::new().write_from_markdown(markdown_path, output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Reader, Xlsx};

    fn cell(path: &Path, sheet: &str, pos: (u32, u32)) -> String {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let range = workbook.worksheet_range(sheet).unwrap();
        range
            .get_value(pos)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_normalize_workbook_path() {
        assert_eq!(
            normalize_workbook_path(Path::new("a/out.Xlsx")),
            PathBuf::from("a/out.Xlsx")
        );
        assert_eq!(
            normalize_workbook_path(Path::new("report.csv")),
            PathBuf::from("report.xlsx")
        );
        assert_eq!(
            normalize_workbook_path(Path::new("archive.tar.gz")),
            PathBuf::from("archive.tar.xlsx")
        );
    }

    #[test]
    fn test_default_workbook_path() {
        assert_eq!(
            default_workbook_path(Path::new("output.md")),
            PathBuf::from("output.xlsx")
        );
        assert_eq!(
            default_workbook_path(Path::new("notes")),
            PathBuf::from("notes.xlsx")
        );
    }

    #[test]
    fn test_read_markdown_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.md");
        assert!(matches!(
            read_markdown(&missing),
            Err(Doc2XlsxError::MarkdownRead { .. })
        ));

        let invalid = dir.path().join("invalid.md");
        std::fs::write(&invalid, [0xFFu8, 0xFE, 0x00, b'|']).unwrap();
        assert!(matches!(read_markdown(&invalid), Err(Doc2XlsxError::Utf8(_))));
    }

    #[test]
    fn test_read_markdown_normalizes_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windows.md");
        std::fs::write(&path, "| A |\r\n|---|\r\n| 1 |\r\nold\rmac\n").unwrap();

        let text = read_markdown(&path).unwrap();
        assert_eq!(text, "| A |\n|---|\n| 1 |\nold\nmac\n");
        assert_eq!(find_tables(&text).len(), 1);
    }

    #[test]
    fn test_crlf_markdown_produces_table_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("crlf.md");
        std::fs::write(&md, "| A |\r\n|---|\r\n| 1 |\r\n").unwrap();

        let report = markdown_to_workbook(&md, None).unwrap();
        assert_eq!(report.sheets, vec!["Table_1", "Full_Text"]);
        assert_eq!(cell(&report.path, "Full_Text", (2, 0)), "| A |\n|---|\n| 1 |\n");
    }

    #[test]
    fn test_text_rows_split_at_cell_limit() {
        assert_eq!(text_rows(""), vec![vec![String::new()]]);
        assert_eq!(text_rows("abc"), vec![vec!["abc".to_string()]]);

        let long = "é".repeat(MAX_CELL_CHARS * 2 + 5);
        let rows = text_rows(&long);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].chars().count(), MAX_CELL_CHARS);
        assert_eq!(rows[2][0].chars().count(), 5);
        assert_eq!(rows.concat().concat(), long);
    }

    #[test]
    fn test_long_full_text_is_kept_across_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.xlsx");
        let text = "x".repeat(40_000);

        WorkbookWriter::new()
            .fit_columns(false)
            .write(&path, &[], &text)
            .unwrap();

        let stored = cell(&path, "Info", (3, 0)) + &cell(&path, "Info", (4, 0));
        assert_eq!(stored.len(), 40_000);
        assert_eq!(stored, text);
    }

    #[test]
    fn test_write_markdown_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/out.md");
        assert!(matches!(
            write_markdown(&path, "text"),
            Err(Doc2XlsxError::MarkdownWrite { .. })
        ));
    }

    #[test]
    fn test_no_tables_writes_info_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.xlsx");

        let report = WorkbookWriter::new()
            .write(&path, &[], "just prose")
            .unwrap();
        assert_eq!(report.sheets, vec![INFO_SHEET]);
        assert_eq!(report.table_count, 0);

        assert_eq!(cell(&path, "Info", (0, 0)), "Info");
        assert_eq!(cell(&path, "Info", (1, 0)), "No tables found in document");
        assert_eq!(cell(&path, "Info", (2, 0)), "Raw Text:");
        assert_eq!(cell(&path, "Info", (3, 0)), "just prose");
    }

    #[test]
    fn test_tables_write_table_and_full_text_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let md = dir.path().join("doc.md");
        let text = "| A | B |\n|---|---|\n| 1 | 2 |\n| 3 |\n\ntext\n\n| X |\n|---|\n| y |\n";
        std::fs::write(&md, text).unwrap();

        let report = markdown_to_workbook(&md, None).unwrap();
        assert_eq!(report.path, dir.path().join("doc.xlsx"));
        assert_eq!(report.sheets, vec!["Table_1", "Table_2", "Full_Text"]);
        assert_eq!(report.table_count, 2);

        assert_eq!(cell(&report.path, "Table_1", (0, 1)), "B");
        assert_eq!(cell(&report.path, "Table_1", (2, 0)), "3");
        assert_eq!(cell(&report.path, "Table_1", (2, 1)), "");
        assert_eq!(cell(&report.path, "Table_2", (1, 0)), "y");
        assert_eq!(cell(&report.path, "Full_Text", (0, 0)), "Content");
        assert_eq!(cell(&report.path, "Full_Text", (1, 0)), "Full Text Content:");
        assert_eq!(cell(&report.path, "Full_Text", (2, 0)), text);
    }

    #[test]
    fn test_output_extension_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_workbook(&dir.path().join("out.txt"), &[], "x").unwrap();
        assert_eq!(written, dir.path().join("out.xlsx"));
        assert!(written.exists());
        assert!(!dir.path().join("out.txt").exists());
    }

    #[test]
    fn test_missing_markdown_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.xlsx");
        let result = markdown_to_workbook(&dir.path().join("none.md"), Some(&out));
        assert!(result.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_save_failure_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing_dir/out.xlsx");
        assert!(matches!(
            write_workbook(&out, &[], "x"),
            Err(Doc2XlsxError::Xlsx(_))
        ));
    }
}
