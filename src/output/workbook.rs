//! Workbook Guard Module
//!
//! `rust_xlsxwriter`のワークブックをスコープ付きで扱うモジュール。
//! `finish()`を呼ばずにドロップされた場合も、追加済みのシートを保存します。

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

use crate::error::Doc2XlsxError;

/// 1セルに格納できる最大文字数（XLSXの仕様）
pub(crate) const MAX_CELL_CHARS: usize = 32_767;

/// 1シートの最大行数（XLSXの仕様）
pub(crate) const MAX_ROWS: usize = 1_048_576;

/// 1シートの最大列数（XLSXの仕様）
pub(crate) const MAX_COLS: usize = 16_384;

/// 列幅の最小値・最大値（文字数単位）
const MIN_COLUMN_WIDTH: usize = 8;
const MAX_COLUMN_WIDTH: usize = 60;

/// 書き込み中のワークブック
///
/// シートはメモリ上のワークブックに追加され、`finish()`またはドロップ時にファイルへ保存されます。
pub(crate) struct WorkbookGuard {
    workbook: Workbook,
    path: PathBuf,
    sheets: Vec<String>,
    header_format: Format,
    fit_columns: bool,
    finished: bool,
}

impl WorkbookGuard {
    /// 出力先を指定してワークブックを開く
    pub fn open(path: &Path, fit_columns: bool) -> Self {
        debug!("Opening workbook: {}", path.display());
        Self {
            workbook: Workbook::new(),
            path: path.to_path_buf(),
            sheets: Vec::new(),
            header_format: Format::new().set_bold(),
            fit_columns,
            finished: false,
        }
    }

    /// ヘッダー行とデータ行からなるシートを追加する
    ///
    /// 行数・列数がXLSXの上限を超える場合は、シートを追加せずにエラーを返します。
    /// シートは書き込みがすべて成功してからワークブックに登録するため、
    /// 途中で失敗したシートは保存されません。
    /// 上限を超える長さのセルは切り詰めます。
    pub fn add_sheet(
        &mut self,
        name: &str,
        headers: &[String],
        rows: &[Vec<String>],
    ) -> Result<(), Doc2XlsxError> {
        if headers.len() > MAX_COLS {
            return Err(Doc2XlsxError::Config(format!(
                "sheet '{}' has {} columns (max: {})",
                name,
                headers.len(),
                MAX_COLS
            )));
        }
        if rows.len() + 1 > MAX_ROWS {
            return Err(Doc2XlsxError::Config(format!(
                "sheet '{}' has {} rows (max: {})",
                name,
                rows.len() + 1,
                MAX_ROWS
            )));
        }

        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;

        for (col, header) in headers.iter().enumerate() {
            let text = clip_cell(name, header);
            worksheet.write_string_with_format(0, col as u16, &*text, &self.header_format)?;
        }

        for (row_idx, row) in rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let text = clip_cell(name, cell);
                worksheet.write_string(row_num, col as u16, &*text)?;
            }
        }

        if self.fit_columns {
            fit_column_widths(&mut worksheet, headers, rows)?;
        }

        self.workbook.push_worksheet(worksheet);
        self.sheets.push(name.to_string());
        debug!("Queued sheet '{}' ({} data rows)", name, rows.len());
        Ok(())
    }

    /// 追加済みのシート名
    pub fn sheets(&self) -> &[String] {
        &self.sheets
    }

    /// ワークブックを保存して閉じる
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 保存したシート名
    /// * `Err(Doc2XlsxError::Xlsx)` - 保存に失敗した場合
    pub fn finish(mut self) -> Result<Vec<String>, Doc2XlsxError> {
        self.finished = true;
        self.workbook.save(&self.path)?;
        Ok(std::mem::take(&mut self.sheets))
    }
}

impl Drop for WorkbookGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // finish()前に抜けた場合も、追加済みのシートを保存する
        match self.workbook.save(&self.path) {
            Ok(()) => warn!(
                "Workbook {} closed early; saved {} sheet(s)",
                self.path.display(),
                self.sheets.len()
            ),
            Err(e) => warn!(
                "Failed to save workbook {} on close: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// XLSXのセル長上限を超える文字列を切り詰める
fn clip_cell<'a>(sheet: &str, text: &'a str) -> std::borrow::Cow<'a, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((byte_idx, _)) => {
            warn!(
                "Cell text in sheet '{}' truncated to {} characters",
                sheet, MAX_CELL_CHARS
            );
            std::borrow::Cow::Owned(text[..byte_idx].to_string())
        }
        None => std::borrow::Cow::Borrowed(text),
    }
}

/// 各列の表示幅に合わせて列幅を設定する
fn fit_column_widths(
    worksheet: &mut Worksheet,
    headers: &[String],
    rows: &[Vec<String>],
) -> Result<(), Doc2XlsxError> {
    for col in 0..headers.len() {
        let widest = std::iter::once(&headers[col])
            .chain(rows.iter().filter_map(|row| row.get(col)))
            .map(|cell| display_width(cell))
            .max()
            .unwrap_or(0);
        let width = (widest + 2).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
        worksheet.set_column_width(col as u16, width as f64)?;
    }
    Ok(())
}

/// 複数行のセルは最も幅の広い行で測る（上限を超えた分は測らない）
fn display_width(cell: &str) -> usize {
    cell.lines()
        .map(|line| {
            if line.len() > MAX_COLUMN_WIDTH * 4 {
                MAX_COLUMN_WIDTH
            } else {
                line.width()
            }
        })
        .max()
        .unwrap_or(0)
}
