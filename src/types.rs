//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use std::path::PathBuf;

use serde::Serialize;

/// Markdownテキストから抽出されたテーブル
///
/// ヘッダー行と、ヘッダーと同じ列数に正規化されたデータ行を保持します。
/// 構築後は変更できません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// ヘッダーセル（出現順）
    headers: Vec<String>,
    /// データ行（各行は`headers.len()`個のセル）
    rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// ヘッダーとデータ行からテーブルを構築する
    ///
    /// ヘッダーより短い行は空文字列で右詰め補完し、長い行はヘッダーの列数で切り詰めます。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use doc2xlsx::TableBlock;
    ///
    /// let table = TableBlock::new(
    ///     vec!["A".to_string(), "B".to_string()],
    ///     vec![vec!["1".to_string()], vec!["2".into(), "3".into(), "4".into()]],
    /// );
    /// assert_eq!(table.rows()[0], vec!["1", ""]);
    /// assert_eq!(table.rows()[1], vec!["2", "3"]);
    /// ```
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// ヘッダーセル
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// データ行
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// 列数（ヘッダーのセル数）
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// パイプラインの状態
///
/// `Start → InputValidated → Extracted → MarkdownWritten → SpreadsheetWritten`
/// の順に遷移し、致命的なエラーが発生した時点で`Aborted`になります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    InputValidated,
    Extracted,
    MarkdownWritten,
    SpreadsheetWritten,
    Aborted,
}

impl PipelineState {
    /// 終端状態かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::SpreadsheetWritten | PipelineState::Aborted
        )
    }
}

/// ワークブック書き込みの結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookReport {
    /// 書き込んだワークブックのパス（拡張子は`.xlsx`に正規化済み）
    pub path: PathBuf,
    /// 書き込んだシート名（出力順）
    pub sheets: Vec<String>,
    /// 検出・構築できたテーブル数
    pub table_count: usize,
}

/// パイプライン1回分の実行結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// 入力ファイル
    pub input: PathBuf,
    /// 書き込んだMarkdownファイル
    pub markdown_path: PathBuf,
    /// 書き込んだワークブック
    pub workbook_path: PathBuf,
    /// Markdownの文字数
    pub markdown_chars: usize,
    /// ワークブックに書き込んだテーブル数
    pub table_count: usize,
    /// 抽出に失敗し、エラーレポートを出力したかどうか
    pub extraction_failed: bool,
    /// 書き込んだシート名
    pub sheets: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_table_block_pads_short_rows() {
        let table = TableBlock::new(strings(&["A", "B", "C"]), vec![strings(&["1"])]);
        assert_eq!(table.rows(), &[strings(&["1", "", ""])]);
    }

    #[test]
    fn test_table_block_truncates_long_rows() {
        let table = TableBlock::new(strings(&["A"]), vec![strings(&["1", "2", "3"])]);
        assert_eq!(table.rows(), &[strings(&["1"])]);
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_pipeline_state_terminal() {
        assert!(PipelineState::SpreadsheetWritten.is_terminal());
        assert!(PipelineState::Aborted.is_terminal());
        assert!(!PipelineState::MarkdownWritten.is_terminal());
    }

    #[test]
    fn test_run_report_serializes() {
        let report = RunReport {
            input: PathBuf::from("in.txt"),
            markdown_path: PathBuf::from("output.md"),
            workbook_path: PathBuf::from("output.xlsx"),
            markdown_chars: 12,
            table_count: 0,
            extraction_failed: false,
            sheets: strings(&["Info"]),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["workbook_path"], "output.xlsx");
        assert_eq!(json["sheets"][0], "Info");
    }
}
