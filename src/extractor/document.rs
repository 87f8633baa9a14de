//! Document Model Module
//!
//! コンバーターが生成する構造化ドキュメントと、そのMarkdownレンダリングを提供するモジュール。

use crate::api::InputFormat;

/// ドキュメントを構成するブロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// 見出し（レベル1〜6）
    Heading { level: usize, text: String },

    /// 段落
    Paragraph(String),

    /// テーブル（1行目をヘッダーとして出力）
    Table(Vec<Vec<String>>),

    /// コードブロック
    Code { language: String, text: String },

    /// 変換済みのMarkdown（そのまま出力）
    Markdown(String),
}

impl Block {
    /// 出力すべき内容を持たないブロックかどうか
    fn is_blank(&self) -> bool {
        match self {
            Block::Heading { text, .. } | Block::Paragraph(text) | Block::Markdown(text) => {
                text.trim().is_empty()
            }
            Block::Code { text, .. } => text.trim().is_empty(),
            Block::Table(rows) => rows
                .iter()
                .all(|row| row.iter().all(|cell| cell.trim().is_empty())),
        }
    }

    fn render(&self) -> String {
        match self {
            Block::Heading { level, text } => {
                format!("{} {}", "#".repeat((*level).clamp(1, 6)), text.trim())
            }
            Block::Paragraph(text) => text.trim().to_string(),
            Block::Table(rows) => render_table(rows),
            Block::Code { language, text } => {
                format!("```{}\n{}\n```", language, text.trim_end())
            }
            Block::Markdown(text) => text.clone(),
        }
    }
}

/// 構造化ドキュメント
///
/// `DocumentConverter::convert()`の結果です。`render_markdown()`でMarkdownに変換します。
///
/// # 使用例
///
/// ```rust
/// use doc2xlsx::{Block, Document};
///
/// let document = Document::new(vec![
///     Block::Heading { level: 1, text: "Report".to_string() },
///     Block::Table(vec![
///         vec!["Name".to_string(), "Qty".to_string()],
///         vec!["apple".to_string(), "3".to_string()],
///     ]),
/// ]);
///
/// assert_eq!(
///     document.render_markdown(),
///     "# Report\n\n| Name | Qty |\n| --- | --- |\n| apple | 3 |\n"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    format: Option<InputFormat>,
    warnings: Vec<String>,
}

impl Document {
    /// ブロックの列からドキュメントを生成
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            format: None,
            warnings: Vec::new(),
        }
    }

    /// 変換済みのMarkdown文字列1つからなるドキュメントを生成
    pub fn from_markdown(markdown: impl Into<String>) -> Self {
        Self::new(vec![Block::Markdown(markdown.into())])
    }

    /// 入力形式を記録する
    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// 変換中の警告を追加する
    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// ブロック
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// 入力形式（組み込みコンバーター以外では`None`の場合がある）
    pub fn format(&self) -> Option<InputFormat> {
        self.format
    }

    /// 変換中の警告
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 出力すべき内容がないかどうか
    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(Block::is_blank)
    }

    /// Markdownとしてレンダリングする
    ///
    /// ブロックは空行で区切られます。空のブロックは出力しません。
    /// 最後のブロックが`Block::Markdown`以外の場合は末尾に改行を付けます
    /// （末尾のテーブル行がテーブルとして検出されるように）。
    /// `Block::Markdown`は一切加工せずに出力します。
    pub fn render_markdown(&self) -> String {
        let rendered: Vec<String> = self
            .blocks
            .iter()
            .filter(|block| !block.is_blank())
            .map(Block::render)
            .collect();

        let mut markdown = rendered.join("\n\n");
        let ends_with_raw = matches!(
            self.blocks.iter().rev().find(|block| !block.is_blank()),
            Some(Block::Markdown(_))
        );
        if !markdown.is_empty() && !ends_with_raw && !markdown.ends_with('\n') {
            markdown.push('\n');
        }
        markdown
    }
}

/// 行の列をパイプ区切りのMarkdownテーブルにレンダリングする（末尾改行なし）
///
/// 列数は最長の行に合わせ、セル内の`|`は`\|`にエスケープします。
pub(crate) fn render_table(rows: &[Vec<String>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }

    let render_row = |row: &Vec<String>| {
        let mut line = String::from("|");
        for col in 0..width {
            let cell = row.get(col).map(String::as_str).unwrap_or("");
            line.push(' ');
            line.push_str(&sanitize_cell(cell));
            line.push_str(" |");
        }
        line
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(width)));
    lines.extend(rows.iter().skip(1).map(render_row));
    lines.join("\n")
}

/// セル内容を1行にまとめ、`|`をエスケープする
fn sanitize_cell(cell: &str) -> String {
    cell.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_raw_markdown_is_verbatim() {
        let raw = "| a |\n|---|\n| 1 |";
        assert_eq!(Document::from_markdown(raw).render_markdown(), raw);
    }

    #[test]
    fn test_render_table_pads_rows() {
        let rendered = render_table(&[row(&["A", "B"]), row(&["1"])]);
        assert_eq!(rendered, "| A | B |\n| --- | --- |\n| 1 |  |");
    }

    #[test]
    fn test_render_table_escapes_pipes_and_newlines() {
        let rendered = render_table(&[row(&["a|b"]), row(&["line1\nline2"])]);
        assert_eq!(rendered, "| a\\|b |\n| --- |\n| line1 line2 |");
    }

    #[test]
    fn test_render_table_empty() {
        assert_eq!(render_table(&[]), "");
        assert_eq!(render_table(&[vec![]]), "");
    }

    #[test]
    fn test_blank_blocks_are_skipped() {
        let document = Document::new(vec![
            Block::Paragraph("  ".to_string()),
            Block::Heading {
                level: 9,
                text: "Deep".to_string(),
            },
            Block::Paragraph("Body".to_string()),
        ]);
        assert_eq!(document.render_markdown(), "###### Deep\n\nBody\n");
        assert!(!document.is_blank());
        assert!(Document::new(vec![Block::Paragraph(" ".to_string())]).is_blank());
    }

    #[test]
    fn test_code_block() {
        let document = Document::new(vec![Block::Code {
            language: "rust".to_string(),
            text: "fn main() {}\n\n".to_string(),
        }]);
        assert_eq!(document.render_markdown(), "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn test_warnings_and_format() {
        let mut document = Document::default().with_format(InputFormat::Pdf);
        document.push_warning("page 3 empty");
        assert_eq!(document.format(), Some(InputFormat::Pdf));
        assert_eq!(document.warnings(), ["page 3 empty"]);
    }
}
