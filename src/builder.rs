//! Builder Module
//!
//! Fluent Builder APIを提供し、`Pipeline`インスタンスを段階的に構築する。
//! `Pipeline`は入力検証・抽出・Markdown書き込み・ワークブック書き込みを順に実行します。

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Doc2XlsxError;
use crate::extractor::{DocumentConverter, Extractor, NativeConverter};
use crate::output::{default_workbook_path, normalize_workbook_path, write_markdown, WorkbookWriter};
use crate::security::SecurityConfig;
use crate::types::{PipelineState, RunReport};

/// 既定のMarkdown出力先
pub const DEFAULT_MARKDOWN_PATH: &str = "output.md";

/// パイプラインの設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct PipelineConfig {
    /// Markdown出力先
    pub markdown_path: PathBuf,

    /// ワークブック出力先（Noneの場合はMarkdownパスから決定）
    pub workbook_path: Option<PathBuf>,

    /// 組み込みコンバーターのセキュリティ設定
    pub security: SecurityConfig,

    /// 列幅の自動調整
    pub fit_columns: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            markdown_path: PathBuf::from(DEFAULT_MARKDOWN_PATH),
            workbook_path: None,
            security: SecurityConfig::default(),
            fit_columns: true,
        }
    }
}

impl PipelineConfig {
    /// 実際に書き込むワークブックのパス
    fn resolved_workbook_path(&self) -> PathBuf {
        match &self.workbook_path {
            Some(path) => normalize_workbook_path(path),
            None => default_workbook_path(&self.markdown_path),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use doc2xlsx::PipelineBuilder;
/// use std::path::Path;
///
/// # fn main() -> Result<(), doc2xlsx::Doc2XlsxError> {
/// let pipeline = PipelineBuilder::new()
///     .with_markdown_path("report.md")
///     .with_workbook_path("report.xlsx")
///     .build()?;
/// let report = pipeline.run(Path::new("report.docx"))?;
/// println!("{} tables", report.table_count);
/// # Ok(())
/// # }
/// ```
pub struct PipelineBuilder {
    /// 内部設定（構築中）
    config: PipelineConfig,

    /// 差し替えたコンバーター（Noneの場合は`NativeConverter`）
    converter: Option<Box<dyn DocumentConverter>>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field(
                "converter",
                &self.converter.as_ref().map(|c| c.name()).unwrap_or("native"),
            )
            .finish()
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - Markdown出力先: `output.md`
    /// - ワークブック出力先: Markdownパスの拡張子を`.xlsx`にしたもの
    /// - コンバーター: `NativeConverter`
    /// - 列幅の自動調整: 有効
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            converter: None,
        }
    }

    /// Markdownの出力先を指定する
    pub fn with_markdown_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.markdown_path = path.into();
        self
    }

    /// ワークブックの出力先を指定する
    ///
    /// 拡張子が`.xlsx`でない場合は`.xlsx`に置き換えられます。
    pub fn with_workbook_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workbook_path = Some(path.into());
        self
    }

    /// ドキュメント変換エンジンを差し替える
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use doc2xlsx::{Doc2XlsxError, Document, PipelineBuilder};
    /// use std::path::Path;
    ///
    /// let builder = PipelineBuilder::new().with_converter(|_: &Path| -> Result<Document, Doc2XlsxError> {
    ///     Ok(Document::from_markdown("| a |\n|---|\n| 1 |\n"))
    /// });
    /// assert!(builder.build().is_ok());
    /// ```
    pub fn with_converter<C>(mut self, converter: C) -> Self
    where
        C: DocumentConverter + 'static,
    {
        self.converter = Some(Box::new(converter));
        self
    }

    /// 組み込みコンバーターのセキュリティ設定を指定する
    ///
    /// `with_converter()`で差し替えた場合は使用されません。
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 列幅をセルの表示幅に合わせるかどうか
    pub fn fit_columns(mut self, fit: bool) -> Self {
        self.config.fit_columns = fit;
        self
    }

    /// 設定を検証し、`Pipeline`を構築する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Pipeline)` - 構築に成功した場合
    /// * `Err(Doc2XlsxError::Config)` - Markdownパスが空、または入力サイズ上限が0の場合
    ///
    /// ワークブックのパスがMarkdownと同じ場合、ワークブックがMarkdownファイルを上書きします。
    pub fn build(self) -> Result<Pipeline, Doc2XlsxError> {
        // 1. Markdownパスの検証
        if self.config.markdown_path.as_os_str().is_empty() {
            return Err(Doc2XlsxError::Config(
                "Markdown output path must not be empty".to_string(),
            ));
        }

        // 2. 出力先の解決
        let workbook_path = self.config.resolved_workbook_path();
        if workbook_path == self.config.markdown_path {
            debug!(
                "Workbook will overwrite the Markdown output: {}",
                workbook_path.display()
            );
        }

        // 3. セキュリティ設定の検証
        if self.config.security.max_input_file_size == 0 {
            return Err(Doc2XlsxError::Config(
                "max_input_file_size must be greater than 0".to_string(),
            ));
        }

        let converter = match self.converter {
            Some(converter) => converter,
            None => Box::new(NativeConverter::with_security(self.config.security.clone())),
        };

        Ok(Pipeline {
            extractor: Extractor::new(converter),
            writer: WorkbookWriter::new().fit_columns(self.config.fit_columns),
            workbook_path,
            config: self.config,
        })
    }
}

/// ドキュメントをMarkdownとワークブックに変換するパイプライン
///
/// `PipelineBuilder::build()`で生成します。
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    workbook_path: PathBuf,
    extractor: Extractor,
    writer: WorkbookWriter,
}

impl Pipeline {
    /// Markdown出力先
    pub fn markdown_path(&self) -> &Path {
        &self.config.markdown_path
    }

    /// ワークブック出力先（正規化済み）
    pub fn workbook_path(&self) -> &Path {
        &self.workbook_path
    }

    /// 入力ファイルを変換する
    ///
    /// # 引数
    ///
    /// * `input` - 入力ドキュメントのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(RunReport)` - Markdownとワークブックを書き込んだ場合
    /// * `Err(Doc2XlsxError::InputNotFound)` - 入力ファイルが存在しない場合（何も書き込みません）
    /// * `Err(Doc2XlsxError)` - Markdownまたはワークブックの書き込みに失敗した場合
    ///
    /// ドキュメントの変換に失敗した場合はエラーにならず、エラーレポートを
    /// Markdownとして書き込みます（`RunReport::extraction_failed`が`true`になります）。
    pub fn run(&self, input: &Path) -> Result<RunReport, Doc2XlsxError> {
        let mut state = PipelineState::Start;
        let result = self.run_stages(input, &mut state);
        if result.is_err() {
            advance(&mut state, PipelineState::Aborted);
        }
        result
    }

    fn run_stages(
        &self,
        input: &Path,
        state: &mut PipelineState,
    ) -> Result<RunReport, Doc2XlsxError> {
        if !input.exists() {
            return Err(Doc2XlsxError::InputNotFound(input.to_path_buf()));
        }
        advance(state, PipelineState::InputValidated);

        let extraction = self.extractor.extract_with_status(input);
        advance(state, PipelineState::Extracted);

        let markdown_path = &self.config.markdown_path;
        write_markdown(markdown_path, &extraction.markdown)?;
        info!("Text extracted and saved to {}", markdown_path.display());
        advance(state, PipelineState::MarkdownWritten);

        let workbook = self
            .writer
            .write_from_markdown(markdown_path, Some(&self.workbook_path))?;
        advance(state, PipelineState::SpreadsheetWritten);

        Ok(RunReport {
            input: input.to_path_buf(),
            markdown_path: markdown_path.clone(),
            workbook_path: workbook.path,
            markdown_chars: extraction.markdown.chars().count(),
            table_count: workbook.table_count,
            extraction_failed: extraction.failed(),
            sheets: workbook.sheets,
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!("Pipeline state: {:?} -> {:?}", state, next);
    *state = next;
}
