//! Builder Module
//!
//! Fluent Builder APIを提供し、`Converter`インスタンスを段階的に構築する。

use std::io::Read;
use std::path::PathBuf;

use log::info;

use crate::api::{OutputTarget, DEFAULT_OUTPUT_ROOT, DEFAULT_REFERENCE_ALIAS};
use crate::error::XlsxToXmlError;
use crate::order::{ConversionRun, OrderConverter};
use crate::parser::WorkbookParser;
use crate::security::SecurityConfig;
use crate::source::{MemoryTable, TableSource};

/// 変換処理の設定を保持する内部構造体
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConversionConfig {
    /// 生成したドキュメントの出力先
    pub output_target: OutputTarget,

    /// 入力ファイルの最大サイズ（バイト）
    pub max_input_size: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_target: OutputTarget::default(),
            max_input_size: SecurityConfig::default().max_input_file_size,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Converter`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use shiporder_xml::ConverterBuilder;
///
/// # fn main() -> Result<(), shiporder_xml::XlsxToXmlError> {
/// let converter = ConverterBuilder::new()
///     .with_output_dir("wwwroot/xml_output")
///     .with_reference_alias("xml_output")
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConverterBuilder {
    /// 内部設定（構築中）
    config: ConversionConfig,
}

impl Default for ConverterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConverterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 出力先: `wwwroot/xml_output`ディレクトリ（参照パスの接頭辞は`xml_output`）
    /// - 入力サイズ上限: 2GB
    pub fn new() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }

    /// ドキュメントの出力先を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use shiporder_xml::{ConverterBuilder, OutputTarget};
    ///
    /// // ファイルを書き込まずにXMLだけを受け取る
    /// let builder = ConverterBuilder::new().with_output_target(OutputTarget::Memory);
    /// ```
    pub fn with_output_target(mut self, target: OutputTarget) -> Self {
        self.config.output_target = target;
        self
    }

    /// 出力ディレクトリを指定する
    ///
    /// 出力先がメモリの場合は、既定の参照パス接頭辞を持つディレクトリ出力に切り替わります。
    pub fn with_output_dir(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.config.output_target = match self.config.output_target {
            OutputTarget::Directory { alias, .. } => OutputTarget::Directory { root, alias },
            OutputTarget::Memory => OutputTarget::Directory {
                root,
                alias: DEFAULT_REFERENCE_ALIAS.to_string(),
            },
        };
        self
    }

    /// 参照パスの接頭辞を指定する
    ///
    /// 出力先がメモリの場合は、既定の出力ディレクトリへのディレクトリ出力に切り替わります。
    pub fn with_reference_alias(mut self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.config.output_target = match self.config.output_target {
            OutputTarget::Directory { root, .. } => OutputTarget::Directory { root, alias },
            OutputTarget::Memory => OutputTarget::Directory {
                root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
                alias,
            },
        };
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.max_input_size = bytes;
        self
    }

    /// 設定を検証し、`Converter`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)` - 設定が有効な場合
    /// * `Err(XlsxToXmlError::Config)` - 設定が無効な場合
    ///
    /// # 検証項目
    ///
    /// - 出力ディレクトリが空でないこと
    /// - 参照パスの接頭辞が空でなく、`..`や`\`を含まないこと
    /// - 入力サイズ上限が0でないこと
    pub fn build(self) -> Result<Converter, XlsxToXmlError> {
        // 1. 出力先の検証
        if let OutputTarget::Directory { root, alias } = &self.config.output_target {
            if root.as_os_str().is_empty() {
                return Err(XlsxToXmlError::Config(
                    "Output directory must not be empty".to_string(),
                ));
            }

            if alias.trim_end_matches('/').is_empty() {
                return Err(XlsxToXmlError::Config(
                    "Reference alias must not be empty".to_string(),
                ));
            }

            if alias.contains("..") || alias.contains('\\') {
                return Err(XlsxToXmlError::Config(format!(
                    "Invalid reference alias: '{}'",
                    alias
                )));
            }
        }

        // 2. 入力サイズ上限の検証
        if self.config.max_input_size == 0 {
            return Err(XlsxToXmlError::Config(
                "Maximum input size must be greater than zero".to_string(),
            ));
        }

        // 3. Converterインスタンス生成
        Ok(Converter::new(self.config))
    }
}

/// アップロードされたスプレッドシートを`shiporder`ドキュメントに変換するコンバーター
///
/// `ConverterBuilder::build()`で生成します。呼び出しごとに新しい`ConversionRun`を
/// 返すため、1つのインスタンスを複数の変換に使い回せます。
///
/// # 使用例
///
/// ```rust,no_run
/// use shiporder_xml::ConverterBuilder;
/// use std::fs::File;
///
/// # fn main() -> Result<(), shiporder_xml::XlsxToXmlError> {
/// let converter = ConverterBuilder::new().build()?;
/// let run = converter.convert(File::open("orders.xlsx")?)?;
///
/// println!("{}", run.status());
/// for document in run.documents() {
///     println!("{}", document.reference());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    /// 変換設定
    config: ConversionConfig,

    /// 行の選択と変換
    orders: OrderConverter,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self {
            orders: OrderConverter::new(&config.output_target),
            config,
        }
    }

    /// XLSXファイルを変換
    ///
    /// # 引数
    ///
    /// * `input` - XLSXファイルを読み込むためのリーダー
    ///
    /// # 処理フロー
    ///
    /// 1. 入力の読み込み（サイズ制限とアーカイブの検証）
    /// 2. 最初のワークシートの値と背景色の取得
    /// 3. 網掛け行の変換とドキュメントの保存
    pub fn convert<R: Read>(&self, input: R) -> Result<ConversionRun, XlsxToXmlError> {
        let mut run = ConversionRun::new();
        self.convert_into(input, &mut run)?;
        Ok(run)
    }

    /// XLSXファイルを変換し、結果を`run`に格納
    ///
    /// 途中の行でエラーが発生した場合も、それまでに生成したドキュメントは
    /// `run`に残ります（ステータスは空のまま）。
    pub fn convert_into<R: Read>(
        &self,
        input: R,
        run: &mut ConversionRun,
    ) -> Result<(), XlsxToXmlError> {
        let table = self.load_table(input)?;
        self.orders.convert_into(&table, run)
    }

    /// 任意の表データを変換
    pub fn convert_source(&self, source: &dyn TableSource) -> Result<ConversionRun, XlsxToXmlError> {
        self.orders.convert_workbook(source)
    }

    /// アップロードされたファイルを変換
    ///
    /// ファイルが選択されていない場合（`None`）は`XlsxToXmlError::NoInput`を返し、
    /// 何も書き込みません。
    pub fn convert_upload<R: Read>(
        &self,
        upload: Option<R>,
    ) -> Result<ConversionRun, XlsxToXmlError> {
        match upload {
            Some(input) => self.convert(input),
            None => {
                info!("{}", XlsxToXmlError::NoInput);
                Err(XlsxToXmlError::NoInput)
            }
        }
    }

    /// XLSXファイルを読み込み、最初のワークシートを返す
    fn load_table<R: Read>(&self, input: R) -> Result<MemoryTable, XlsxToXmlError> {
        let security_config = SecurityConfig::with_max_input_size(self.config.max_input_size);
        let mut parser = WorkbookParser::open(input, &security_config)?;
        parser.load_first_sheet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Cell;
    use std::io::Cursor;

    #[test]
    fn test_converter_builder_new() {
        let builder = ConverterBuilder::new();
        assert_eq!(builder.config.output_target, OutputTarget::default());
        assert_eq!(builder.config.max_input_size, 2_147_483_648);
    }

    #[test]
    fn test_with_output_dir_keeps_alias() {
        let builder = ConverterBuilder::new()
            .with_reference_alias("public/xml")
            .with_output_dir("/srv/xml");
        assert_eq!(
            builder.config.output_target,
            OutputTarget::Directory {
                root: PathBuf::from("/srv/xml"),
                alias: "public/xml".to_string(),
            }
        );
    }

    #[test]
    fn test_with_reference_alias_from_memory() {
        let builder = ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .with_reference_alias("xml");
        assert_eq!(
            builder.config.output_target,
            OutputTarget::Directory {
                root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
                alias: "xml".to_string(),
            }
        );
    }

    #[test]
    fn test_build_success() {
        assert!(ConverterBuilder::new().build().is_ok());
        assert!(ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .build()
            .is_ok());
    }

    #[test]
    fn test_build_with_empty_output_dir() {
        match ConverterBuilder::new().with_output_dir("").build() {
            Err(XlsxToXmlError::Config(msg)) => assert!(msg.contains("Output directory")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_build_with_invalid_alias() {
        for alias in ["", "/", "../secret", "xml\\out"] {
            let result = ConverterBuilder::new().with_reference_alias(alias).build();
            assert!(
                matches!(result, Err(XlsxToXmlError::Config(_))),
                "alias {:?} should be rejected",
                alias
            );
        }
    }

    #[test]
    fn test_build_with_zero_input_size() {
        let result = ConverterBuilder::new().with_max_input_size(0).build();
        assert!(matches!(result, Err(XlsxToXmlError::Config(_))));
    }

    #[test]
    fn test_convert_upload_without_file() {
        let converter = ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .build()
            .unwrap();

        let result = converter.convert_upload(None::<Cursor<Vec<u8>>>);
        match result {
            Err(err @ XlsxToXmlError::NoInput) => assert_eq!(err.to_string(), "No file selected."),
            other => panic!("Expected NoInput, got {:?}", other),
        }
    }

    #[test]
    fn test_convert_rejects_oversized_input() {
        let converter = ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .with_max_input_size(4)
            .build()
            .unwrap();

        let result = converter.convert(Cursor::new(vec![0u8; 5]));
        assert!(matches!(result, Err(XlsxToXmlError::SecurityViolation(_))));
    }

    #[test]
    fn test_convert_rejects_non_zip_input() {
        let converter = ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .build()
            .unwrap();

        let result = converter.convert(Cursor::new(b"OrderID,OrderDate\n".to_vec()));
        assert!(matches!(result, Err(XlsxToXmlError::Zip(_))));
    }

    #[test]
    fn test_convert_source_uses_memory_target() {
        let converter = ConverterBuilder::new()
            .with_output_target(OutputTarget::Memory)
            .build()
            .unwrap();

        let table = MemoryTable::new()
            .with_row(vec![Cell::text("OrderID")])
            .with_row(vec![
                Cell::text("1001"),
                Cell::text("2024-03-15"),
                Cell::text("Springfield").with_fill("FFFF00"),
                Cell::text("Hardware"),
                Cell::text("Hammer"),
                Cell::number(2.0),
                Cell::text("123 Main St, Springfield, IL, USA"),
                Cell::text("12.50"),
            ]);

        let run = converter.convert_source(&table).unwrap();
        assert_eq!(run.len(), 1);
        assert_eq!(run.documents()[0].reference(), "record_1.xml");
        assert!(run.documents()[0].path().is_none());
        assert_eq!(run.status(), "1 shaded rows loaded and XMLs generated.");
    }
}
