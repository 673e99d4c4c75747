//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use std::path::PathBuf;

/// 出力ルートの既定値
pub(crate) const DEFAULT_OUTPUT_ROOT: &str = "wwwroot/xml_output";

/// 参照パスの既定の接頭辞
pub(crate) const DEFAULT_REFERENCE_ALIAS: &str = "xml_output";

/// 生成したXMLドキュメントの出力先
///
/// # 使用例
///
/// ```rust,no_run
/// use shiporder_xml::{ConverterBuilder, OutputTarget};
///
/// # fn main() -> Result<(), shiporder_xml::XlsxToXmlError> {
/// // 実行ごとに別ディレクトリへ出力する
/// let converter = ConverterBuilder::new()
///     .with_output_target(OutputTarget::Directory {
///         root: "out/run-42".into(),
///         alias: "run-42".to_string(),
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutputTarget {
    /// ディレクトリに`record_<n>.xml`として書き込む（デフォルト）
    ///
    /// 各ドキュメントの参照パスは`"<alias>/record_<n>.xml"`になります。
    /// 同じ`root`に複数の変換を同時に書き込むとファイル名が衝突するため、
    /// 呼び出し側で実行ごとにディレクトリを分けてください。
    Directory {
        /// 出力ディレクトリ（存在しなければ作成される）
        root: PathBuf,
        /// 参照パスの接頭辞（例: Webサーバー上の公開パス）
        alias: String,
    },

    /// ファイルに書き込まず、メモリ上のドキュメントのみを返す
    ///
    /// 参照パスは`"record_<n>.xml"`になります。
    Memory,
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Directory {
            root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            alias: DEFAULT_REFERENCE_ALIAS.to_string(),
        }
    }
}
