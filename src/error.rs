//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// shiporder-xmlクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、行の変換、XMLドキュメントの書き込み中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// 変換処理は「最初のエラーで残りの行を打ち切る」方針のため、
/// どのバリアントも行単位でスキップされることはありません。
///
/// # 使用例
///
/// ```rust,no_run
/// use shiporder_xml::XlsxToXmlError;
/// use std::fs::File;
///
/// fn open_upload(path: &str) -> Result<File, XlsxToXmlError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxToXmlError {
    /// 入力ファイルが指定されていない
    ///
    /// 表示文字列はそのままホスト側のステータスメッセージとして使用されます。
    #[error("No file selected.")]
    NoInput,

    /// 対象行の数値・日付セルを解析できなかったエラー
    ///
    /// 数量（整数）、価格（10進数）、注文日のいずれかが期待する形式でない場合に
    /// 発生します。このエラーが発生した時点で変換処理は中断されます。
    #[error("Format error at cell {cell} ({field}): {message} (value: '{value}')")]
    Format {
        /// セル座標（A1記法）
        cell: String,
        /// 出力フィールド名（例: `quantity`）
        field: &'static str,
        /// セルのテキスト
        value: String,
        /// エラーの詳細メッセージ
        message: String,
    },

    /// 出力先の作成またはドキュメントの書き込みに失敗したエラー
    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        /// 書き込み先のパス
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// 数値の解析エラー（XML属性の数値など）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// XMLの読み書きエラー
    ///
    /// スタイル情報の解析失敗、ドキュメント生成失敗、読み戻したドキュメントの
    /// 構造不正などで発生します。
    #[error("XML error: {0}")]
    Xml(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時の検証エラーや、XLSX以外の形式が
    /// 入力された場合に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use shiporder_xml::{ConverterBuilder, XlsxToXmlError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_reference_alias("")
    ///     .build();
    ///
    /// match result {
    ///     Err(XlsxToXmlError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、入力サイズ制限などに違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxToXmlError {
    /// quick-xmlのエラーを変換する
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        XlsxToXmlError::Xml(err.to_string())
    }
}
