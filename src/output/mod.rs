//! Output Module
//!
//! 生成したXMLドキュメントを出力先に保存するモジュール。

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::api::OutputTarget;
use crate::error::XlsxToXmlError;

/// 生成されたXMLドキュメント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    sequence: usize,
    name: String,
    reference: String,
    path: Option<PathBuf>,
    #[serde(skip)]
    xml: String,
}

impl GeneratedDocument {
    /// 変換対象行の中での通し番号（1始まり）
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// ドキュメント名（`record_<n>`）
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 呼び出し側がドキュメントを参照するための相対パス
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// 書き込んだファイルのパス（メモリ出力の場合は`None`）
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// XML本文
    pub fn xml(&self) -> &str {
        &self.xml
    }
}

/// ドキュメントの書き込み先（Strategy Pattern）
#[derive(Debug, Clone)]
pub(crate) enum DocumentWriter {
    Directory { root: PathBuf, alias: String },
    Memory,
}

impl DocumentWriter {
    /// 出力先設定からライターを生成
    pub fn from_target(target: &OutputTarget) -> Self {
        match target {
            OutputTarget::Directory { root, alias } => DocumentWriter::Directory {
                root: root.clone(),
                alias: alias.trim_end_matches('/').to_string(),
            },
            OutputTarget::Memory => DocumentWriter::Memory,
        }
    }

    /// 出力先ディレクトリを作成する
    pub fn prepare(&self) -> Result<(), XlsxToXmlError> {
        match self {
            DocumentWriter::Directory { root, .. } => {
                fs::create_dir_all(root).map_err(|source| XlsxToXmlError::Write {
                    path: root.clone(),
                    source,
                })
            }
            DocumentWriter::Memory => Ok(()),
        }
    }

    /// ドキュメントを`record_<sequence>.xml`として保存
    pub fn persist(&self, sequence: usize, xml: String) -> Result<GeneratedDocument, XlsxToXmlError> {
        let name = format!("record_{}", sequence);
        let file_name = format!("{}.xml", name);

        match self {
            DocumentWriter::Directory { root, alias } => {
                let path = root.join(&file_name);
                fs::write(&path, xml.as_bytes()).map_err(|source| XlsxToXmlError::Write {
                    path: path.clone(),
                    source,
                })?;
                info!("wrote {}", path.display());

                Ok(GeneratedDocument {
                    sequence,
                    name,
                    reference: format!("{}/{}", alias, file_name),
                    path: Some(path),
                    xml,
                })
            }
            DocumentWriter::Memory => Ok(GeneratedDocument {
                sequence,
                name,
                reference: file_name,
                path: None,
                xml,
            }),
        }
    }
}
