//! XML Style Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得不可能な情報を抽出するモジュール。
//! セルの背景色（塗りつぶし）、数値の表示形式、1904年エポック判定を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::XlsxToXmlError;
use crate::format::builtin_format_code;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::CellCoord;

/// 最初のシートが特定できない場合のパス
const DEFAULT_SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

/// セルスタイル情報（cellXfs要素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CellXf {
    pub fill_id: u32,
    pub num_fmt_id: u32,
}

/// xl/styles.xml から取得したスタイル定義
#[derive(Debug, Clone, Default)]
struct StyleTables {
    /// fillId -> 背景色（RGB）
    fills: Vec<Option<String>>,
    /// styleId -> CellXf
    cell_xfs: Vec<CellXf>,
    /// numFmtId -> 書式文字列（`<numFmts>`で定義されたもの）
    num_fmts: HashMap<u32, String>,
}

/// 列範囲のスタイル（`<col min max style>`、0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnStyle {
    min: u32,
    max: u32,
    style_id: u32,
}

/// ワークシートのスタイル割り当て
#[derive(Debug, Clone, Default)]
struct SheetStyles {
    /// セル座標 -> styleId（`s`属性がないセルは0）
    cells: HashMap<CellCoord, u32>,
    /// 行 -> styleId（`customFormat="1"`の行のみ）
    rows: HashMap<u32, u32>,
    /// 列範囲のスタイル
    cols: Vec<ColumnStyle>,
}

/// XLSXスタイルパーサー
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、
/// 最初のワークシートの各セルの背景色と表示形式を解決します。
#[derive(Debug, Clone)]
pub(crate) struct XlsxStyleParser {
    styles: StyleTables,
    /// 最初のワークシートのスタイル割り当て
    sheet: SheetStyles,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl XlsxStyleParser {
    /// XLSXファイル（ZIPアーカイブ）からスタイル情報を解析
    ///
    /// # 引数
    ///
    /// * `xlsx_reader` - XLSXファイルを読み込むためのリーダー
    /// * `security_config` - アーカイブに適用するセキュリティ制限
    pub fn new<R: Read + Seek>(
        xlsx_reader: R,
        security_config: &SecurityConfig,
    ) -> Result<Self, XlsxToXmlError> {
        let mut archive =
            ZipArchive::new(xlsx_reader).map_err(|e| XlsxToXmlError::Zip(format!("{}", e)))?;

        // セキュリティチェック: ファイル数の上限
        if archive.len() > security_config.max_file_count {
            return Err(XlsxToXmlError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                security_config.max_file_count
            )));
        }

        // セキュリティチェック: 各ファイルのパス検証とサイズチェック
        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| XlsxToXmlError::Zip(format!("{}", e)))?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                XlsxToXmlError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > security_config.max_file_size {
                return Err(XlsxToXmlError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, security_config.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(file_size)
                .ok_or_else(|| {
                    XlsxToXmlError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > security_config.max_decompressed_size {
                return Err(XlsxToXmlError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, security_config.max_decompressed_size
                )));
            }
        }

        // 1. xl/workbook.xml と xl/_rels/workbook.xml.rels から最初のシートを特定
        let (first_sheet_rid, is_1904) = match read_part(&mut archive, "xl/workbook.xml")? {
            Some(xml) => parse_workbook(&xml)?,
            None => (None, false),
        };
        let rels = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };
        let sheet_path = first_sheet_rid
            .and_then(|rid| rels.get(&rid))
            .map(|target| resolve_target(target))
            .unwrap_or_else(|| DEFAULT_SHEET_PATH.to_string());
        validate_zip_path(&sheet_path)
            .map_err(|e| XlsxToXmlError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

        // 2. xl/styles.xml を解析
        let styles = match read_part(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => StyleTables::default(),
        };

        // 3. ワークシートのスタイル割り当てを解析
        let sheet = match read_part(&mut archive, &sheet_path)? {
            Some(xml) => parse_sheet_styles(&xml)?,
            None => SheetStyles::default(),
        };

        debug!(
            "styles: {} fills, {} cellXfs, {} numFmts, {} styled cells in {}",
            styles.fills.len(),
            styles.cell_xfs.len(),
            styles.num_fmts.len(),
            sheet.cells.len(),
            sheet_path
        );

        Ok(Self {
            styles,
            sheet,
            is_1904,
        })
    }

    /// 1904年エポックを使用するかどうかを取得
    pub fn is_1904(&self) -> bool {
        self.is_1904
    }

    /// セルに適用されるスタイル（0始まりの座標）
    ///
    /// セル自身のスタイル、行のスタイル、列のスタイルの順に解決します。
    fn style_at(&self, coord: CellCoord) -> Option<&CellXf> {
        let style_id = self
            .sheet
            .cells
            .get(&coord)
            .or_else(|| self.sheet.rows.get(&coord.row))
            .copied()
            .or_else(|| {
                self.sheet
                    .cols
                    .iter()
                    .find(|c| c.min <= coord.col && coord.col <= c.max)
                    .map(|c| c.style_id)
            })?;

        self.styles.cell_xfs.get(style_id as usize)
    }

    /// セルの背景色を取得（0始まりの座標）
    pub fn fill_at(&self, coord: CellCoord) -> Option<&str> {
        let xf = self.style_at(coord)?;
        self.styles.fills.get(xf.fill_id as usize)?.as_deref()
    }

    /// セルの表示形式の書式文字列を取得（0始まりの座標）
    ///
    /// 「標準」書式（numFmtId 0）や未知の組み込み書式の場合は`None`を返します。
    pub fn format_code_at(&self, coord: CellCoord) -> Option<&str> {
        let id = self.style_at(coord)?.num_fmt_id;
        self.styles
            .num_fmts
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format_code(id))
    }

    /// スタイル情報を持つ最大の列インデックス（0始まり）
    pub fn max_styled_col(&self) -> Option<u32> {
        self.sheet.cells.keys().map(|c| c.col).max()
    }
}

/// ZIPアーカイブ内のファイルを文字列として読み込む（存在しない場合は`None`）
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxToXmlError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(_) => return Ok(None),
    };

    let mut xml_content = Vec::new();
    file.read_to_end(&mut xml_content)?;
    Ok(Some(xml_content))
}

/// 属性値を文字列として取得
fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, XlsxToXmlError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| XlsxToXmlError::Xml(format!("XML attribute error: {}", e)))?;
        if attr.key.as_ref() == key {
            return Ok(Some(std::str::from_utf8(&attr.value)?.to_string()));
        }
    }
    Ok(None)
}

fn is_true(value: &str) -> bool {
    value == "1" || value == "true"
}

/// `rgb`属性値をRGB16進文字列に正規化
///
/// ARGB（8桁）はアルファ値を除去します。大文字・小文字はそのまま保持します。
pub(crate) fn normalize_rgb(rgb: &str) -> String {
    let rgb = rgb.trim();
    match rgb.len() {
        8 if rgb.is_ascii() => rgb[2..].to_string(),
        6 => rgb.to_string(),
        _ => {
            warn!("unexpected fill color '{}', using it verbatim", rgb);
            rgb.to_string()
        }
    }
}

/// xl/workbook.xml の解析
///
/// 最初の`<sheet>`のリレーションシップIDと`<workbookPr date1904>`を取得します。
fn parse_workbook(xml: &[u8]) -> Result<(Option<String>, bool), XlsxToXmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut first_sheet_rid = None;
    let mut is_1904 = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"workbookPr" => {
                    if let Some(value) = attr_value(&e, b"date1904")? {
                        is_1904 = is_true(&value);
                    }
                }
                b"sheet" if first_sheet_rid.is_none() => {
                    first_sheet_rid = attr_value(&e, b"r:id")?;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToXmlError::Xml(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok((first_sheet_rid, is_1904))
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxToXmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) =
                        (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?)
                    {
                        relationships.insert(id, target);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToXmlError::Xml(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// ワークブックのリレーションシップのTargetをアーカイブ内パスに変換
///
/// `"worksheets/sheet1.xml"` -> `"xl/worksheets/sheet1.xml"`、
/// `"/xl/worksheets/sheet1.xml"` -> `"xl/worksheets/sheet1.xml"`
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// xl/styles.xml の解析
///
/// `<numFmts>`から独自の書式文字列を、`<fills>`から各塗りつぶしの前景色（`fgColor rgb`）を、
/// `<cellXfs>`から各スタイルの`fillId`と`numFmtId`を取得します。
fn parse_styles(xml: &[u8]) -> Result<StyleTables, XlsxToXmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut cell_xfs = Vec::new();
    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    let mut in_fills = false;
    let mut in_fill = false;
    let mut in_cell_xfs = false;
    let mut current_fill: Option<String> = None;
    let mut pattern_none = false;

    loop {
        buf.clear();
        let (event, is_empty) = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"fills" => in_fills = false,
                    b"fill" if in_fill => {
                        fills.push(if pattern_none { None } else { current_fill.take() });
                        in_fill = false;
                    }
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToXmlError::Xml(format!("XML parse error: {}", e))),
            _ => continue,
        };

        match event.name().as_ref() {
            b"numFmt" => {
                // <numFmt numFmtId="164" formatCode="#,##0.000"/>
                if let (Some(id), Some(code)) =
                    (attr_value(&event, b"numFmtId")?, attr_value(&event, b"formatCode")?)
                {
                    let code = quick_xml::escape::unescape(&code)
                        .map_err(XlsxToXmlError::xml)?
                        .into_owned();
                    num_fmts.insert(id.parse()?, code);
                }
            }
            b"fills" if !is_empty => in_fills = true,
            b"fill" if in_fills => {
                current_fill = None;
                pattern_none = false;
                if is_empty {
                    // <fill/>
                    fills.push(None);
                } else {
                    in_fill = true;
                }
            }
            b"patternFill" if in_fill => {
                // <patternFill patternType="solid">
                if let Some(pattern) = attr_value(&event, b"patternType")? {
                    pattern_none = pattern == "none";
                }
            }
            b"fgColor" if in_fill => {
                // <fgColor rgb="FFFFFF00"/>（theme/indexed指定はRGBを持たない）
                current_fill = attr_value(&event, b"rgb")?.map(|rgb| normalize_rgb(&rgb));
                if current_fill.is_none() && !pattern_none {
                    warn!("fill {} has no RGB foreground color, treating it as unfilled", fills.len());
                }
            }
            b"cellXfs" if !is_empty => in_cell_xfs = true,
            b"xf" if in_cell_xfs => {
                // <xf numFmtId="0" fontId="0" fillId="2" borderId="0" applyFill="1"/>
                let fill_id = match attr_value(&event, b"fillId")? {
                    Some(id) => id.parse()?,
                    None => 0,
                };
                let num_fmt_id = match attr_value(&event, b"numFmtId")? {
                    Some(id) => id.parse()?,
                    None => 0,
                };
                cell_xfs.push(CellXf { fill_id, num_fmt_id });
            }
            _ => {}
        }
    }

    Ok(StyleTables {
        fills,
        cell_xfs,
        num_fmts,
    })
}

/// ワークシートXMLからセル・行・列のスタイル割り当てを解析
fn parse_sheet_styles(xml: &[u8]) -> Result<SheetStyles, XlsxToXmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = SheetStyles::default();
    let mut in_cols = false;
    let mut in_sheet_data = false;
    // r属性が省略された場合に備えて直前の位置を保持する
    let mut current_row: Option<u32> = None;
    let mut last_col: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"cols" => in_cols = true,
                b"col" if in_cols => {
                    // <col min="3" max="3" style="2"/>（Excelの列番号は1始まり）
                    if let (Some(min), Some(max), Some(style)) = (
                        attr_value(&e, b"min")?,
                        attr_value(&e, b"max")?,
                        attr_value(&e, b"style")?,
                    ) {
                        styles.cols.push(ColumnStyle {
                            min: min.parse::<u32>()?.saturating_sub(1),
                            max: max.parse::<u32>()?.saturating_sub(1),
                            style_id: style.parse()?,
                        });
                    }
                }
                b"sheetData" => in_sheet_data = true,
                b"row" if in_sheet_data => {
                    // <row r="15" s="2" customFormat="1">
                    let row = match attr_value(&e, b"r")? {
                        Some(r) => r.parse::<u32>()?.saturating_sub(1),
                        None => current_row.map_or(0, |r| r + 1),
                    };
                    current_row = Some(row);
                    last_col = None;

                    let custom = attr_value(&e, b"customFormat")?
                        .map(|v| is_true(&v))
                        .unwrap_or(false);
                    if custom {
                        if let Some(style) = attr_value(&e, b"s")? {
                            styles.rows.insert(row, style.parse()?);
                        }
                    }
                }
                b"c" if in_sheet_data => {
                    // <c r="C2" s="3" t="s">
                    let coord = match attr_value(&e, b"r")?.and_then(|r| CellCoord::parse_a1(&r)) {
                        Some(coord) => coord,
                        None => CellCoord::new(
                            current_row.unwrap_or(0),
                            last_col.map_or(0, |c| c + 1),
                        ),
                    };
                    last_col = Some(coord.col);

                    let style_id = match attr_value(&e, b"s")? {
                        Some(s) => s.parse()?,
                        None => 0,
                    };
                    styles.cells.insert(coord, style_id);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"cols" => in_cols = false,
                b"sheetData" => in_sheet_data = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToXmlError::Xml(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}
