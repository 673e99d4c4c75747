//! Number Format Module
//!
//! セルの表示形式（numFmt）に従って数値の表示テキストを生成するモジュール。
//!
//! 対応するのは桁数固定の数値書式（`0`、`0.00`、`#,##0.00`、`0.0%`など）のみです。
//! 日付書式はcalamineが日時として返すため、ここでは扱いません。
//! それ以外の書式（通貨記号、文字列リテラル、指数表記など）は`None`を返し、
//! 呼び出し側は「標準」書式で表示します。

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// 組み込み書式IDに対応する書式文字列
pub(crate) fn builtin_format_code(id: u32) -> Option<&'static str> {
    match id {
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        _ => None,
    }
}

/// 解析済みの桁数固定書式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixedFormat {
    /// 整数部の最小桁数（`0`の数）
    min_int: usize,
    /// 小数部の最小桁数（`.`の後の`0`の数）
    min_dec: usize,
    /// 小数部の最大桁数（`.`の後の`0`と`#`の数）
    max_dec: usize,
    has_point: bool,
    grouping: bool,
    percent: bool,
}

impl FixedFormat {
    fn parse(code: &str) -> Option<Self> {
        let mut format = FixedFormat {
            min_int: 0,
            min_dec: 0,
            max_dec: 0,
            has_point: false,
            grouping: false,
            percent: false,
        };
        let mut placeholders = 0usize;

        for ch in code.chars() {
            match ch {
                '0' | '#' if format.percent => return None,
                '0' if format.has_point => {
                    format.min_dec += 1;
                    format.max_dec += 1;
                }
                '#' if format.has_point => format.max_dec += 1,
                '0' => format.min_int += 1,
                '#' => {}
                ',' if !format.has_point => format.grouping = true,
                '.' if !format.has_point => format.has_point = true,
                '%' if !format.percent => format.percent = true,
                _ => return None,
            }
            if ch == '0' || ch == '#' {
                placeholders += 1;
            }
        }

        // 小数部で`#`の後に`0`が続く書式（`0.#0`）は扱わない
        if placeholders == 0 || (format.min_dec > 0 && !code_dec_is_ordered(code)) {
            return None;
        }
        Some(format)
    }

    fn render(&self, value: f64) -> Option<String> {
        let scaled = if self.percent { value * 100.0 } else { value };
        let decimal = Decimal::from_f64(scaled)?
            .round_dp_with_strategy(self.max_dec as u32, RoundingStrategy::MidpointAwayFromZero);

        let negative = decimal.is_sign_negative() && !decimal.is_zero();
        let digits = format!("{:.*}", self.max_dec, decimal.abs());
        let (int_part, dec_part) = match digits.split_once('.') {
            Some((int_part, dec_part)) => (int_part.to_string(), dec_part.to_string()),
            None => (digits, String::new()),
        };

        // 整数部: 最小桁数までゼロ埋め、`#`のみの書式では先頭の0を表示しない
        let mut int_part = int_part.trim_start_matches('0').to_string();
        while int_part.len() < self.min_int {
            int_part.insert(0, '0');
        }
        if self.grouping {
            int_part = group_thousands(&int_part);
        }

        // 小数部: `#`の桁は末尾の0を省略する
        let mut dec_part = dec_part;
        while dec_part.len() > self.min_dec && dec_part.ends_with('0') {
            dec_part.pop();
        }

        let mut text = String::new();
        if negative {
            text.push('-');
        }
        text.push_str(&int_part);
        if self.has_point {
            text.push('.');
            text.push_str(&dec_part);
        }
        if self.percent {
            text.push('%');
        }
        Some(text)
    }
}

fn code_dec_is_ordered(code: &str) -> bool {
    match code.split_once('.') {
        Some((_, dec)) => {
            let placeholders: String = dec.chars().filter(|c| *c == '0' || *c == '#').collect();
            !placeholders.contains("#0")
        }
        None => true,
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// 書式文字列に従って数値を表示テキストに変換
///
/// 書式が桁数固定の数値書式でない場合は`None`を返します。
/// 複数セクション（`;`区切り）の書式は、正の値とゼロに限り最初のセクションを使用します。
pub(crate) fn format_number(value: f64, code: &str) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let mut sections = code.split(';');
    let first = sections.next()?;
    if value < 0.0 && sections.next().is_some() {
        return None;
    }

    FixedFormat::parse(first.trim())?.render(value)
}
