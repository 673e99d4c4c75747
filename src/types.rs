//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// 1始まりの行番号・列番号から座標を生成
    pub fn from_one_based(row: u32, col: u32) -> Self {
        Self::new(row.saturating_sub(1), col.saturating_sub(1))
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// A1形式の文字列を座標に変換（例: "C2" -> (1, 2)）
    ///
    /// 列文字と行番号の両方を含まない場合は`None`を返します。
    pub fn parse_a1(ref_str: &str) -> Option<Self> {
        let letters: String = ref_str
            .chars()
            .take_while(|ch| ch.is_ascii_alphabetic())
            .collect();
        let digits = &ref_str[letters.len()..];

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        // A=1, ..., Z=26, AA=27
        let col = letters.chars().try_fold(0u32, |acc, ch| {
            let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            acc.checked_mul(26)?.checked_add(val)
        })?;

        let row = digits.parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }

        Some(Self::new(row - 1, col - 1))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}
