//! 編集操作の値オブジェクト
//!
//! アンドゥ・リドゥとマクロ再生の両方で同じ `Edit` を使用する

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 文書内の位置（0始まり、列は文字単位）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Position {
    /// 行番号
    pub line: usize,
    /// 行内の列（文字単位）
    pub column: usize,
}

impl Position {
    /// 位置を作成
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 編集対象の範囲（start <= end、endは排他的）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditRange {
    /// 開始位置
    pub start: Position,
    /// 終了位置（排他的）
    pub end: Position,
}

impl EditRange {
    /// 範囲を作成
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// 空の範囲（挿入位置）を作成
    pub fn caret(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// 範囲が空か判定
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// 文書への原子的で可逆な変更
///
/// `range` のテキストを `inserted_text` に置き換える。`removed_text` は
/// 適用時に文書から採取され、適用済みEditの `inverse` が元に戻す編集になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// 置換対象範囲
    pub range: EditRange,
    /// 挿入テキスト
    pub inserted_text: String,
    /// 削除されたテキスト（適用時に確定）
    pub removed_text: String,
    /// 適用時刻（UNIXエポックからのミリ秒）
    pub timestamp_ms: u64,
}

impl Edit {
    /// 挿入編集を作成
    pub fn insert(at: Position, text: impl Into<String>) -> Self {
        Self {
            range: EditRange::caret(at),
            inserted_text: text.into(),
            removed_text: String::new(),
            timestamp_ms: now_millis(),
        }
    }

    /// 削除編集を作成
    pub fn delete(range: EditRange) -> Self {
        Self {
            range,
            inserted_text: String::new(),
            removed_text: String::new(),
            timestamp_ms: now_millis(),
        }
    }

    /// 置換編集を作成
    pub fn replace(range: EditRange, text: impl Into<String>) -> Self {
        Self {
            range,
            inserted_text: text.into(),
            removed_text: String::new(),
            timestamp_ms: now_millis(),
        }
    }

    /// 挿入テキスト終端の位置
    ///
    /// 適用後に挿入テキストが占める範囲の終端を返す
    pub fn inserted_end(&self) -> Position {
        end_of_text(self.range.start, &self.inserted_text)
    }

    /// この編集を打ち消す編集を作成
    ///
    /// 適用済みEdit（`removed_text` 確定済み）に対してのみ意味を持つ
    pub fn inverse(&self) -> Edit {
        Edit {
            range: EditRange::new(self.range.start, self.inserted_end()),
            inserted_text: self.removed_text.clone(),
            removed_text: self.inserted_text.clone(),
            timestamp_ms: self.timestamp_ms,
        }
    }

    /// 編集が行数を変化させるか判定
    pub fn changes_line_count(&self) -> bool {
        self.range.start.line != self.range.end.line || self.inserted_text.contains('\n')
    }
}

/// `start` から `text` を挿入した場合の終端位置
pub(crate) fn end_of_text(start: Position, text: &str) -> Position {
    match text.rfind('\n') {
        None => Position::new(start.line, start.column + text.chars().count()),
        Some(last_newline) => {
            let newline_count = text.bytes().filter(|b| *b == b'\n').count();
            let tail = &text[last_newline + 1..];
            Position::new(start.line + newline_count, tail.chars().count())
        }
    }
}

/// 現在時刻をミリ秒で取得
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
