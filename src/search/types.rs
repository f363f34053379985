//! 検索関連の共通型

use crate::buffer::{EditRange, Position};

/// 1件の検索マッチ情報
///
/// 生存期間は1回の検索呼び出しのみ。以後のEdit適用で無効になる
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// マッチ開始位置（文字インデックス）
    pub start: usize,
    /// マッチ終了位置（文字インデックス、排他的）
    pub end: usize,
    /// マッチ開始位置（行・列）
    pub start_position: Position,
    /// マッチ終了位置（行・列、排他的）
    pub end_position: Position,
}

impl SearchMatch {
    /// マッチ長（文字数）
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// マッチが空か判定
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// マッチ開始行
    pub fn line(&self) -> usize {
        self.start_position.line
    }

    /// 行内開始列
    pub fn start_column(&self) -> usize {
        self.start_position.column
    }

    /// 行内終了列（排他的）
    pub fn end_column(&self) -> usize {
        self.end_position.column
    }

    /// 編集範囲に変換
    pub fn range(&self) -> EditRange {
        EditRange::new(self.start_position, self.end_position)
    }
}
