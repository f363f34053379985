//! 文書の行ストレージ
//!
//! 不変条件: 行数は常に1以上、行内に改行文字を含まない

use crate::buffer::edit::{EditRange, Position};
use crate::error::BufferError;

/// 行単位の文書ストレージ
///
/// `TextBuffer` が排他的に所有し、編集適用以外の経路では変更されない
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<String>,
}

impl Document {
    /// 空の文書を作成（空行1行）
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }

    /// テキストから文書を作成
    ///
    /// CRLF / CR は LF に正規化してから行分割する
    pub fn from_text(text: &str) -> Self {
        let normalized = normalize_line_endings(text);
        Self {
            lines: normalized.split('\n').map(str::to_string).collect(),
        }
    }

    /// 行数を取得
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 指定行を取得
    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    /// 指定行の長さ（文字数）を取得
    pub fn line_len(&self, index: usize) -> Option<usize> {
        self.lines.get(index).map(|line| line.chars().count())
    }

    /// 文書終端の位置
    pub fn end_position(&self) -> Position {
        let last = self.lines.len() - 1;
        Position::new(last, self.lines[last].chars().count())
    }

    /// 文書全体の文字数（行区切りのLFを含む）
    pub fn char_count(&self) -> usize {
        let newlines = self.lines.len() - 1;
        self.lines
            .iter()
            .map(|line| line.chars().count())
            .sum::<usize>()
            + newlines
    }

    /// 位置が文書内にあるか検証
    pub fn validate_position(&self, position: Position) -> Result<(), BufferError> {
        match self.line_len(position.line) {
            Some(len) if position.column <= len => Ok(()),
            _ => Err(BufferError::out_of_range(position)),
        }
    }

    /// 範囲が文書内にあるか検証
    pub fn validate_range(&self, range: EditRange) -> Result<(), BufferError> {
        if range.end < range.start {
            return Err(BufferError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        self.validate_position(range.start)?;
        self.validate_position(range.end)
    }

    /// 範囲内のテキストを取得
    pub fn text_in_range(&self, range: EditRange) -> Result<String, BufferError> {
        self.validate_range(range)?;

        if range.start.line == range.end.line {
            let line = &self.lines[range.start.line];
            let start = byte_index(line, range.start.column);
            let end = byte_index(line, range.end.column);
            return Ok(line[start..end].to_string());
        }

        let first = &self.lines[range.start.line];
        let mut result = first[byte_index(first, range.start.column)..].to_string();
        for line in &self.lines[range.start.line + 1..range.end.line] {
            result.push('\n');
            result.push_str(line);
        }
        let last = &self.lines[range.end.line];
        result.push('\n');
        result.push_str(&last[..byte_index(last, range.end.column)]);
        Ok(result)
    }

    /// 範囲を置換し、削除されたテキストを返す
    ///
    /// 範囲は検証済みであること（`TextBuffer::apply` が先に検証する）
    pub(crate) fn splice(&mut self, range: EditRange, text: &str) -> String {
        let removed = self
            .text_in_range(range)
            .expect("splice range must be validated");

        let first = &self.lines[range.start.line];
        let prefix = first[..byte_index(first, range.start.column)].to_string();
        let last = &self.lines[range.end.line];
        let suffix = last[byte_index(last, range.end.column)..].to_string();

        let segments: Vec<&str> = text.split('\n').collect();
        let mut replacement = Vec::with_capacity(segments.len());
        if segments.len() == 1 {
            replacement.push(format!("{}{}{}", prefix, segments[0], suffix));
        } else {
            replacement.push(format!("{}{}", prefix, segments[0]));
            for segment in &segments[1..segments.len() - 1] {
                replacement.push(segment.to_string());
            }
            replacement.push(format!("{}{}", segments[segments.len() - 1], suffix));
        }

        self.lines
            .splice(range.start.line..=range.end.line, replacement);
        removed
    }

    /// 文字オフセットを位置に変換（終端でクランプ）
    pub fn position_at_offset(&self, offset: usize) -> Position {
        let mut remaining = offset;
        for (index, line) in self.lines.iter().enumerate() {
            let len = line.chars().count();
            if remaining <= len {
                return Position::new(index, remaining);
            }
            remaining -= len + 1;
        }
        self.end_position()
    }

    /// 位置を文書内に収める
    pub fn clamp_position(&self, position: Position) -> Position {
        if position.line >= self.lines.len() {
            return self.end_position();
        }
        let len = self.lines[position.line].chars().count();
        Position::new(position.line, position.column.min(len))
    }

    /// 位置を文字オフセットに変換
    pub fn offset_at_position(&self, position: Position) -> Result<usize, BufferError> {
        self.validate_position(position)?;
        let preceding: usize = self.lines[..position.line]
            .iter()
            .map(|line| line.chars().count() + 1)
            .sum();
        Ok(preceding + position.column)
    }

    /// 文書全体を単一文字列に直列化（行をLFで結合）
    pub fn serialize(&self) -> String {
        self.lines.join("\n")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// 改行コードの正規化
pub(crate) fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// 文字列内の文字位置をバイト位置に変換
fn byte_index(line: &str, column: usize) -> usize {
    if column == 0 {
        return 0;
    }
    line.char_indices()
        .nth(column)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}
