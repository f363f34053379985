//! 検索モジュール
//!
//! 文書スナップショットに対するリテラル／正規表現検索と置換を提供。
//! マッチの生存期間は1回の検索呼び出しのみで、編集適用で無効になる。

pub mod matcher;
mod regex;
pub mod types;

use crate::buffer::{Document, Edit, EditRange, Position};
use crate::error::SearchError;
use crate::search::regex::{compile_pattern, ReplacementTemplate};

pub use matcher::{LiteralMatcher, RegexMatcher, StringMatcher};
pub use types::SearchMatch;

/// 検索エンジン
///
/// 状態を持たない一回呼び切りのAPI。大文字小文字の区別のみ設定で持つ
#[derive(Debug, Clone)]
pub struct SearchEngine {
    case_sensitive: bool,
}

impl SearchEngine {
    /// 既定（大文字小文字を区別）のエンジンを作成
    pub fn new() -> Self {
        Self {
            case_sensitive: true,
        }
    }

    /// 大文字小文字の区別を指定して作成
    pub fn with_case_sensitivity(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    /// 指定位置から前方検索し、折り返し1周分のマッチ列を返す
    ///
    /// 返るイテレータは `from` 以降のマッチから始まり、文書先頭へ一度だけ
    /// 折り返す。各マッチはちょうど1回だけ生成されるため無限ループしない。
    pub fn find(
        &self,
        document: &Document,
        pattern: &str,
        is_regex: bool,
        from: Position,
    ) -> Result<Matches, SearchError> {
        let regex = compile_pattern(pattern, is_regex, self.case_sensitive)?;
        let mut matches = matcher::collect_matches(document, &regex);

        let from_offset = document
            .offset_at_position(document.clamp_position(from))
            .expect("clamped position is within document");
        let pivot = matches
            .iter()
            .position(|m| m.start >= from_offset)
            .unwrap_or(0);
        matches.rotate_left(pivot);

        Ok(Matches {
            inner: matches.into_iter(),
        })
    }

    /// 文書全体のマッチを昇順で収集する
    pub fn find_all(
        &self,
        document: &Document,
        pattern: &str,
        is_regex: bool,
    ) -> Result<Vec<SearchMatch>, SearchError> {
        let regex = compile_pattern(pattern, is_regex, self.case_sensitive)?;
        Ok(matcher::collect_matches(document, &regex))
    }

    /// 1件のマッチを置換する編集を作成する
    pub fn replace(&self, search_match: &SearchMatch, text: &str) -> Edit {
        Edit::replace(search_match.range(), text)
    }

    /// 全マッチを置換する編集列を作成する
    ///
    /// スナップショット上で全ての非重複マッチを収集してから、オフセットの
    /// 大きい順（後ろから前）に並べた編集列を返す。この順で適用すれば
    /// 前方のオフセットがずれない。正規表現モードでは置換文字列の `$1`
    /// 形式グループ参照を展開する。
    pub fn replace_all(
        &self,
        document: &Document,
        pattern: &str,
        is_regex: bool,
        replacement: &str,
    ) -> Result<Vec<Edit>, SearchError> {
        let regex = compile_pattern(pattern, is_regex, self.case_sensitive)?;
        let template = if is_regex {
            Some(ReplacementTemplate::parse(replacement)?)
        } else {
            None
        };

        let text = document.serialize();
        let mut converter_chars = 0usize;
        let mut converter_byte = 0usize;
        let mut edits = Vec::new();

        for captures in regex.captures_iter(&text) {
            let Some(m) = captures.get(0) else {
                continue;
            };
            converter_chars += text[converter_byte..m.start()].chars().count();
            let start = converter_chars;
            converter_chars += text[m.start()..m.end()].chars().count();
            converter_byte = m.end();
            let end = converter_chars;

            let rendered = match &template {
                Some(template) => template.render(&captures),
                None => replacement.to_string(),
            };

            let range = EditRange::new(
                document.position_at_offset(start),
                document.position_at_offset(end),
            );
            edits.push(Edit::replace(range, rendered));
        }

        // 後ろから前へ適用できる順序に並べ替える
        edits.reverse();
        Ok(edits)
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 折り返し1周分のマッチ列
#[derive(Debug)]
pub struct Matches {
    inner: std::vec::IntoIter<SearchMatch>,
}

impl Matches {
    /// 残りマッチ数
    pub fn remaining(&self) -> usize {
        self.inner.len()
    }
}

impl Iterator for Matches {
    type Item = SearchMatch;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Matches {}
