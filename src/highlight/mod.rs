//! シンタックスハイライトモジュール
//!
//! 編集通知を受けて影響行のみを再トークン化するインクリメンタルな
//! ハイライタを提供。スパンは文書から導出される値であり、永続化しない。

pub mod rules;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::buffer::{Document, Edit, EditListener, TextBuffer};

pub use rules::{HighlightCategory, HighlightRules, RuleSet};

/// 描画用のハイライトスパン
///
/// 1行内の分類済み部分範囲（列は文字単位、end_columnは排他的）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    /// 行番号
    pub line: usize,
    /// 行内開始位置
    pub start_column: usize,
    /// 行内終了位置（排他的）
    pub end_column: usize,
    /// 字句カテゴリ
    pub category: HighlightCategory,
}

/// 行内スパン（キャッシュ用、行番号は参照時に付与）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineSpan {
    start_column: usize,
    end_column: usize,
    category: HighlightCategory,
}

struct HighlightState {
    rules: HighlightRules,
    /// 文書のミラー（編集通知から同じスプライスを適用）
    mirror: Document,
    /// 行ごとのスパンキャッシュ
    spans: Vec<Vec<LineSpan>>,
    /// 再トークン化された行の集合（UI再描画用）
    changed: BTreeSet<usize>,
}

/// インクリメンタルハイライタ
///
/// `TextBuffer` にリスナー登録して使う。クローンは同一状態を共有する。
#[derive(Clone)]
pub struct Highlighter {
    inner: Arc<Mutex<HighlightState>>,
}

impl Highlighter {
    /// 空の文書でハイライタを作成
    pub fn new(rules: HighlightRules) -> Self {
        Self::with_text(rules, "")
    }

    /// 初期テキスト付きでハイライタを作成
    pub fn with_text(rules: HighlightRules, text: &str) -> Self {
        let mirror = Document::from_text(text);
        let mut state = HighlightState {
            rules,
            spans: Vec::with_capacity(mirror.line_count()),
            mirror,
            changed: BTreeSet::new(),
        };
        state.retokenize_all();
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// バッファへ接続する
    ///
    /// ミラーを現在の内容へ同期し、変更リスナーとして自身を登録する
    pub fn attach(&self, buffer: &mut TextBuffer) {
        {
            let mut state = self.lock();
            state.mirror = Document::from_text(&buffer.text());
            state.retokenize_all();
        }
        buffer.add_listener(Box::new(self.clone()));
    }

    /// 編集を反映し、影響行のみ再トークン化する
    pub fn on_edit(&self, edit: &Edit) {
        self.lock().apply_edit(edit);
    }

    /// 指定行のスパンを取得
    pub fn line_spans(&self, line: usize) -> Vec<HighlightSpan> {
        let state = self.lock();
        state
            .spans
            .get(line)
            .map(|spans| {
                spans
                    .iter()
                    .map(|span| HighlightSpan {
                        line,
                        start_column: span.start_column,
                        end_column: span.end_column,
                        category: span.category,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 指定位置のカテゴリを取得
    pub fn category_at(&self, line: usize, column: usize) -> HighlightCategory {
        let state = self.lock();
        state
            .spans
            .get(line)
            .and_then(|spans| {
                spans
                    .iter()
                    .find(|span| span.start_column <= column && column < span.end_column)
            })
            .map(|span| span.category)
            .unwrap_or(HighlightCategory::Plain)
    }

    /// 再トークン化された行集合を取り出す（取り出し後はクリア）
    pub fn take_changed_lines(&self) -> BTreeSet<usize> {
        std::mem::take(&mut self.lock().changed)
    }

    /// ミラーの行数
    pub fn line_count(&self) -> usize {
        self.lock().mirror.line_count()
    }

    fn lock(&self) -> MutexGuard<'_, HighlightState> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl EditListener for Highlighter {
    fn on_edit(&mut self, edit: &Edit) {
        Highlighter::on_edit(self, edit);
    }
}

impl HighlightState {
    fn retokenize_all(&mut self) {
        self.spans.clear();
        self.changed.clear();
        for index in 0..self.mirror.line_count() {
            let line = self.mirror.line(index).unwrap_or("");
            self.spans.push(tokenize_line(&self.rules, line));
            self.changed.insert(index);
        }
    }

    /// 編集で触れられた行と後続1行だけを再計算する
    fn apply_edit(&mut self, edit: &Edit) {
        self.mirror.splice(edit.range, &edit.inserted_text);

        let start = edit.range.start.line;
        let old_end = edit.range.end.line;
        let new_end = edit.inserted_end().line;

        let replacement: Vec<Vec<LineSpan>> = (start..=new_end)
            .map(|index| tokenize_line(&self.rules, self.mirror.line(index).unwrap_or("")))
            .collect();
        self.spans.splice(start..=old_end, replacement);
        for index in start..=new_end {
            self.changed.insert(index);
        }

        // 次行の先頭トークンが影響を受ける場合に備えて1行だけ追従する
        let trailing = new_end + 1;
        if let Some(line) = self.mirror.line(trailing) {
            self.spans[trailing] = tokenize_line(&self.rules, line);
            self.changed.insert(trailing);
        }
    }
}

/// 1行をスパン列に分解する
///
/// 各位置で文字列・コメント・数値・識別子のマッチャーを順に試し、
/// 最長一致（同長なら先のマッチャー）を採用する。どれにも一致しない
/// 文字はPlainにまとめる。
fn tokenize_line(rules: &HighlightRules, line: &str) -> Vec<LineSpan> {
    let mut spans = Vec::new();
    let mut byte = 0usize;
    let mut column = 0usize;
    let mut plain_start: Option<usize> = None;
    // class / def の直後の識別子を同カテゴリで捕捉する
    let mut pending_capture: Option<HighlightCategory> = None;

    while byte < line.len() {
        let rest = &line[byte..];

        let mut best: Option<(usize, Matcher)> = None;
        let candidates = [
            (rules.string().find(rest), Matcher::String),
            (rules.comment().find(rest), Matcher::Comment),
            (rules.number().find(rest), Matcher::Number),
            (rules.identifier().find(rest), Matcher::Identifier),
        ];
        for (found, matcher) in candidates {
            if let Some(m) = found {
                // 空マッチはトークンとして成立しない
                if m.end() > 0 && best.map_or(true, |(len, _)| m.end() > len) {
                    best = Some((m.end(), matcher));
                }
            }
        }

        match best {
            Some((len, matcher)) => {
                let token = &rest[..len];
                let token_chars = token.chars().count();
                let category = match matcher {
                    Matcher::String => HighlightCategory::String,
                    Matcher::Comment => HighlightCategory::Comment,
                    Matcher::Number => HighlightCategory::Number,
                    Matcher::Identifier => {
                        let keyword_category = rules.keyword_category(token);
                        let category = keyword_category
                            .or_else(|| pending_capture.take())
                            .unwrap_or(HighlightCategory::Plain);
                        // 捕捉を張るのは class / def キーワード自身のみ
                        pending_capture = match keyword_category {
                            Some(HighlightCategory::Class) => Some(HighlightCategory::Class),
                            Some(HighlightCategory::Function) => Some(HighlightCategory::Function),
                            _ => None,
                        };
                        category
                    }
                };
                if matcher != Matcher::Identifier {
                    pending_capture = None;
                }

                if category == HighlightCategory::Plain {
                    if plain_start.is_none() {
                        plain_start = Some(column);
                    }
                } else {
                    flush_plain(&mut spans, &mut plain_start, column);
                    spans.push(LineSpan {
                        start_column: column,
                        end_column: column + token_chars,
                        category,
                    });
                }
                byte += len;
                column += token_chars;
            }
            None => {
                let ch = rest.chars().next().expect("rest is non-empty");
                if !ch.is_whitespace() {
                    pending_capture = None;
                }
                if plain_start.is_none() {
                    plain_start = Some(column);
                }
                byte += ch.len_utf8();
                column += 1;
            }
        }
    }

    flush_plain(&mut spans, &mut plain_start, column);
    spans
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matcher {
    String,
    Comment,
    Number,
    Identifier,
}

fn flush_plain(spans: &mut Vec<LineSpan>, plain_start: &mut Option<usize>, column: usize) {
    if let Some(start) = plain_start.take() {
        if column > start {
            spans.push(LineSpan {
                start_column: start,
                end_column: column,
                category: HighlightCategory::Plain,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EditRange, Position};

    fn categories(highlighter: &Highlighter, line: usize) -> Vec<(String, HighlightCategory)> {
        let state = highlighter.lock();
        let text = state.mirror.line(line).unwrap_or("").to_string();
        drop(state);
        highlighter
            .line_spans(line)
            .into_iter()
            .map(|span| {
                let slice: String = text
                    .chars()
                    .skip(span.start_column)
                    .take(span.end_column - span.start_column)
                    .collect();
                (slice, span.category)
            })
            .collect()
    }

    #[test]
    fn comment_line_is_single_comment_span() {
        let highlighter = Highlighter::with_text(HighlightRules::python(), "# comment");
        let spans = highlighter.line_spans(0);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].category, HighlightCategory::Comment);
        assert_eq!(spans[0].start_column, 0);
        assert_eq!(spans[0].end_column, 9);
    }

    #[test]
    fn def_line_classification() {
        let highlighter = Highlighter::with_text(
            HighlightRules::python(),
            "# comment\ndef f(x): return x  # x",
        );

        let line1 = categories(&highlighter, 1);
        assert!(line1.contains(&("def".to_string(), HighlightCategory::Function)));
        assert!(line1.contains(&("f".to_string(), HighlightCategory::Function)));
        assert!(line1.contains(&("return".to_string(), HighlightCategory::Keyword)));
        assert!(line1.contains(&("# x".to_string(), HighlightCategory::Comment)));

        // 引数と本体の x はPlain
        assert_eq!(highlighter.category_at(1, 6), HighlightCategory::Plain);
        let return_x_column = "def f(x): return ".chars().count();
        assert_eq!(
            highlighter.category_at(1, return_x_column),
            HighlightCategory::Plain
        );
    }

    #[test]
    fn class_keyword_captures_name() {
        let highlighter = Highlighter::with_text(HighlightRules::python(), "class Foo:");
        let spans = categories(&highlighter, 0);
        assert!(spans.contains(&("class".to_string(), HighlightCategory::Class)));
        assert!(spans.contains(&("Foo".to_string(), HighlightCategory::Class)));
    }

    #[test]
    fn hash_inside_string_is_not_comment() {
        let highlighter = Highlighter::with_text(HighlightRules::python(), "x = '#not' # yes");
        assert_eq!(highlighter.category_at(0, 5), HighlightCategory::String);
        assert_eq!(highlighter.category_at(0, 11), HighlightCategory::Comment);
    }

    #[test]
    fn unterminated_string_extends_to_line_end() {
        let highlighter = Highlighter::with_text(HighlightRules::python(), "s = 'open # rest");
        assert_eq!(highlighter.category_at(0, 15), HighlightCategory::String);
    }

    #[test]
    fn numbers_are_classified() {
        let highlighter = Highlighter::with_text(HighlightRules::python(), "x = 3.14 + 2");
        assert_eq!(highlighter.category_at(0, 4), HighlightCategory::Number);
        assert_eq!(highlighter.category_at(0, 11), HighlightCategory::Number);
        assert_eq!(highlighter.category_at(0, 9), HighlightCategory::Plain);
    }

    #[test]
    fn edit_retokenizes_only_affected_lines() {
        let mut buffer = TextBuffer::from_text("a = 1\nb = 2\nc = 3");
        let highlighter = Highlighter::new(HighlightRules::python());
        highlighter.attach(&mut buffer);
        highlighter.take_changed_lines();

        buffer
            .apply(Edit::insert(Position::new(1, 0), "# "))
            .unwrap();

        let changed = highlighter.take_changed_lines();
        assert!(changed.contains(&1));
        assert!(!changed.contains(&0));
        assert_eq!(highlighter.category_at(1, 3), HighlightCategory::Comment);
        assert_eq!(highlighter.category_at(0, 4), HighlightCategory::Number);
    }

    #[test]
    fn newline_insert_shifts_span_cache() {
        let mut buffer = TextBuffer::from_text("a = 1\nreturn x");
        let highlighter = Highlighter::new(HighlightRules::python());
        highlighter.attach(&mut buffer);

        buffer
            .apply(Edit::insert(Position::new(0, 0), "pass\n"))
            .unwrap();

        assert_eq!(highlighter.line_count(), 3);
        assert_eq!(highlighter.category_at(0, 0), HighlightCategory::Keyword);
        assert_eq!(highlighter.category_at(2, 0), HighlightCategory::Keyword);
    }

    #[test]
    fn line_join_removes_cached_line() {
        let mut buffer = TextBuffer::from_text("ab\ncd");
        let highlighter = Highlighter::new(HighlightRules::python());
        highlighter.attach(&mut buffer);

        buffer
            .apply(Edit::delete(EditRange::new(
                Position::new(0, 2),
                Position::new(1, 0),
            )))
            .unwrap();

        assert_eq!(highlighter.line_count(), 1);
        assert!(highlighter.line_spans(1).is_empty());
    }

    #[test]
    fn undo_keeps_highlight_in_sync() {
        let mut buffer = TextBuffer::from_text("x = 1");
        let highlighter = Highlighter::new(HighlightRules::python());
        highlighter.attach(&mut buffer);

        buffer
            .apply(Edit::insert(Position::new(0, 0), "# "))
            .unwrap();
        assert_eq!(highlighter.category_at(0, 0), HighlightCategory::Comment);

        buffer.undo().unwrap();
        assert_eq!(highlighter.category_at(0, 4), HighlightCategory::Number);
    }
}
