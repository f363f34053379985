//! テキストバッファ本体
//!
//! 編集適用・アンドゥ・リドゥ・変更通知のメインインターフェース

use std::path::{Path, PathBuf};

use crate::buffer::document::Document;
use crate::buffer::edit::{now_millis, Edit, EditRange};
use crate::error::Result;

/// 変更通知リスナー
///
/// バッファを `Arc<Mutex<_>>` 越しに共有できるよう `Send` を要求する
pub trait EditListener: Send {
    /// 適用されたEditを受け取る
    fn on_edit(&mut self, edit: &Edit);
}

/// 変更通知システム
pub struct EditNotifier {
    listeners: Vec<Box<dyn EditListener>>,
}

impl EditNotifier {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// リスナーを追加
    pub fn add_listener(&mut self, listener: Box<dyn EditListener>) {
        self.listeners.push(listener);
    }

    /// 変更を通知
    pub fn notify(&mut self, edit: &Edit) {
        for listener in &mut self.listeners {
            listener.on_edit(edit);
        }
    }
}

impl Default for EditNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// テキストバッファ
///
/// 文書とその編集履歴を排他的に所有する。1つの論理的編集操作は
/// ちょうど1つのEditであり、`apply` は失敗時に文書を変更しない。
pub struct TextBuffer {
    /// 文書本体
    document: Document,
    /// アンドゥスタック（打ち消し編集を積む）
    undo_stack: Vec<Edit>,
    /// リドゥスタック
    redo_stack: Vec<Edit>,
    /// 変更通知システム
    notifier: EditNotifier,
    /// 関連ファイルパス（任意）
    file_path: Option<PathBuf>,
    /// 変更フラグ
    modified: bool,
}

impl TextBuffer {
    /// 空のバッファを作成
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// テキストからバッファを作成
    pub fn from_text(text: &str) -> Self {
        Self::with_document(Document::from_text(text))
    }

    fn with_document(document: Document) -> Self {
        Self {
            document,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            notifier: EditNotifier::new(),
            file_path: None,
            modified: false,
        }
    }

    /// 文書への参照
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// 行数を取得
    pub fn line_count(&self) -> usize {
        self.document.line_count()
    }

    /// 指定行を取得
    pub fn line(&self, index: usize) -> Option<&str> {
        self.document.line(index)
    }

    /// バッファ全体をテキストとして取得
    pub fn text(&self) -> String {
        self.document.serialize()
    }

    /// 範囲内のテキストを取得
    pub fn text_in_range(&self, range: EditRange) -> Result<String> {
        Ok(self.document.text_in_range(range)?)
    }

    /// 保存用に直列化（行をLFで結合）
    pub fn serialize(&self) -> String {
        self.document.serialize()
    }

    /// 変更リスナーを追加
    pub fn add_listener(&mut self, listener: Box<dyn EditListener>) {
        self.notifier.add_listener(listener);
    }

    /// 編集を適用する
    ///
    /// 検証 → 置換 → 履歴更新 → 通知の順で処理し、成功時は
    /// `removed_text` を確定させた適用済みEditを返す。
    /// 新しい編集の適用はリドゥスタックを破棄する。
    pub fn apply(&mut self, edit: Edit) -> Result<Edit> {
        let applied = self.apply_raw(edit)?;
        self.undo_stack.push(applied.inverse());
        self.redo_stack.clear();
        Ok(applied)
    }

    /// 直前の編集を取り消す
    ///
    /// 履歴が空なら `Ok(None)`
    pub fn undo(&mut self) -> Result<Option<Edit>> {
        let Some(inverse) = self.undo_stack.pop() else {
            return Ok(None);
        };
        match self.apply_raw(inverse.clone()) {
            Ok(applied) => {
                self.redo_stack.push(applied.inverse());
                Ok(Some(applied))
            }
            Err(err) => {
                // 失敗時はスタックを元に戻す
                self.undo_stack.push(inverse);
                Err(err)
            }
        }
    }

    /// 取り消した編集をやり直す
    pub fn redo(&mut self) -> Result<Option<Edit>> {
        let Some(edit) = self.redo_stack.pop() else {
            return Ok(None);
        };
        match self.apply_raw(edit.clone()) {
            Ok(applied) => {
                self.undo_stack.push(applied.inverse());
                Ok(Some(applied))
            }
            Err(err) => {
                self.redo_stack.push(edit);
                Err(err)
            }
        }
    }

    /// アンドゥ可能か判定
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// リドゥ可能か判定
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// 履歴スタックを介さない編集適用
    fn apply_raw(&mut self, edit: Edit) -> Result<Edit> {
        self.document.validate_range(edit.range)?;
        let removed = self.document.splice(edit.range, &edit.inserted_text);
        let applied = Edit {
            range: edit.range,
            inserted_text: edit.inserted_text,
            removed_text: removed,
            timestamp_ms: now_millis(),
        };
        self.modified = true;
        self.notifier.notify(&applied);
        Ok(applied)
    }

    /// 関連ファイルパスを取得
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// 関連ファイルパスを設定
    pub fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }

    /// バッファが変更されているか確認
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// 保存完了として変更フラグをリセット
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}
