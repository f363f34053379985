//! キーボードマクロモジュール
//!
//! バッファに適用されたEditをそのままテープへ記録し、決定的に再生する。
//! キーストロークではなくEditを記録するため、タイミングやフォーカス状態に
//! 依存しない。

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::buffer::{Edit, EditListener, TextBuffer};
use crate::error::TsuzuriError;

/// 記録状態
///
/// グローバルフラグではなくレコーダーが所有する明示的な値
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// 待機中
    #[default]
    Idle,
    /// 記録中
    Recording,
}

/// 記録済みマクロテープ
///
/// stopで封印された読み取り専用のEdit列。何度でも再生できる
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroTape {
    edits: Vec<Edit>,
}

impl MacroTape {
    /// ステップ数
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// テープが空か判定
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// 記録されたEdit列
    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    /// JSONへ直列化
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// JSONから復元
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

struct RecorderInner {
    state: RecorderState,
    tape: Vec<Edit>,
}

/// マクロレコーダー
///
/// `TextBuffer` にリスナー登録して使う。クローンは同一状態を共有するため、
/// 1つをバッファへ渡し、もう1つで開始・停止を制御する。
#[derive(Clone)]
pub struct MacroRecorder {
    inner: Arc<Mutex<RecorderInner>>,
}

impl MacroRecorder {
    /// 待機状態のレコーダーを作成
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderInner {
                state: RecorderState::Idle,
                tape: Vec::new(),
            })),
        }
    }

    /// 現在の記録状態
    pub fn state(&self) -> RecorderState {
        self.lock().state
    }

    /// 記録中か判定
    pub fn is_recording(&self) -> bool {
        self.state() == RecorderState::Recording
    }

    /// 記録を開始する
    ///
    /// 記録は排他的であり、封印前のテープは破棄される
    pub fn start(&self) {
        let mut inner = self.lock();
        inner.tape.clear();
        inner.state = RecorderState::Recording;
    }

    /// 記録を停止しテープを封印する
    ///
    /// 待機中に呼ばれた場合は `None`
    pub fn stop(&self) -> Option<MacroTape> {
        let mut inner = self.lock();
        if inner.state != RecorderState::Recording {
            return None;
        }
        inner.state = RecorderState::Idle;
        Some(MacroTape {
            edits: std::mem::take(&mut inner.tape),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RecorderInner> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Default for MacroRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EditListener for MacroRecorder {
    fn on_edit(&mut self, edit: &Edit) {
        let mut inner = self.lock();
        if inner.state == RecorderState::Recording {
            inner.tape.push(edit.clone());
        }
    }
}

/// 再生失敗
///
/// 失敗ステップ以降の再生は中断され、成功したステップ数を報告する
#[derive(Error, Debug)]
#[error("Macro playback aborted after {completed}/{total} steps")]
pub struct PlaybackError {
    /// 成功したステップ数
    pub completed: usize,
    /// テープの総ステップ数
    pub total: usize,
    /// 失敗原因
    #[source]
    pub cause: TsuzuriError,
}

/// マクロプレイヤー
pub struct MacroPlayer;

impl MacroPlayer {
    /// テープを同期的に再生する
    ///
    /// 各Editを記録順に `TextBuffer::apply` へ渡す。失敗したEditが出た
    /// 時点で残りを中断し、成功ステップ数付きのエラーを返す。
    /// テープ自体は変更されない。
    pub fn run(
        tape: &MacroTape,
        buffer: &mut TextBuffer,
    ) -> std::result::Result<usize, PlaybackError> {
        let total = tape.len();
        for (index, edit) in tape.edits().iter().enumerate() {
            if let Err(cause) = buffer.apply(edit.clone()) {
                return Err(PlaybackError {
                    completed: index,
                    total,
                    cause,
                });
            }
        }
        Ok(total)
    }
}
