//! 自動保存モジュール
//!
//! 単一のワーカースレッドが一定間隔で監視中の文書を走査し、変更のある
//! ものだけをアトミックに書き出す。スナップショットはバッファのロック下で
//! 取得するため、適用途中の文書を観測することはない。書き込みは同一
//! スレッドで逐次実行され、同じ文書への書き込みが重なることはない。

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::buffer::TextBuffer;
use crate::error::{Result, TsuzuriError};
use crate::file::FileSaver;

/// 監視対象の識別子
pub type WatchId = u64;

/// ロック越しに共有されるバッファ
pub type SharedBuffer = Arc<Mutex<TextBuffer>>;

/// スナップショット取得の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotState {
    /// 変更あり（書き出すべき内容）
    Dirty(String),
    /// 変更なし（今回はスキップ）
    Clean,
    /// 文書は閉じられた（監視を解除する）
    Closed,
}

/// 読み取り専用スナップショットの供給源
pub trait SnapshotSource: Send {
    /// 現在のスナップショットを取得する
    fn snapshot(&self) -> SnapshotState;

    /// 書き込み成功後に呼ばれる
    fn saved(&self) {}
}

impl SnapshotSource for SharedBuffer {
    fn snapshot(&self) -> SnapshotState {
        let buffer = self.lock().unwrap_or_else(|err| err.into_inner());
        if buffer.is_modified() {
            SnapshotState::Dirty(buffer.serialize())
        } else {
            SnapshotState::Clean
        }
    }

    fn saved(&self) {
        let mut buffer = self.lock().unwrap_or_else(|err| err.into_inner());
        buffer.mark_saved();
    }
}

enum Command {
    Watch {
        id: WatchId,
        path: PathBuf,
        source: Box<dyn SnapshotSource>,
    },
    Cancel {
        id: WatchId,
    },
    Flush {
        done: mpsc::Sender<usize>,
    },
    Shutdown,
}

struct Watch {
    path: PathBuf,
    source: Box<dyn SnapshotSource>,
}

/// 自動保存スケジューラ
///
/// Dropでワーカーを停止して合流する
pub struct AutosaveScheduler {
    sender: mpsc::Sender<Command>,
    worker: Option<thread::JoinHandle<()>>,
    next_id: AtomicU64,
}

impl AutosaveScheduler {
    /// 指定間隔のスケジューラを起動する
    pub fn new(interval: Duration) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("tsuzuri-autosave".to_string())
            .spawn(move || worker_loop(receiver, interval))?;

        Ok(Self {
            sender,
            worker: Some(worker),
            next_id: AtomicU64::new(0),
        })
    }

    /// 文書を監視対象に登録する
    pub fn watch(&self, path: PathBuf, source: Box<dyn SnapshotSource>) -> Result<WatchId> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.send(Command::Watch { id, path, source })?;
        Ok(id)
    }

    /// 共有バッファを監視対象に登録する
    ///
    /// 関連パスを持たないバッファは登録できない（保存先がないため）
    pub fn watch_buffer(&self, buffer: &SharedBuffer) -> Result<WatchId> {
        let path = {
            let guard = buffer.lock().unwrap_or_else(|err| err.into_inner());
            guard.file_path().map(|p| p.to_path_buf())
        };
        let path = path.ok_or_else(|| {
            TsuzuriError::Application("buffer has no file path for autosave".to_string())
        })?;
        self.watch(path, Box::new(buffer.clone()))
    }

    /// 監視を解除する（タブを閉じた際の保留中自動保存の取り消し）
    pub fn cancel(&self, id: WatchId) -> Result<()> {
        self.send(Command::Cancel { id })
    }

    /// 1回分の保存走査を同期的に実行し、書き込んだ文書数を返す
    pub fn flush(&self) -> Result<usize> {
        let (done, result) = mpsc::channel();
        self.send(Command::Flush { done })?;
        result
            .recv()
            .map_err(|_| TsuzuriError::Application("autosave worker is gone".to_string()))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.sender
            .send(command)
            .map_err(|_| TsuzuriError::Application("autosave worker is gone".to_string()))
    }
}

impl Drop for AutosaveScheduler {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(receiver: mpsc::Receiver<Command>, interval: Duration) {
    let mut watches: BTreeMap<WatchId, Watch> = BTreeMap::new();
    let mut next_tick = Instant::now() + interval;

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(timeout) {
            Ok(Command::Watch { id, path, source }) => {
                watches.insert(id, Watch { path, source });
            }
            Ok(Command::Cancel { id }) => {
                watches.remove(&id);
            }
            Ok(Command::Flush { done }) => {
                let saved = save_pass(&mut watches);
                let _ = done.send(saved);
            }
            Ok(Command::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {
                save_pass(&mut watches);
                next_tick = Instant::now() + interval;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// 監視対象を1周走査し、書き込んだ文書数を返す
fn save_pass(watches: &mut BTreeMap<WatchId, Watch>) -> usize {
    let saver = FileSaver::new();
    let mut saved = 0;
    let mut closed = Vec::new();

    for (id, watch) in watches.iter() {
        match watch.source.snapshot() {
            SnapshotState::Dirty(content) => match saver.save_file(&watch.path, &content) {
                Ok(()) => {
                    watch.source.saved();
                    saved += 1;
                    log::debug!("autosaved {}", watch.path.display());
                }
                Err(err) => {
                    // 失敗は次の走査で再試行する
                    log::warn!("autosave failed for {}: {}", watch.path.display(), err);
                }
            },
            SnapshotState::Clean => {}
            SnapshotState::Closed => closed.push(*id),
        }
    }

    for id in closed {
        watches.remove(&id);
    }

    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Edit, Position};
    use std::fs;
    use tempfile::tempdir;

    fn shared_buffer(text: &str, path: PathBuf) -> SharedBuffer {
        let mut buffer = TextBuffer::from_text(text);
        buffer.set_file_path(path);
        Arc::new(Mutex::new(buffer))
    }

    fn dirty(buffer: &SharedBuffer, text: &str) {
        let mut guard = buffer.lock().unwrap();
        guard
            .apply(Edit::insert(Position::new(0, 0), text))
            .unwrap();
    }

    #[test]
    fn flush_writes_dirty_buffer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let buffer = shared_buffer("base", path.clone());
        dirty(&buffer, "x");

        let scheduler = AutosaveScheduler::new(Duration::from_secs(3600)).unwrap();
        scheduler.watch_buffer(&buffer).unwrap();

        assert_eq!(scheduler.flush().unwrap(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "xbase");
        assert!(!buffer.lock().unwrap().is_modified());
    }

    #[test]
    fn clean_buffer_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let buffer = shared_buffer("base", path.clone());

        let scheduler = AutosaveScheduler::new(Duration::from_secs(3600)).unwrap();
        scheduler.watch_buffer(&buffer).unwrap();

        assert_eq!(scheduler.flush().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn cancel_prevents_pending_autosave() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let buffer = shared_buffer("base", path.clone());
        dirty(&buffer, "x");

        let scheduler = AutosaveScheduler::new(Duration::from_secs(3600)).unwrap();
        let id = scheduler.watch_buffer(&buffer).unwrap();
        scheduler.cancel(id).unwrap();

        assert_eq!(scheduler.flush().unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn closed_source_is_dropped() {
        struct ClosedSource;
        impl SnapshotSource for ClosedSource {
            fn snapshot(&self) -> SnapshotState {
                SnapshotState::Closed
            }
        }

        let dir = tempdir().unwrap();
        let scheduler = AutosaveScheduler::new(Duration::from_secs(3600)).unwrap();
        scheduler
            .watch(dir.path().join("gone.txt"), Box::new(ClosedSource))
            .unwrap();

        assert_eq!(scheduler.flush().unwrap(), 0);
        assert_eq!(scheduler.flush().unwrap(), 0);
    }

    #[test]
    fn buffer_without_path_is_rejected() {
        let buffer = Arc::new(Mutex::new(TextBuffer::from_text("text")));
        let scheduler = AutosaveScheduler::new(Duration::from_secs(3600)).unwrap();
        assert!(scheduler.watch_buffer(&buffer).is_err());
    }

    #[test]
    fn interval_tick_saves_without_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let buffer = shared_buffer("tick", path.clone());
        dirty(&buffer, "y");

        let scheduler = AutosaveScheduler::new(Duration::from_millis(20)).unwrap();
        scheduler.watch_buffer(&buffer).unwrap();

        // タイマー駆動の保存を待つ
        let deadline = Instant::now() + Duration::from_secs(5);
        while !path.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "ytick");
    }

    #[test]
    fn shutdown_on_drop_joins_worker() {
        let scheduler = AutosaveScheduler::new(Duration::from_millis(10)).unwrap();
        drop(scheduler);
    }
}
