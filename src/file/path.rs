//! パス処理ユーティリティ
//!
//! ファイルパスの正規化、展開、絶対パス化

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, TsuzuriError};

/// パス処理のトレイト
pub trait PathProcessor {
    /// パスを正規化（. や .. を解決）
    fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf>;

    /// ホームディレクトリを展開（~ → /home/user）
    fn expand_home<P: AsRef<Path>>(path: P) -> Result<PathBuf>;

    /// 環境変数を展開（$VAR → 値）
    fn expand_env<P: AsRef<Path>>(path: P) -> Result<PathBuf>;

    /// 相対パスを絶対パスに変換
    fn to_absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf>;
}

/// パス処理の実装
pub struct DefaultPathProcessor;

impl PathProcessor for DefaultPathProcessor {
    fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let mut components = Vec::new();

        for component in path.components() {
            match component {
                Component::CurDir => {
                    continue;
                }
                Component::ParentDir => {
                    if components.is_empty() {
                        return Err(TsuzuriError::Path(
                            "parent reference escapes the path root".to_string(),
                        ));
                    }
                    components.pop();
                }
                _ => {
                    components.push(component);
                }
            }
        }

        let mut result = PathBuf::new();
        for component in components {
            result.push(component);
        }

        Ok(result)
    }

    fn expand_home<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();

        if path_str.starts_with('~') {
            let home_dir = dirs::home_dir()
                .ok_or_else(|| TsuzuriError::Path("home directory unavailable".to_string()))?;

            let expanded = if path_str == "~" {
                home_dir
            } else if let Some(rest) = path_str.strip_prefix("~/") {
                home_dir.join(rest)
            } else {
                // ~user 形式は未サポート
                return Err(TsuzuriError::Path(format!(
                    "unsupported home reference: {}",
                    path_str
                )));
            };

            Ok(expanded)
        } else {
            Ok(path.to_path_buf())
        }
    }

    fn expand_env<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        match shellexpand::env(&path_str) {
            Ok(expanded) => Ok(PathBuf::from(expanded.as_ref())),
            Err(e) => Err(TsuzuriError::Path(format!(
                "environment expansion failed: {}",
                e
            ))),
        }
    }

    fn to_absolute<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
        let path = path.as_ref();

        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = env::current_dir().map_err(|e| {
                TsuzuriError::Path(format!("current directory unavailable: {}", e))
            })?;
            Ok(current_dir.join(path))
        }
    }
}

/// パス展開の便利関数
///
/// ホーム展開 → 環境変数展開 → 正規化 → 絶対パス化の順で処理する
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let expanded = DefaultPathProcessor::expand_home(path)?;
    let expanded = DefaultPathProcessor::expand_env(expanded)?;
    let normalized = DefaultPathProcessor::normalize_path(expanded)?;
    DefaultPathProcessor::to_absolute(normalized)
}

/// パス正規化の便利関数
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    DefaultPathProcessor::normalize_path(path)
}
