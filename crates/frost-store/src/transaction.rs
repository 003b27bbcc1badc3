//! 快照式交易
//!
//! 整次計劃執行是一筆邏輯交易：進場先 clone 快照，
//! 閉包回傳 `Err` 時整份資料集還原，對外表現為全有或全無。
//! `try_lock` 即 run 級別諮詢鎖：同一資料集不允許兩次計劃並行。

use crate::dataset::Dataset;
use frost_core::{PlanError, Result};
use std::sync::Mutex;

/// 計劃儲存：資料集的唯一持有者
#[derive(Debug, Default)]
pub struct PlanningStore {
    inner: Mutex<Dataset>,
}

impl PlanningStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            inner: Mutex::new(dataset),
        }
    }

    /// 在一筆交易內執行 `f`
    ///
    /// - 鎖已被占用：回傳 `ConcurrentRun`，不等待
    /// - `f` 回傳 `Err`：還原快照後把錯誤往外傳
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Dataset) -> Result<T>) -> Result<T> {
        let mut guard = self
            .inner
            .try_lock()
            .map_err(|e| match e {
                std::sync::TryLockError::WouldBlock => PlanError::ConcurrentRun,
                std::sync::TryLockError::Poisoned(_) => {
                    PlanError::StoreFailure("資料集鎖已毒化".to_string())
                }
            })?;

        let snapshot = guard.clone();
        match f(&mut guard) {
            Ok(value) => Ok(value),
            Err(err) => {
                *guard = snapshot;
                tracing::warn!("交易回滾: {err}");
                Err(err)
            }
        }
    }

    /// 唯讀存取（查詢端點、測試驗證）
    pub fn read<T>(&self, f: impl FnOnce(&Dataset) -> T) -> Result<T> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| PlanError::StoreFailure("資料集鎖已毒化".to_string()))?;
        Ok(f(&guard))
    }

    /// 取出完整快照（測試固定資料用）
    pub fn snapshot(&self) -> Result<Dataset> {
        self.read(|ds| ds.clone())
    }
}
