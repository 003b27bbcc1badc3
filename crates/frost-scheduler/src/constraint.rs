//! 次日排程的約束模型
//!
//! 每張 OP 在每條合格產線上展開成候選批次：整批一小時，
//! 尾批可部分、工期線性縮短；低於產線最小批量的尾批直接剔除。
//! 解的合法性：同線批次不重疊、每張 OP 投產量不超過訂單量。

use chrono::NaiveDate;
use frost_core::{LineId, OpId, PlannerConfig};
use frost_store::Dataset;

/// 候選批次：某 OP 在某線的第 `index` 批
#[derive(Debug, Clone)]
pub struct BatchCandidate {
    pub op: OpId,
    pub line: LineId,
    pub index: usize,
    /// 批量（尾批可小於整批）
    pub size: i64,
    /// 工期（分鐘）
    pub duration_min: i64,
}

/// 模型輸入中的一張 OP
#[derive(Debug, Clone)]
pub struct OpInput {
    pub op: OpId,
    pub qty: i64,
}

/// 單日排程模型
#[derive(Debug, Clone)]
pub struct DayModel {
    pub plan_date: NaiveDate,
    /// 分鐘視界（每日工時 × 60）
    pub horizon_min: i64,
    pub ops: Vec<OpInput>,
    pub candidates: Vec<BatchCandidate>,
}

impl DayModel {
    /// 由資料集建模：取 `plan_date` 開工的 PendingStart OP 與可排產線
    pub fn build(ds: &Dataset, config: &PlannerConfig, plan_date: NaiveDate) -> Self {
        let mut ops = Vec::new();
        let mut candidates = Vec::new();

        let lines = ds.schedulable_lines();

        for op in ds.pending_start_ops_on(plan_date) {
            ops.push(OpInput {
                op: op.id,
                qty: op.qty,
            });

            for line in &lines {
                let Some(rule) = ds.capacity_rule(op.product, line.id) else {
                    continue;
                };
                let batch_size = rule.units_per_hour;
                if batch_size <= 0 {
                    tracing::warn!("{} 在產線 {} 的批量為 0，略過", op.id, line.id);
                    continue;
                }

                let max_batches = (op.qty + batch_size - 1) / batch_size;
                for index in 0..max_batches as usize {
                    let is_last = index as i64 == max_batches - 1;
                    let size = if is_last {
                        let tail = op.qty - batch_size * (max_batches - 1);
                        // 尾批低於最小批量就不投產
                        if tail < rule.min_batch {
                            tracing::warn!(
                                "{} 在產線 {} 的尾批 {tail} 低於最小批量 {}，不生成",
                                op.id,
                                line.id,
                                rule.min_batch
                            );
                            continue;
                        }
                        tail
                    } else {
                        batch_size
                    };

                    let duration_min = (60 * size + batch_size - 1) / batch_size;
                    if duration_min <= 0 {
                        continue;
                    }

                    candidates.push(BatchCandidate {
                        op: op.id,
                        line: line.id,
                        index,
                        size,
                        duration_min,
                    });
                }
            }
        }

        Self {
            plan_date,
            horizon_min: config.daily_minute_horizon(),
            ops,
            candidates,
        }
    }
}

/// 已落定的批次
#[derive(Debug, Clone)]
pub struct Placement {
    pub op: OpId,
    pub line: LineId,
    pub size: i64,
    pub start_min: i64,
    pub end_min: i64,
}

/// 單日排程解
#[derive(Debug, Clone, Default)]
pub struct DaySolution {
    pub placements: Vec<Placement>,
}

impl DaySolution {
    /// 總投產量（目標函數主項）
    pub fn total_output(&self) -> i64 {
        self.placements.iter().map(|p| p.size).sum()
    }

    /// 最晚完工分鐘（目標函數副項，越小越好）
    pub fn makespan(&self) -> i64 {
        self.placements.iter().map(|p| p.end_min).max().unwrap_or(0)
    }

    /// 驗證解的合法性：視界內、同線不重疊、逐 OP 不超量
    pub fn is_feasible(&self, model: &DayModel) -> bool {
        use std::collections::BTreeMap;

        for p in &self.placements {
            if p.start_min < 0 || p.end_min > model.horizon_min || p.start_min >= p.end_min {
                return false;
            }
        }

        let mut by_line: BTreeMap<LineId, Vec<(i64, i64)>> = BTreeMap::new();
        for p in &self.placements {
            by_line.entry(p.line).or_default().push((p.start_min, p.end_min));
        }
        for intervals in by_line.values_mut() {
            intervals.sort();
            for pair in intervals.windows(2) {
                if pair[0].1 > pair[1].0 {
                    return false;
                }
            }
        }

        let mut placed: BTreeMap<OpId, i64> = BTreeMap::new();
        for p in &self.placements {
            *placed.entry(p.op).or_insert(0) += p.size;
        }
        for input in &model.ops {
            if placed.get(&input.op).copied().unwrap_or(0) > input.qty {
                return false;
            }
        }

        true
    }
}
