//! # Frost Scheduler
//!
//! 次日戰術排程：把 PendingStart 的 OP 拆成逐小時批次，
//! 在各產線分鐘視界內求最大投產量，落成 OT 硬保留。
//! 求解器是黑盒邊界：逾時或無解是正常結果，候選 OP 退回 Waiting。

pub mod constraint;
pub mod scheduling;
pub mod solver;

// Re-export 主要類型
pub use constraint::{BatchCandidate, DayModel, DaySolution, Placement};
pub use scheduling::{ScheduleOutcome, TacticalScheduler};
pub use solver::solve_day;
