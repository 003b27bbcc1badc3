//! 有界時間的批次擺放求解
//!
//! 以多起點貪婪搜尋取代外部 CP 求解器，邊界不變：
//! `solve_day(model, config)` 在牆鐘預算內回傳最佳解，無解回 `None`。
//! 種子 0 以輸入順序執行保證有確定性的基準解，
//! 其餘工作者以亂數種子打散 OP 順序並行探索。

use crate::constraint::{BatchCandidate, DayModel, DaySolution, Placement};
use frost_core::{LineId, OpId, SolverConfig};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// 在時間預算內求單日排程解
pub fn solve_day(model: &DayModel, config: &SolverConfig) -> Option<DaySolution> {
    if model.ops.is_empty() || model.candidates.is_empty() {
        return None;
    }

    let deadline = Instant::now() + Duration::from_secs(config.max_seconds);
    let seeds: Vec<u64> = (0..config.workers.max(1) as u64).collect();

    let mut results: Vec<(i64, i64, u64, DaySolution)> = seeds
        .par_iter()
        .filter_map(|&seed| {
            // 種子 0 一定執行；其餘超過預算即放棄
            if seed != 0 && Instant::now() >= deadline {
                return None;
            }
            let solution = greedy_pass(model, seed);
            Some((solution.total_output(), solution.makespan(), seed, solution))
        })
        .collect();

    // 最大投產量優先，其次最小 makespan，再以種子序保證決定性
    results.sort_by_key(|(output, makespan, seed, _)| (Reverse(*output), *makespan, *seed));
    let (_, _, _, best) = results.into_iter().next()?;

    if best.placements.is_empty() || !best.is_feasible(model) {
        return None;
    }
    Some(best)
}

/// 單次貪婪擺放
///
/// 每輪依 OP 順序各放一批：在該 OP 的各線佇列中挑
/// 批量最大、線上游標最早者，貼齊游標落下（同線自然不重疊）。
fn greedy_pass(model: &DayModel, seed: u64) -> DaySolution {
    let qty_by_op: BTreeMap<OpId, i64> = model.ops.iter().map(|o| (o.op, o.qty)).collect();

    let mut queues: BTreeMap<(OpId, LineId), VecDeque<&BatchCandidate>> = BTreeMap::new();
    for candidate in &model.candidates {
        queues
            .entry((candidate.op, candidate.line))
            .or_default()
            .push_back(candidate);
    }

    let mut order: Vec<OpId> = model.ops.iter().map(|o| o.op).collect();
    if seed != 0 {
        order.shuffle(&mut StdRng::seed_from_u64(seed));
    }

    let mut line_cursor: BTreeMap<LineId, i64> = BTreeMap::new();
    let mut placed_by_op: BTreeMap<OpId, i64> = BTreeMap::new();
    let mut placements: Vec<Placement> = Vec::new();

    loop {
        let mut progressed = false;

        for &op in &order {
            let remaining = qty_by_op[&op] - placed_by_op.get(&op).copied().unwrap_or(0);
            if remaining <= 0 {
                continue;
            }

            // 挑可行批次：批量大者優先，其次游標早的線
            let mut chosen: Option<(i64, i64, LineId, bool)> = None;
            for ((owner, line), queue) in &queues {
                if *owner != op {
                    continue;
                }
                let cursor = line_cursor.get(line).copied().unwrap_or(0);

                for (candidate, from_back) in [
                    (queue.front(), false),
                    (queue.back(), true),
                ] {
                    let Some(candidate) = candidate else { continue };
                    if candidate.size > remaining {
                        continue;
                    }
                    if cursor + candidate.duration_min > model.horizon_min {
                        continue;
                    }
                    let better = match &chosen {
                        None => true,
                        Some((size, best_cursor, best_line, _)) => {
                            (candidate.size, Reverse(cursor), Reverse(*line))
                                > (*size, Reverse(*best_cursor), Reverse(*best_line))
                        }
                    };
                    if better {
                        chosen = Some((candidate.size, cursor, *line, from_back));
                    }
                    // 佇列頭放得下就不用看尾批
                    if !from_back {
                        break;
                    }
                }
            }

            if let Some((_, cursor, line, from_back)) = chosen {
                let queue = queues.get_mut(&(op, line)).expect("剛走訪過的佇列必然存在");
                let candidate = if from_back {
                    queue.pop_back()
                } else {
                    queue.pop_front()
                }
                .expect("挑中的批次必然仍在佇列");

                placements.push(Placement {
                    op,
                    line,
                    size: candidate.size,
                    start_min: cursor,
                    end_min: cursor + candidate.duration_min,
                });
                line_cursor.insert(line, cursor + candidate.duration_min);
                *placed_by_op.entry(op).or_insert(0) += candidate.size;
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    DaySolution { placements }
}
