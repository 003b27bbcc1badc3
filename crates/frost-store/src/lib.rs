//! # Frost Store
//!
//! 持久層模擬：`Dataset` 與關聯式儲存的資料表一一對應，
//! `PlanningStore` 提供快照式交易與 run 級別諮詢鎖。
//!
//! 計劃核心一律透過這裡的查詢介面取數，不在記憶體中追物件圖。

pub mod dataset;
pub mod transaction;

// Re-export 主要類型
pub use dataset::Dataset;
pub use transaction::PlanningStore;
