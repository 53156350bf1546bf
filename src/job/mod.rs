// ==========================================
// 钢材采购优化系统 - 作业层
// ==========================================

pub mod manager;
pub mod record;

pub use manager::JobManager;
pub use record::{JobProgress, JobSummary, ManagerStats, OptimizationJob};
