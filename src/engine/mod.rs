// ==========================================
// 钢材采购优化系统 - 引擎层
// ==========================================
// 求解引擎为纯同步计算, 不持有共享状态;
// 异步生命周期由 job 层负责
// ==========================================

pub mod aggregator;
pub mod error;
pub mod solver;
pub mod validator;

pub use aggregator::{OptimizationResult, ResultAggregator};
pub use error::OptimizerError;
pub use solver::CuttingStockSolver;
pub use validator::{ConstraintValidator, ValidationContext, ValidationReport, Violation};
