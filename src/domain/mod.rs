// ==========================================
// 钢材采购优化系统 - 领域层
// ==========================================
// 职责: 数据契约与领域实体, 不含业务流程
// ==========================================

pub mod constraints;
pub mod plan;
pub mod steel;
pub mod types;

// 重导出核心实体
pub use constraints::{OptimizationConstraints, LENGTH_EPSILON};
pub use plan::{Cut, CuttingPlan, Solution, UnsatisfiedDemand};
pub use steel::{generate_display_ids, group_key_of, DesignSteel, ModuleSteel, Remainder};
