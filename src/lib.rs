// ==========================================
// 钢材采购优化系统 - 核心库
// ==========================================
// 技术栈: Rust + Tokio
// 系统定位: 采购优化引擎 (上层 HTTP/报表为薄封装)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 求解与校验
pub mod engine;

// 作业层 - 异步作业生命周期
pub mod job;

// 配置层 - 引擎配置
pub mod config;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{JobStatus, RemainderKind, SourceType, ViolationSeverity};

// 领域实体
pub use domain::{
    Cut, CuttingPlan, DesignSteel, ModuleSteel, OptimizationConstraints, Remainder, Solution,
    UnsatisfiedDemand,
};

// 引擎
pub use engine::{
    ConstraintValidator, CuttingStockSolver, OptimizationResult, OptimizerError, ResultAggregator,
    ValidationContext, ValidationReport, Violation,
};

// 作业管理
pub use job::{JobManager, JobProgress, JobSummary, ManagerStats, OptimizationJob};

// API
pub use api::{OptimizationApi, OptimizeRequest};

// 配置
pub use config::{JobManagerConfig, OptimizerConfig, SolverConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "钢材采购优化系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
