// ==========================================
// 钢材采购优化系统 - 优化服务门面
// ==========================================
// 职责: 对外统一入口, 对应服务端各接口语义
// 红线: 门面不做业务计算, 仅编排作业层与引擎层
// ==========================================
// 接口对照:
// - optimize            提交优化作业
// - get_progress        查询作业进度
// - cancel              取消作业
// - get_result          获取完成结果
// - list_active         活跃作业列表
// - get_history         历史作业列表
// - validate_constraints 独立约束校验 (不产生作业)
// - system_stats        系统运行统计
// ==========================================

use crate::config::OptimizerConfig;
use crate::domain::constraints::OptimizationConstraints;
use crate::domain::steel::{DesignSteel, ModuleSteel, Remainder};
use crate::engine::{
    ConstraintValidator, OptimizationResult, OptimizerError, ValidationContext, ValidationReport,
};
use crate::job::{manager, JobManager, JobProgress, JobSummary, ManagerStats};
use serde::{Deserialize, Serialize};

/// 优化请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub design_steels: Vec<DesignSteel>,
    pub module_steels: Vec<ModuleSteel>,
    #[serde(default)]
    pub available_remainders: Vec<Remainder>,
    #[serde(default)]
    pub constraints: OptimizationConstraints,
}

// ==========================================
// OptimizationApi - 服务门面
// ==========================================
pub struct OptimizationApi {
    manager: JobManager,
    validator: ConstraintValidator,
}

impl OptimizationApi {
    /// 创建服务门面 (必须在 Tokio 运行时内调用)
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            manager: JobManager::new(config.job_manager, config.solver),
            validator: ConstraintValidator::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(OptimizerConfig::default())
    }

    /// 提交优化作业
    ///
    /// # 返回
    /// 作业ID; 非法输入同步返回 Err(InputError), 不产生作业记录
    pub fn optimize(&self, request: OptimizeRequest) -> Result<String, OptimizerError> {
        self.manager.submit(
            request.design_steels,
            request.module_steels,
            request.available_remainders,
            request.constraints,
        )
    }

    /// 查询作业进度
    pub fn get_progress(&self, job_id: &str) -> Result<JobProgress, OptimizerError> {
        self.manager.get_progress(job_id)
    }

    /// 取消作业 (幂等, 首次生效返回 true)
    pub fn cancel(&self, job_id: &str) -> Result<bool, OptimizerError> {
        self.manager.cancel(job_id)
    }

    /// 获取已完成作业的结果
    pub fn get_result(&self, job_id: &str) -> Result<OptimizationResult, OptimizerError> {
        self.manager.get_result(job_id)
    }

    /// 活跃作业列表
    pub fn list_active(&self) -> Vec<JobSummary> {
        self.manager.list_active()
    }

    /// 历史作业列表 (最近在前, 最多 limit 条; None 时取默认条数)
    pub fn get_history(&self, limit: Option<usize>) -> Vec<JobSummary> {
        self.manager
            .get_history(limit.unwrap_or(manager::DEFAULT_HISTORY_LIMIT))
    }

    /// 独立约束校验 (纯函数, 不产生作业)
    pub fn validate_constraints(
        &self,
        constraints: &OptimizationConstraints,
        design_steels: &[DesignSteel],
        module_steels: &[ModuleSteel],
    ) -> ValidationReport {
        let context = if design_steels.is_empty() && module_steels.is_empty() {
            ValidationContext::constraints_only()
        } else {
            ValidationContext::for_preflight(design_steels, module_steels)
        };
        self.validator.validate(constraints, &context)
    }

    /// 立即清理过期作业, 返回回收数量
    pub fn cleanup_expired(&self) -> usize {
        self.manager.cleanup_expired()
    }

    /// 系统运行统计
    pub fn system_stats(&self) -> ManagerStats {
        self.manager.stats()
    }
}
