// ==========================================
// 钢材采购优化系统 - 配置层
// ==========================================
// 所有配置均提供生产默认值; 测试可按需覆盖
// ==========================================

use serde::{Deserialize, Serialize};

/// 求解器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverConfig {
    /// 进度/取消检查间隔 (每落位多少件检查一次)
    #[serde(default = "default_progress_check_interval")]
    pub progress_check_interval: u64,
}

fn default_progress_check_interval() -> u64 {
    16
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            progress_check_interval: default_progress_check_interval(),
        }
    }
}

/// 作业管理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobManagerConfig {
    /// 历史作业保留上限 (插入序, 超出淘汰最旧)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 活跃作业存活时间 (秒), 超时视为过期
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
    /// 后台清扫周期 (秒)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_history_capacity() -> usize {
    50
}

fn default_job_ttl_secs() -> u64 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            job_ttl_secs: default_job_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// 系统整体配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerConfig {
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub job_manager: JobManagerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.solver.progress_check_interval, 16);
        assert_eq!(config.job_manager.history_capacity, 50);
        assert_eq!(config.job_manager.job_ttl_secs, 300);
        assert_eq!(config.job_manager.cleanup_interval_secs, 60);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: OptimizerConfig =
            serde_json::from_str(r#"{"jobManager":{"historyCapacity":10}}"#).unwrap();
        assert_eq!(config.job_manager.history_capacity, 10);
        assert_eq!(config.job_manager.job_ttl_secs, 300);
        assert_eq!(config.solver.progress_check_interval, 16);
    }
}
