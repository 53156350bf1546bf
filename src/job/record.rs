// ==========================================
// 钢材采购优化系统 - 作业记录
// ==========================================
// 作业状态机: PENDING -> RUNNING -> {COMPLETED | FAILED | CANCELLED}
// 红线: 终态只允许写入一次
// ==========================================

use crate::domain::types::JobStatus;
use crate::engine::OptimizationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 优化作业
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationJob {
    pub id: String,
    pub status: JobStatus,
    /// 进度 [0,1], 单调不减
    pub progress: f64,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OptimizationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OptimizationJob {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0.0,
            submitted_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// 作业存活时长 (秒)
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.submitted_at).num_seconds().max(0) as u64
    }
}

/// 进度查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 作业摘要 (活跃/历史列表)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: f64,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobSummary {
    pub fn from_job(job: &OptimizationJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
            submitted_at: job.submitted_at,
            completed_at: job.completed_at,
        }
    }
}

/// 系统运行统计
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStats {
    pub active_jobs: usize,
    pub history_jobs: usize,
    pub completed_total: u64,
    pub failed_total: u64,
    pub cancelled_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_job_is_pending() {
        let job = OptimizationJob::new("j-1".to_string());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_age_secs() {
        let mut job = OptimizationJob::new("j-1".to_string());
        let now = job.submitted_at + Duration::seconds(120);
        assert_eq!(job.age_secs(now), 120);

        // 时钟回拨不得出现下溢
        job.submitted_at = now + Duration::seconds(60);
        assert_eq!(job.age_secs(now), 0);
    }
}
