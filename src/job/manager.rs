// ==========================================
// 钢材采购优化系统 - 作业管理器
// ==========================================
// 职责: 异步作业生命周期 (提交/进度/取消/历史/过期清理)
// 红线: 作业表为唯一同步点, 所有写入必须持锁
// 红线: 终态只写一次, 先到者生效
// ==========================================
// 并发: CPU 密集求解在 spawn_blocking 线程执行;
// 取消为协作式, 令牌由求解引擎在检查点轮询
// ==========================================

use crate::config::{JobManagerConfig, SolverConfig};
use crate::domain::constraints::OptimizationConstraints;
use crate::domain::steel::{generate_display_ids, DesignSteel, ModuleSteel, Remainder};
use crate::domain::types::JobStatus;
use crate::engine::{CuttingStockSolver, OptimizationResult, OptimizerError, ResultAggregator};
use crate::job::record::{JobProgress, JobSummary, ManagerStats, OptimizationJob};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 历史查询的默认条数 (调用方未指定 limit 时使用)
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// 活跃作业条目
struct ActiveEntry {
    job: OptimizationJob,
    cancel: CancellationToken,
}

/// 作业表 (唯一同步点)
#[derive(Default)]
struct JobTable {
    active: HashMap<String, ActiveEntry>,
    history: VecDeque<OptimizationJob>,
    completed_total: u64,
    failed_total: u64,
    cancelled_total: u64,
}

impl JobTable {
    /// 将终态作业迁入历史 (插入序, 超容淘汰最旧)
    fn push_history(&mut self, job: OptimizationJob, capacity: usize) {
        match job.status {
            JobStatus::Completed => self.completed_total += 1,
            JobStatus::Failed => self.failed_total += 1,
            JobStatus::Cancelled => self.cancelled_total += 1,
            _ => {}
        }
        self.history.push_back(job);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

// ==========================================
// JobManager - 作业管理器
// ==========================================
pub struct JobManager {
    table: Arc<Mutex<JobTable>>,
    config: JobManagerConfig,
    solver_config: SolverConfig,
    cleanup_handle: Option<JoinHandle<()>>,
}

impl JobManager {
    /// 创建管理器并启动后台清扫任务
    ///
    /// 必须在 Tokio 运行时内调用
    pub fn new(config: JobManagerConfig, solver_config: SolverConfig) -> Self {
        let table: Arc<Mutex<JobTable>> = Arc::new(Mutex::new(JobTable::default()));

        let cleanup_handle = Self::spawn_cleanup_task(Arc::clone(&table), config.clone());

        Self {
            table,
            config,
            solver_config,
            cleanup_handle: Some(cleanup_handle),
        }
    }

    /// 默认配置的管理器
    pub fn with_defaults() -> Self {
        Self::new(JobManagerConfig::default(), SolverConfig::default())
    }

    fn spawn_cleanup_task(
        table: Arc<Mutex<JobTable>>,
        config: JobManagerConfig,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(config.cleanup_interval_secs.max(1)));
            // 首个 tick 立即到达, 跳过
            interval.tick().await;
            loop {
                interval.tick().await;
                let evicted = Self::evict_expired(&table, &config);
                if evicted > 0 {
                    info!(evicted = evicted, "后台清扫回收过期作业");
                }
            }
        })
    }

    fn lock_table(table: &Mutex<JobTable>) -> MutexGuard<'_, JobTable> {
        // 持锁线程不会 panic 留下中间态, 毒锁直接恢复
        table.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ==========================================
    // 作业提交
    // ==========================================

    /// 提交优化作业
    ///
    /// # 流程
    /// 1. 同步快速失败校验 (非法输入不产生作业记录)
    /// 2. 生成作业ID并登记 PENDING
    /// 3. 后台任务: 标记 RUNNING, 阻塞线程执行求解,
    ///    完成后写入终态并迁入历史
    ///
    /// # 返回
    /// 作业ID; 输入非法返回 Err(InputError)
    pub fn submit(
        &self,
        mut design_steels: Vec<DesignSteel>,
        module_steels: Vec<ModuleSteel>,
        available_remainders: Vec<Remainder>,
        constraints: OptimizationConstraints,
    ) -> Result<String, OptimizerError> {
        // 1. 快速失败: 非法输入不留痕
        CuttingStockSolver::validate_input(
            &design_steels,
            &module_steels,
            &available_remainders,
        )?;

        // 2. 展示编号分配 (按截面分组 A1/A2/B1...)
        design_steels = generate_display_ids(design_steels);

        let job_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();

        {
            let mut table = Self::lock_table(&self.table);
            table.active.insert(
                job_id.clone(),
                ActiveEntry {
                    job: OptimizationJob::new(job_id.clone()),
                    cancel: cancel.clone(),
                },
            );
        }

        info!(job_id = %job_id, designs = design_steels.len(), "作业已提交");

        // 3. 后台执行
        let table = Arc::clone(&self.table);
        let history_capacity = self.config.history_capacity;
        let solver_config = self.solver_config.clone();
        let worker_job_id = job_id.clone();

        tokio::spawn(async move {
            Self::run_job(
                table,
                history_capacity,
                solver_config,
                worker_job_id,
                cancel,
                design_steels,
                module_steels,
                available_remainders,
                constraints,
            )
            .await;
        });

        Ok(job_id)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_job(
        table: Arc<Mutex<JobTable>>,
        history_capacity: usize,
        solver_config: SolverConfig,
        job_id: String,
        cancel: CancellationToken,
        design_steels: Vec<DesignSteel>,
        module_steels: Vec<ModuleSteel>,
        available_remainders: Vec<Remainder>,
        constraints: OptimizationConstraints,
    ) {
        // 取消可能先于启动到达 (终态已由 cancel 写入)
        if cancel.is_cancelled() {
            return;
        }

        {
            let mut guard = Self::lock_table(&table);
            match guard.active.get_mut(&job_id) {
                Some(entry) if entry.job.status == JobStatus::Pending => {
                    entry.job.status = JobStatus::Running;
                }
                _ => return,
            }
        }

        let progress_table = Arc::clone(&table);
        let progress_job_id = job_id.clone();
        let solver_cancel = cancel.clone();
        let solver_job_id = job_id.clone();

        let started = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || {
            let solver = CuttingStockSolver::with_config(solver_config);
            let progress = move |p: f64| {
                let mut guard = Self::lock_table(&progress_table);
                if let Some(entry) = guard.active.get_mut(&progress_job_id) {
                    // 进度单调不减且封顶 1.0
                    if p > entry.job.progress {
                        entry.job.progress = p.min(1.0);
                    }
                }
            };
            solver.solve(
                &design_steels,
                &module_steels,
                &available_remainders,
                &constraints,
                &solver_job_id,
                &progress,
                &solver_cancel,
            )
        })
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(solutions)) => {
                let result = ResultAggregator::new().aggregate(solutions, elapsed_ms);
                Self::finish_job(
                    &table,
                    history_capacity,
                    &job_id,
                    JobStatus::Completed,
                    Some(result),
                    None,
                );
            }
            Ok(Err(OptimizerError::Cancelled)) => {
                Self::finish_job(
                    &table,
                    history_capacity,
                    &job_id,
                    JobStatus::Cancelled,
                    None,
                    Some("作业已取消".to_string()),
                );
            }
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "求解失败");
                Self::finish_job(
                    &table,
                    history_capacity,
                    &job_id,
                    JobStatus::Failed,
                    None,
                    Some(e.to_string()),
                );
            }
            Err(join_err) => {
                error!(job_id = %job_id, error = %join_err, "求解线程异常退出");
                Self::finish_job(
                    &table,
                    history_capacity,
                    &job_id,
                    JobStatus::Failed,
                    None,
                    Some(format!("求解线程异常退出: {}", join_err)),
                );
            }
        }
    }

    /// 写入终态并迁入历史; 条目已不在活跃表时放弃 (先到者生效)
    fn finish_job(
        table: &Mutex<JobTable>,
        history_capacity: usize,
        job_id: &str,
        status: JobStatus,
        result: Option<OptimizationResult>,
        error: Option<String>,
    ) {
        let mut guard = Self::lock_table(table);
        let Some(mut entry) = guard.active.remove(job_id) else {
            return;
        };
        if entry.job.status.is_terminal() {
            guard.active.insert(job_id.to_string(), entry);
            return;
        }

        entry.job.status = status;
        entry.job.completed_at = Some(Utc::now());
        entry.job.error = error;
        if status == JobStatus::Completed {
            entry.job.progress = 1.0;
            entry.job.result = result;
        }

        info!(job_id = %job_id, status = %status, "作业进入终态");
        guard.push_history(entry.job, history_capacity);
    }

    // ==========================================
    // 查询与取消
    // ==========================================

    /// 查询作业进度 (活跃表优先, 其次历史)
    pub fn get_progress(&self, job_id: &str) -> Result<JobProgress, OptimizerError> {
        let guard = Self::lock_table(&self.table);
        if let Some(entry) = guard.active.get(job_id) {
            return Ok(JobProgress {
                job_id: job_id.to_string(),
                status: entry.job.status,
                progress: entry.job.progress,
                error: entry.job.error.clone(),
            });
        }
        if let Some(job) = guard.history.iter().find(|j| j.id == job_id) {
            return Ok(JobProgress {
                job_id: job_id.to_string(),
                status: job.status,
                progress: job.progress,
                error: job.error.clone(),
            });
        }
        Err(OptimizerError::NotFound(job_id.to_string()))
    }

    /// 获取已完成作业的结果
    pub fn get_result(&self, job_id: &str) -> Result<OptimizationResult, OptimizerError> {
        let guard = Self::lock_table(&self.table);
        let job = guard
            .history
            .iter()
            .find(|j| j.id == job_id)
            .or_else(|| guard.active.get(job_id).map(|e| &e.job))
            .ok_or_else(|| OptimizerError::NotFound(job_id.to_string()))?;

        match (&job.status, &job.result) {
            (JobStatus::Completed, Some(result)) => Ok(result.clone()),
            (JobStatus::Failed, _) => Err(OptimizerError::Internal(format!(
                "作业已失败: {}",
                job.error.clone().unwrap_or_default()
            ))),
            (JobStatus::Cancelled, _) => Err(OptimizerError::Cancelled),
            _ => Err(OptimizerError::Internal(format!(
                "作业尚未完成, 当前状态 {}",
                job.status
            ))),
        }
    }

    /// 取消作业 (幂等)
    ///
    /// # 返回
    /// - Ok(true): 本次调用触发了取消
    /// - Ok(false): 作业已处于终态, 本次调用无效果
    /// - Err(NotFound): 作业不存在
    pub fn cancel(&self, job_id: &str) -> Result<bool, OptimizerError> {
        let mut guard = Self::lock_table(&self.table);

        let Some(mut entry) = guard.active.remove(job_id) else {
            // 已迁入历史的作业视为终态
            if guard.history.iter().any(|j| j.id == job_id) {
                return Ok(false);
            }
            return Err(OptimizerError::NotFound(job_id.to_string()));
        };

        if entry.job.status.is_terminal() {
            guard.active.insert(job_id.to_string(), entry);
            return Ok(false);
        }

        // 终态先写, 求解线程随后在检查点观察到令牌退出
        entry.cancel.cancel();
        entry.job.status = JobStatus::Cancelled;
        entry.job.completed_at = Some(Utc::now());
        entry.job.error = Some("作业已取消".to_string());

        info!(job_id = %job_id, "作业已取消");
        let capacity = self.config.history_capacity;
        guard.push_history(entry.job, capacity);
        Ok(true)
    }

    /// 活跃作业列表 (提交时间升序)
    pub fn list_active(&self) -> Vec<JobSummary> {
        let guard = Self::lock_table(&self.table);
        let mut summaries: Vec<JobSummary> = guard
            .active
            .values()
            .map(|e| JobSummary::from_job(&e.job))
            .collect();
        summaries.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        summaries
    }

    /// 历史作业列表 (最近在前, 最多 limit 条)
    pub fn get_history(&self, limit: usize) -> Vec<JobSummary> {
        let guard = Self::lock_table(&self.table);
        guard
            .history
            .iter()
            .rev()
            .take(limit)
            .map(JobSummary::from_job)
            .collect()
    }

    /// 系统运行统计
    pub fn stats(&self) -> ManagerStats {
        let guard = Self::lock_table(&self.table);
        ManagerStats {
            active_jobs: guard.active.len(),
            history_jobs: guard.history.len(),
            completed_total: guard.completed_total,
            failed_total: guard.failed_total,
            cancelled_total: guard.cancelled_total,
        }
    }

    // ==========================================
    // 过期清理
    // ==========================================

    /// 立即执行一次过期清理
    ///
    /// 超过 TTL 的活跃作业被取消并迁入历史, 返回回收数量
    pub fn cleanup_expired(&self) -> usize {
        Self::evict_expired(&self.table, &self.config)
    }

    fn evict_expired(table: &Mutex<JobTable>, config: &JobManagerConfig) -> usize {
        let now = Utc::now();
        let mut guard = Self::lock_table(table);

        let expired: Vec<String> = guard
            .active
            .iter()
            .filter(|(_, e)| e.job.age_secs(now) >= config.job_ttl_secs)
            .map(|(id, _)| id.clone())
            .collect();

        for job_id in &expired {
            if let Some(mut entry) = guard.active.remove(job_id) {
                entry.cancel.cancel();
                entry.job.status = JobStatus::Cancelled;
                entry.job.completed_at = Some(now);
                entry.job.error = Some("作业超时被清理".to_string());
                warn!(job_id = %job_id, "作业超时被清理");
                guard.push_history(entry.job, config.history_capacity);
            }
        }

        expired.len()
    }
}

impl Drop for JobManager {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.take() {
            handle.abort();
        }
    }
}
