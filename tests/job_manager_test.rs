// ==========================================
// 作业管理器集成测试
// ==========================================
// 职责: 验证异步作业生命周期
// 场景: 提交/进度/取消/历史容量/过期清理
// 说明: 统一使用单线程运行时, 提交后的后台任务
//       在首个 await 之前不会被轮询, 取消时序可复现
// ==========================================


use std::time::Duration;
use steel_optimizer::{
    JobManager, JobManagerConfig, JobStatus, OptimizerError, SolverConfig,
};

use crate::test_helpers::{create_test_design, create_test_module};

/// 轮询直到作业进入终态
async fn wait_terminal(manager: &JobManager, job_id: &str) -> JobStatus {
    for _ in 0..500 {
        let progress = manager.get_progress(job_id).unwrap();
        if progress.status.is_terminal() {
            return progress.status;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("作业 {} 未在限期内进入终态", job_id);
}

fn submit_standard(manager: &JobManager) -> String {
    manager
        .submit(
            vec![
                create_test_design("d1", 4000.0, 3),
                create_test_design("d2", 2500.0, 2),
            ],
            vec![create_test_module(6000.0)],
            vec![],
            Default::default(),
        )
        .unwrap()
}

// ==========================================
// 生命周期
// ==========================================

#[tokio::test]
async fn test_submit_runs_to_completed() {
    let manager = JobManager::with_defaults();
    let job_id = submit_standard(&manager);

    let status = wait_terminal(&manager, &job_id).await;
    assert_eq!(status, JobStatus::Completed);

    let progress = manager.get_progress(&job_id).unwrap();
    assert_eq!(progress.progress, 1.0);
    assert!(progress.error.is_none());

    let result = manager.get_result(&job_id).unwrap();
    assert_eq!(result.unsatisfied_total, 0);
    assert_eq!(result.total_material, 24000.0);

    // 终态作业已迁出活跃表
    assert!(manager.list_active().is_empty());
    let history = manager.get_history(20);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].job_id, job_id);
}

#[tokio::test]
async fn test_invalid_input_creates_no_job() {
    let manager = JobManager::with_defaults();
    let err = manager
        .submit(vec![], vec![create_test_module(6000.0)], vec![], Default::default())
        .unwrap_err();

    assert!(matches!(err, OptimizerError::InputError(_)));
    assert!(manager.list_active().is_empty());
    assert!(manager.get_history(20).is_empty());
    assert_eq!(manager.stats().failed_total, 0);
}

#[tokio::test]
async fn test_progress_monotonic_during_run() {
    let manager = JobManager::new(
        JobManagerConfig::default(),
        SolverConfig {
            progress_check_interval: 4,
        },
    );
    let job_id = manager
        .submit(
            vec![create_test_design("d1", 500.0, 400)],
            vec![create_test_module(6000.0)],
            vec![],
            Default::default(),
        )
        .unwrap();

    let mut last = 0.0;
    loop {
        let progress = manager.get_progress(&job_id).unwrap();
        assert!(progress.progress >= last, "进度必须单调不减");
        assert!((0.0..=1.0).contains(&progress.progress));
        last = progress.progress;
        if progress.status.is_terminal() {
            assert_eq!(progress.status, JobStatus::Completed);
            assert_eq!(progress.progress, 1.0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

// ==========================================
// 取消
// ==========================================

#[tokio::test]
async fn test_cancel_before_start_never_completes() {
    let manager = JobManager::with_defaults();
    let job_id = submit_standard(&manager);

    // 后台任务尚未被轮询, 取消先于启动写入终态
    assert_eq!(manager.cancel(&job_id).unwrap(), true);

    tokio::time::sleep(Duration::from_millis(50)).await;

    let progress = manager.get_progress(&job_id).unwrap();
    assert_eq!(progress.status, JobStatus::Cancelled);
    assert_eq!(progress.error.as_deref(), Some("作业已取消"));
    assert!(matches!(
        manager.get_result(&job_id),
        Err(OptimizerError::Cancelled)
    ));
}

#[tokio::test]
async fn test_cancel_is_idempotent() {
    let manager = JobManager::with_defaults();
    let job_id = submit_standard(&manager);

    assert_eq!(manager.cancel(&job_id).unwrap(), true);
    // 第二次取消: 已处于终态, 无效果
    assert_eq!(manager.cancel(&job_id).unwrap(), false);
    assert_eq!(manager.stats().cancelled_total, 1);
}

#[tokio::test]
async fn test_cancel_unknown_job_not_found() {
    let manager = JobManager::with_defaults();
    assert!(matches!(
        manager.cancel("no-such-job"),
        Err(OptimizerError::NotFound(_))
    ));
}

// ==========================================
// 历史容量
// ==========================================

#[tokio::test]
async fn test_history_bounded_evicts_oldest() {
    let manager = JobManager::new(
        JobManagerConfig {
            history_capacity: 3,
            ..Default::default()
        },
        SolverConfig::default(),
    );

    let mut job_ids = Vec::new();
    for _ in 0..5 {
        let job_id = submit_standard(&manager);
        manager.cancel(&job_id).unwrap();
        job_ids.push(job_id);
    }

    let history = manager.get_history(20);
    assert_eq!(history.len(), 3);
    // 容量淘汰最旧, 返回最近在前
    let kept: Vec<&str> = history.iter().map(|j| j.job_id.as_str()).collect();
    assert_eq!(kept, vec![&job_ids[4][..], &job_ids[3][..], &job_ids[2][..]]);

    // 被淘汰的作业不可再查询
    assert!(matches!(
        manager.get_progress(&job_ids[0]),
        Err(OptimizerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_history_most_recent_first_with_limit() {
    let manager = JobManager::with_defaults();

    let mut job_ids = Vec::new();
    for _ in 0..3 {
        let job_id = submit_standard(&manager);
        manager.cancel(&job_id).unwrap();
        job_ids.push(job_id);
    }

    // 最近提交的排在最前
    let history = manager.get_history(20);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].job_id, job_ids[2]);
    assert_eq!(history[1].job_id, job_ids[1]);
    assert_eq!(history[2].job_id, job_ids[0]);

    // limit 截断后仍然是最近的两条
    let limited = manager.get_history(2);
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].job_id, job_ids[2]);
    assert_eq!(limited[1].job_id, job_ids[1]);
}

// ==========================================
// 过期清理
// ==========================================

#[tokio::test]
async fn test_cleanup_expired_evicts_with_zero_ttl() {
    let manager = JobManager::new(
        JobManagerConfig {
            job_ttl_secs: 0,
            ..Default::default()
        },
        SolverConfig::default(),
    );
    let job_id = submit_standard(&manager);

    let evicted = manager.cleanup_expired();
    assert_eq!(evicted, 1);

    let progress = manager.get_progress(&job_id).unwrap();
    assert_eq!(progress.status, JobStatus::Cancelled);
    assert_eq!(progress.error.as_deref(), Some("作业超时被清理"));
    assert!(manager.list_active().is_empty());
}

#[tokio::test]
async fn test_cleanup_keeps_fresh_jobs() {
    let manager = JobManager::with_defaults();
    let job_id = submit_standard(&manager);

    // 默认 TTL 300 秒, 新作业不受影响
    assert_eq!(manager.cleanup_expired(), 0);

    let status = wait_terminal(&manager, &job_id).await;
    assert_eq!(status, JobStatus::Completed);
}

// ==========================================
// 统计
// ==========================================

#[tokio::test]
async fn test_stats_counts_terminal_states() {
    let manager = JobManager::with_defaults();

    let completed = submit_standard(&manager);
    wait_terminal(&manager, &completed).await;

    let cancelled = submit_standard(&manager);
    manager.cancel(&cancelled).unwrap();

    let stats = manager.stats();
    assert_eq!(stats.active_jobs, 0);
    assert_eq!(stats.history_jobs, 2);
    assert_eq!(stats.completed_total, 1);
    assert_eq!(stats.cancelled_total, 1);
    assert_eq!(stats.failed_total, 0);
}
