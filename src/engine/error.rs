// ==========================================
// 钢材采购优化系统 - 引擎错误类型
// ==========================================
// 职责: 定义引擎层错误分类
// 红线: 所有错误必须携带可解释的原因
// ==========================================

use thiserror::Error;

/// 引擎错误类型
///
/// 分类约定:
/// - InputError / NotFound: 同步返回给调用方,不创建作业
/// - Cancelled: 协作式取消,终态但不是错误
/// - InvariantViolation: 内部缺陷,作业转 FAILED 并记录完整上下文
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// 输入数据不合法 (空需求/非正长度等), 快速失败
    #[error("无效输入: {0}")]
    InputError(String),

    /// 作业ID不存在 (既不在活跃表也不在历史中)
    #[error("作业未找到: {0}")]
    NotFound(String),

    /// 约束校验失败 (仅在独立校验入口作为错误返回)
    #[error("约束违反: {0}")]
    ConstraintViolation(String),

    /// 协作式取消
    #[error("作业已取消")]
    Cancelled,

    /// 内部不变量破坏 (长度守恒/状态机), 致命缺陷
    #[error("内部不变量违反: job_id={job_id}, group={group_key}, detail={detail}")]
    InvariantViolation {
        job_id: String,
        group_key: String,
        detail: String,
    },

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OptimizerError {
    /// 是否为调用方输入问题 (非系统缺陷)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            OptimizerError::InputError(_)
                | OptimizerError::NotFound(_)
                | OptimizerError::ConstraintViolation(_)
        )
    }
}
