// ==========================================
// 钢材采购优化系统 - 领域类型定义
// ==========================================
// 序列化约定:
// - 状态/种类枚举: SCREAMING_SNAKE_CASE (与历史记录一致)
// - sourceType: 小写 (与报表消费方的既有契约一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 作业状态 (Job Status)
// ==========================================
// 生命周期: PENDING -> RUNNING -> COMPLETED | FAILED | CANCELLED
// 终态一旦写入不可回退
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,   // 已提交,等待执行
    Running,   // 求解中
    Completed, // 正常完成
    Failed,    // 执行失败
    Cancelled, // 已取消
}

impl JobStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "PENDING"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

// ==========================================
// 原料来源类型 (Source Type)
// ==========================================
// module: 采购的模数钢材
// remainder: 之前切割留下的余料
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Module,    // 模数钢材
    Remainder, // 余料
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Module => write!(f, "module"),
            SourceType::Remainder => write!(f, "remainder"),
        }
    }
}

// ==========================================
// 余料种类 (Remainder Kind)
// ==========================================
// 红线: 求解器只能消耗 REAL 余料, PSEUDO 余料仅用于报表对比
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemainderKind {
    Real,   // 真实余料,可被后续作业复用
    Pseudo, // 假设余料,仅用于 what-if 报表
}

impl RemainderKind {
    /// 是否可作为切割原料
    pub fn is_usable(&self) -> bool {
        matches!(self, RemainderKind::Real)
    }
}

impl fmt::Display for RemainderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemainderKind::Real => write!(f, "REAL"),
            RemainderKind::Pseudo => write!(f, "PSEUDO"),
        }
    }
}

// ==========================================
// 约束违规严重程度 (Violation Severity)
// ==========================================
// ERROR 使候选方案无效; WARNING 仅记录不阻断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationSeverity {
    Warning, // 警告
    Error,   // 错误
}

impl fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationSeverity::Warning => write!(f, "WARNING"),
            ViolationSeverity::Error => write!(f, "ERROR"),
        }
    }
}
