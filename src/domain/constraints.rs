// ==========================================
// 钢材采购优化系统 - 优化约束条件
// ==========================================
// 职责: 承载焊接/余料工艺约束,由调用方随请求传入
// 红线: 长度比较一律使用 LENGTH_EPSILON 容差
// ==========================================

use serde::{Deserialize, Serialize};

/// 长度比较容差 (mm)
///
/// 所有长度相等/包含判断都必须经过该容差,吸收浮点累计误差
pub const LENGTH_EPSILON: f64 = 0.001;

// ==========================================
// OptimizationConstraints - 优化约束条件
// ==========================================

/// 优化约束条件
///
/// 对应提交契约中的 constraints 字段
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationConstraints {
    /// 最小焊接段长度 (mm)
    ///
    /// 任何留作复用的余料都必须不短于该值,
    /// 否则后续焊接时会产生不可用的短段
    #[serde(default = "default_min_weld_segment")]
    pub min_weld_segment: f64,

    /// 余料复用阈值 (mm)
    ///
    /// 切割后剩余长度低于该值计为废料,不低于该值生成新余料
    #[serde(default = "default_reuse_threshold")]
    pub reuse_threshold: f64,

    /// 目标损耗率 (%)
    ///
    /// 仅用于报表对比,不参与求解
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_loss_rate: Option<f64>,

    /// 是否记录假设余料 (PSEUDO)
    ///
    /// 开启后,计为废料的剩余段会同时记录为假设余料,
    /// 供 what-if 报表对比; 假设余料永远不会被消耗
    #[serde(default)]
    pub track_pseudo_remainders: bool,
}

fn default_min_weld_segment() -> f64 {
    200.0
}

fn default_reuse_threshold() -> f64 {
    300.0
}

impl Default for OptimizationConstraints {
    fn default() -> Self {
        Self {
            min_weld_segment: default_min_weld_segment(),
            reuse_threshold: default_reuse_threshold(),
            target_loss_rate: None,
            track_pseudo_remainders: false,
        }
    }
}

impl OptimizationConstraints {
    /// 余料最小可留长度
    ///
    /// 余料既要达到复用阈值,又要满足最小焊接段,取两者较大值
    pub fn min_usable_remainder(&self) -> f64 {
        self.reuse_threshold.max(self.min_weld_segment)
    }

    /// 两个长度在容差内是否相等
    pub fn lengths_equal(a: f64, b: f64) -> bool {
        (a - b).abs() <= LENGTH_EPSILON
    }

    /// a 在容差内是否不小于 b
    pub fn length_at_least(a: f64, b: f64) -> bool {
        a + LENGTH_EPSILON >= b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let c = OptimizationConstraints::default();
        assert_eq!(c.min_weld_segment, 200.0);
        assert_eq!(c.reuse_threshold, 300.0);
        assert!(!c.track_pseudo_remainders);
    }

    #[test]
    fn test_min_usable_remainder() {
        let mut c = OptimizationConstraints::default();
        assert_eq!(c.min_usable_remainder(), 300.0);

        // 复用阈值低于最小焊接段时,以焊接段为准
        c.reuse_threshold = 100.0;
        assert_eq!(c.min_usable_remainder(), 200.0);
    }

    #[test]
    fn test_length_comparison_with_epsilon() {
        assert!(OptimizationConstraints::lengths_equal(1000.0, 1000.0005));
        assert!(!OptimizationConstraints::lengths_equal(1000.0, 1000.1));
        assert!(OptimizationConstraints::length_at_least(999.9995, 1000.0));
        assert!(!OptimizationConstraints::length_at_least(999.9, 1000.0));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        // 契约字段为 camelCase,缺省字段取默认值
        let c: OptimizationConstraints =
            serde_json::from_str(r#"{"minWeldSegment": 500.0}"#).unwrap();
        assert_eq!(c.min_weld_segment, 500.0);
        assert_eq!(c.reuse_threshold, 300.0);
    }
}
