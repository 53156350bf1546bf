// ==========================================
// 钢材采购优化系统 - 约束校验器
// ==========================================
// 职责: 工艺约束的纯函数校验
// 输入: 约束条件 + 校验上下文 (独立预检 / 候选切割方案)
// 输出: 违规列表 (ERROR 使候选无效, WARNING 仅记录)
// 红线: 不修改输入; 相同输入必须产生相同违规集合
// ==========================================

use crate::domain::constraints::{OptimizationConstraints, LENGTH_EPSILON};
use crate::domain::plan::CuttingPlan;
use crate::domain::steel::{DesignSteel, ModuleSteel};
use crate::domain::types::ViolationSeverity;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ==========================================
// Violation / ValidationReport - 校验输出
// ==========================================

/// 单条约束违规
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// 规则编号 (W1/W2/W3/P1/P2...)
    pub rule_id: String,
    /// 违规说明
    pub message: String,
    /// 严重程度
    pub severity: ViolationSeverity,
}

/// 校验报告
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// 是否有效 (无 ERROR 级违规)
    pub valid: bool,
    /// 违规列表
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        let valid = violations
            .iter()
            .all(|v| v.severity != ViolationSeverity::Error);
        Self { valid, violations }
    }
}

// ==========================================
// ValidationContext - 校验上下文
// ==========================================

/// 校验上下文
///
/// 预检入口携带需求与原料清单; 求解器内部仅携带候选方案
#[derive(Debug, Clone, Default)]
pub struct ValidationContext<'a> {
    /// 候选切割方案 (求解器内部校验)
    pub plan: Option<&'a CuttingPlan>,
    /// 设计钢材清单 (预检)
    pub design_steels: Option<&'a [DesignSteel]>,
    /// 模数钢材清单 (预检)
    pub module_steels: Option<&'a [ModuleSteel]>,
}

impl<'a> ValidationContext<'a> {
    /// 仅校验约束条件本身
    pub fn constraints_only() -> Self {
        Self::default()
    }

    /// 提交前的预检上下文
    pub fn for_preflight(
        design_steels: &'a [DesignSteel],
        module_steels: &'a [ModuleSteel],
    ) -> Self {
        Self {
            plan: None,
            design_steels: Some(design_steels),
            module_steels: Some(module_steels),
        }
    }

    /// 候选切割方案的校验上下文
    pub fn for_plan(plan: &'a CuttingPlan) -> Self {
        Self {
            plan: Some(plan),
            design_steels: None,
            module_steels: None,
        }
    }
}

// ==========================================
// ConstraintValidator - 约束校验器
// ==========================================
// 无状态引擎,所有输入通过参数传入
pub struct ConstraintValidator {
    // 无状态
}

impl ConstraintValidator {
    /// 创建新的约束校验器
    pub fn new() -> Self {
        Self {}
    }

    /// 执行校验
    ///
    /// # 参数
    /// - constraints: 约束条件
    /// - context: 校验上下文
    ///
    /// # 返回
    /// 校验报告; ERROR 级违规使 valid=false
    ///
    /// # 规则
    /// - W1: 最小焊接段必须为正有限值
    /// - W2: 余料复用阈值必须为正有限值; 低于最小焊接段仅警告
    /// - W3: 目标损耗率超出 [0,100] 仅警告
    /// - W4: 超长设计件需要焊接; 焊接尾段短于最小焊接段为 ERROR
    /// - P1: 候选方案新余料不得短于最小焊接段
    /// - P2: 候选方案新余料不得短于复用阈值
    pub fn validate(
        &self,
        constraints: &OptimizationConstraints,
        context: &ValidationContext<'_>,
    ) -> ValidationReport {
        let mut violations = Vec::new();

        // 1. 约束条件自身
        self.check_constraint_values(constraints, &mut violations);

        // 2. 预检: 需求与原料的焊接可行性
        if let (Some(designs), Some(modules)) = (context.design_steels, context.module_steels) {
            self.check_welding_feasibility(constraints, designs, modules, &mut violations);
        }

        // 3. 候选切割方案
        if let Some(plan) = context.plan {
            self.check_candidate_plan(constraints, plan, &mut violations);
        }

        let report = ValidationReport::from_violations(violations);

        if !report.valid {
            debug!(
                violations = report.violations.len(),
                "约束校验未通过"
            );
        }

        report
    }

    // ==========================================
    // 规则实现
    // ==========================================

    /// W1/W2/W3: 约束条件取值校验
    fn check_constraint_values(
        &self,
        constraints: &OptimizationConstraints,
        violations: &mut Vec<Violation>,
    ) {
        if !constraints.min_weld_segment.is_finite() || constraints.min_weld_segment <= 0.0 {
            violations.push(Violation {
                rule_id: "W1".to_string(),
                message: format!(
                    "最小焊接段长度 {} 必须为正有限值",
                    constraints.min_weld_segment
                ),
                severity: ViolationSeverity::Error,
            });
        }

        if !constraints.reuse_threshold.is_finite() || constraints.reuse_threshold <= 0.0 {
            violations.push(Violation {
                rule_id: "W2".to_string(),
                message: format!(
                    "余料复用阈值 {} 必须为正有限值",
                    constraints.reuse_threshold
                ),
                severity: ViolationSeverity::Error,
            });
        } else if constraints.reuse_threshold < constraints.min_weld_segment {
            violations.push(Violation {
                rule_id: "W2".to_string(),
                message: format!(
                    "余料复用阈值 {} 低于最小焊接段 {}, 实际按 {} 留料",
                    constraints.reuse_threshold,
                    constraints.min_weld_segment,
                    constraints.min_usable_remainder()
                ),
                severity: ViolationSeverity::Warning,
            });
        }

        if let Some(rate) = constraints.target_loss_rate {
            if !(0.0..=100.0).contains(&rate) {
                violations.push(Violation {
                    rule_id: "W3".to_string(),
                    message: format!("目标损耗率 {} 超出有效范围 [0, 100]", rate),
                    severity: ViolationSeverity::Warning,
                });
            }
        }
    }

    /// W4: 超长设计件的焊接分段可行性
    ///
    /// 设计件长于最长模数钢材时必须焊接;
    /// 均分切段后尾段短于最小焊接段则该件不可制造
    fn check_welding_feasibility(
        &self,
        constraints: &OptimizationConstraints,
        designs: &[DesignSteel],
        modules: &[ModuleSteel],
        violations: &mut Vec<Violation>,
    ) {
        let max_module = modules
            .iter()
            .map(|m| m.length)
            .fold(0.0_f64, f64::max);

        if max_module <= 0.0 {
            return;
        }

        for design in designs {
            if design.length <= max_module + LENGTH_EPSILON {
                continue;
            }

            // 需要焊接: k 段, 前 k-1 段取满长, 尾段为剩余
            let segments = (design.length / max_module).ceil() as u32;
            let tail = design.length - (segments - 1) as f64 * max_module;

            if tail + LENGTH_EPSILON < constraints.min_weld_segment {
                violations.push(Violation {
                    rule_id: "W4".to_string(),
                    message: format!(
                        "设计件 {} 长度 {} 需焊接 {} 段, 尾段 {:.1} 短于最小焊接段 {}",
                        design.id, design.length, segments, tail, constraints.min_weld_segment
                    ),
                    severity: ViolationSeverity::Error,
                });
            } else {
                violations.push(Violation {
                    rule_id: "W4".to_string(),
                    message: format!(
                        "设计件 {} 长度 {} 超过最长模数钢材 {}, 需要焊接 {} 段",
                        design.id, design.length, max_module, segments
                    ),
                    severity: ViolationSeverity::Warning,
                });
            }
        }
    }

    /// P1/P2: 候选切割方案的余料校验
    fn check_candidate_plan(
        &self,
        constraints: &OptimizationConstraints,
        plan: &CuttingPlan,
        violations: &mut Vec<Violation>,
    ) {
        for remainder in &plan.new_remainders {
            if remainder.length + LENGTH_EPSILON < constraints.min_weld_segment {
                violations.push(Violation {
                    rule_id: "P1".to_string(),
                    message: format!(
                        "新余料 {:.1} 短于最小焊接段 {}, 无法用于后续焊接",
                        remainder.length, constraints.min_weld_segment
                    ),
                    severity: ViolationSeverity::Error,
                });
            }

            if remainder.length + LENGTH_EPSILON < constraints.reuse_threshold {
                violations.push(Violation {
                    rule_id: "P2".to_string(),
                    message: format!(
                        "新余料 {:.1} 低于复用阈值 {}, 应计为废料",
                        remainder.length, constraints.reuse_threshold
                    ),
                    severity: ViolationSeverity::Error,
                });
            }
        }

        // 高废料率提示 (不阻断)
        if plan.source_length > 0.0 {
            let waste_ratio = plan.waste / plan.source_length;
            if waste_ratio > 0.3 {
                violations.push(Violation {
                    rule_id: "P3".to_string(),
                    message: format!("方案废料率 {:.1}% 偏高", waste_ratio * 100.0),
                    severity: ViolationSeverity::Warning,
                });
            }
        }
    }
}

impl Default for ConstraintValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::Cut;
    use crate::domain::steel::Remainder;
    use crate::domain::types::SourceType;

    fn make_design(id: &str, length: f64) -> DesignSteel {
        DesignSteel {
            id: id.to_string(),
            length,
            quantity: 1,
            cross_section: 100.0,
            material: None,
            specification: None,
            component_number: None,
            part_number: None,
            note: None,
            display_id: None,
        }
    }

    fn make_plan(source_length: f64, cut_length: f64, remainder_length: Option<f64>) -> CuttingPlan {
        let remainders = remainder_length
            .map(|len| vec![Remainder::new_real(len, "job-t", 100.0, None)])
            .unwrap_or_default();
        let remainder_total: f64 = remainders.iter().map(|r| r.length).sum();
        CuttingPlan {
            source_type: SourceType::Module,
            source_id: "M-1".to_string(),
            module_type: None,
            source_length,
            cuts: vec![Cut {
                design_id: "d1".to_string(),
                length: cut_length,
                quantity: 1,
            }],
            waste: source_length - cut_length - remainder_total,
            new_remainders: remainders,
            pseudo_remainders: vec![],
        }
    }

    #[test]
    fn test_valid_constraints() {
        let validator = ConstraintValidator::new();
        let report = validator.validate(
            &OptimizationConstraints::default(),
            &ValidationContext::constraints_only(),
        );
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_invalid_min_weld_segment() {
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints {
            min_weld_segment: 0.0,
            ..Default::default()
        };

        let report = validator.validate(&constraints, &ValidationContext::constraints_only());
        assert!(!report.valid);
        assert_eq!(report.violations[0].rule_id, "W1");
        assert_eq!(report.violations[0].severity, ViolationSeverity::Error);
    }

    #[test]
    fn test_reuse_below_weld_is_warning_only() {
        // 复用阈值低于最小焊接段: 警告但不阻断
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints {
            min_weld_segment: 500.0,
            reuse_threshold: 300.0,
            ..Default::default()
        };

        let report = validator.validate(&constraints, &ValidationContext::constraints_only());
        assert!(report.valid);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].severity, ViolationSeverity::Warning);
    }

    #[test]
    fn test_welding_feasibility() {
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints {
            min_weld_segment: 500.0,
            ..Default::default()
        };
        let modules = vec![ModuleSteel {
            specification: None,
            length: 6000.0,
        }];

        // 13000 = 6000 + 6000 + 1000, 尾段 1000 >= 500 => 仅警告
        let feasible = vec![make_design("d1", 13000.0)];
        let report = validator.validate(
            &constraints,
            &ValidationContext::for_preflight(&feasible, &modules),
        );
        assert!(report.valid);
        assert!(report.violations.iter().any(|v| v.rule_id == "W4"));

        // 12100 = 6000 + 6000 + 100, 尾段 100 < 500 => ERROR
        let infeasible = vec![make_design("d2", 12100.0)];
        let report = validator.validate(
            &constraints,
            &ValidationContext::for_preflight(&infeasible, &modules),
        );
        assert!(!report.valid);
    }

    #[test]
    fn test_candidate_plan_short_remainder_rejected() {
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints {
            min_weld_segment: 500.0,
            reuse_threshold: 300.0,
            ..Default::default()
        };

        // 余料 400: 达到复用阈值但短于最小焊接段 => P1 ERROR
        let plan = make_plan(6000.0, 5600.0, Some(400.0));
        let report = validator.validate(&constraints, &ValidationContext::for_plan(&plan));
        assert!(!report.valid);
        assert!(report.violations.iter().any(|v| v.rule_id == "P1"));
    }

    #[test]
    fn test_candidate_plan_valid_remainder() {
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints::default();

        let plan = make_plan(6000.0, 4000.0, Some(2000.0));
        let report = validator.validate(&constraints, &ValidationContext::for_plan(&plan));
        assert!(report.valid);
    }

    #[test]
    fn test_determinism() {
        // 同一输入重复校验,违规集合必须一致
        let validator = ConstraintValidator::new();
        let constraints = OptimizationConstraints {
            min_weld_segment: -1.0,
            reuse_threshold: 0.0,
            target_loss_rate: Some(150.0),
            ..Default::default()
        };

        let first = validator.validate(&constraints, &ValidationContext::constraints_only());
        let second = validator.validate(&constraints, &ValidationContext::constraints_only());
        assert_eq!(first.violations.len(), second.violations.len());
        for (a, b) in first.violations.iter().zip(second.violations.iter()) {
            assert_eq!(a.rule_id, b.rule_id);
            assert_eq!(a.severity, b.severity);
        }
    }
}
