// ==========================================
// 钢材采购优化系统 - 结果汇总引擎
// ==========================================
// 职责: 将各分组解汇总为对外结果契约
// 红线: 损耗率分母为模数钢材采购总量; 分母为零时损耗率为 0
// ==========================================
// 输入: 按分组的解 + 执行耗时
// 输出: OptimizationResult (采购清单/总账/损耗率)
// ==========================================

use crate::domain::plan::Solution;
use crate::domain::types::SourceType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// 对外优化结果 (固定输出契约, 字段增删改均为破坏性变更)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    /// 求解是否完成 (存在无法满足的需求件时仍为 true)
    pub success: bool,
    /// 按分组键索引的解
    pub solutions: HashMap<String, Solution>,
    /// 采购的模数钢材总根数
    pub total_module_used: u64,
    /// 按模数规格的用量明细
    pub module_usage: HashMap<String, u64>,
    /// 消耗的模数钢材总长度 (mm, 不含余料来源)
    pub total_material: f64,
    /// 总废料长度 (mm)
    pub total_waste: f64,
    /// 新产生的真实余料总长度 (mm)
    pub total_real_remainder: f64,
    /// 新产生的假设余料总长度 (mm)
    pub total_pseudo_remainder: f64,
    /// 损耗率 (%) = 废料 / 模数材料 × 100
    pub total_loss_rate: f64,
    /// 求解耗时 (毫秒)
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    /// 无法满足的需求件总数
    pub unsatisfied_total: u64,
    /// 失败说明 (正常完成时为空)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ==========================================
// ResultAggregator - 结果汇总引擎
// ==========================================
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总各分组解
    ///
    /// # 汇总规则
    /// 1. 采购清单: 仅统计 MODULE 来源的方案, 总根数 + 按规格明细
    /// 2. 材料总量: 仅 MODULE 来源的原长求和 (余料是历史库存, 不计入采购)
    /// 3. 损耗率: 废料 / 材料总量 × 100; 材料为零时取 0
    /// 4. success 恒为 true (存在无法满足的需求件不算失败)
    pub fn aggregate(
        &self,
        solutions: HashMap<String, Solution>,
        execution_time_ms: u64,
    ) -> OptimizationResult {
        let mut module_usage: HashMap<String, u64> = HashMap::new();
        let mut total_module_used: u64 = 0;
        let mut total_material = 0.0;
        let mut total_waste = 0.0;
        let mut total_real_remainder = 0.0;
        let mut total_pseudo_remainder = 0.0;
        let mut unsatisfied_total: u64 = 0;

        for solution in solutions.values() {
            for plan in &solution.cutting_plans {
                if plan.source_type == SourceType::Module {
                    total_material += plan.source_length;
                    let name = plan
                        .module_type
                        .clone()
                        .unwrap_or_else(|| format!("模数钢材{}mm", plan.source_length));
                    *module_usage.entry(name).or_insert(0) += 1;
                    total_module_used += 1;
                }
                total_waste += plan.waste;
                total_real_remainder += plan.new_remainder_length();
                total_pseudo_remainder +=
                    plan.pseudo_remainders.iter().map(|r| r.length).sum::<f64>();
            }
            unsatisfied_total += solution
                .unsatisfied
                .iter()
                .map(|u| u.quantity as u64)
                .sum::<u64>();
        }

        let total_loss_rate = if total_material > 0.0 {
            total_waste / total_material * 100.0
        } else {
            0.0
        };

        info!(
            groups = solutions.len(),
            total_material = total_material,
            total_waste = total_waste,
            loss_rate = total_loss_rate,
            unsatisfied = unsatisfied_total,
            "结果汇总完成"
        );

        OptimizationResult {
            success: true,
            solutions,
            total_module_used,
            module_usage,
            total_material,
            total_waste,
            total_real_remainder,
            total_pseudo_remainder,
            total_loss_rate,
            execution_time_ms,
            unsatisfied_total,
            error: None,
        }
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}
