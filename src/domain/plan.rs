// ==========================================
// 钢材采购优化系统 - 切割方案
// ==========================================
// 职责: 单根原料的切割方案与分组解
// 红线: 长度守恒 Σ(切割长度×数量) + 废料 + Σ(新余料长度) == 原料长度
// 说明: 假设余料(PSEUDO)单独存放,其长度已计入废料,不参与守恒式
// ==========================================

use crate::domain::constraints::LENGTH_EPSILON;
use crate::domain::steel::Remainder;
use crate::domain::types::SourceType;
use serde::{Deserialize, Serialize};

// ==========================================
// Cut - 单项切割
// ==========================================

/// 单项切割 (同一设计件在同一原料上的合并记录)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cut {
    /// 设计钢材ID
    pub design_id: String,
    /// 单件长度 (mm)
    pub length: f64,
    /// 件数
    pub quantity: u32,
}

impl Cut {
    /// 该项切割消耗的总长度
    pub fn total_length(&self) -> f64 {
        self.length * self.quantity as f64
    }
}

// ==========================================
// CuttingPlan - 切割方案 (单根原料)
// ==========================================

/// 切割方案
///
/// 每消耗一根原料(模数钢材或余料)产生一条
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuttingPlan {
    /// 原料来源类型
    pub source_type: SourceType,
    /// 原料标识 (余料ID或模数钢材流水号)
    pub source_id: String,
    /// 模数钢材规格名 (余料来源时为空)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
    /// 原料长度 (mm)
    pub source_length: f64,
    /// 切割明细
    pub cuts: Vec<Cut>,
    /// 废料长度 (mm), >= 0
    pub waste: f64,
    /// 新产生的真实余料
    pub new_remainders: Vec<Remainder>,
    /// 假设余料 (仅报表, 长度已计入 waste)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pseudo_remainders: Vec<Remainder>,
}

impl CuttingPlan {
    /// 切割消耗的总长度
    pub fn used_length(&self) -> f64 {
        self.cuts.iter().map(Cut::total_length).sum()
    }

    /// 新余料总长度 (仅真实余料)
    pub fn new_remainder_length(&self) -> f64 {
        self.new_remainders.iter().map(|r| r.length).sum()
    }

    /// 校验长度守恒
    ///
    /// # 返回
    /// - Ok(()): 守恒成立 (容差内)
    /// - Err(diff): 守恒破坏, diff 为偏差量 (mm)
    pub fn check_conservation(&self) -> Result<(), f64> {
        let accounted = self.used_length() + self.waste + self.new_remainder_length();
        let diff = accounted - self.source_length;
        if diff.abs() <= LENGTH_EPSILON {
            Ok(())
        } else {
            Err(diff)
        }
    }
}

// ==========================================
// UnsatisfiedDemand - 无法满足的需求件
// ==========================================

/// 无法满足的需求件
///
/// 求解过程中任何无法落位的需求单元都必须记录,不得静默丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsatisfiedDemand {
    /// 设计钢材ID
    pub design_id: String,
    /// 单件长度 (mm)
    pub length: f64,
    /// 无法满足的件数
    pub quantity: u32,
    /// 原因说明
    pub reason: String,
}

// ==========================================
// Solution - 分组解
// ==========================================

/// 分组解
///
/// 每个兼容分组(截面×材质)一条
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    /// 分组键
    pub group_key: String,
    /// 该组的切割方案列表
    pub cutting_plans: Vec<CuttingPlan>,
    /// 该组无法满足的需求件
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsatisfied: Vec<UnsatisfiedDemand>,
}

impl Solution {
    /// 该组消耗的模数钢材根数
    pub fn module_count(&self) -> usize {
        self.cutting_plans
            .iter()
            .filter(|p| p.source_type == SourceType::Module)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::steel::Remainder;

    #[test]
    fn test_conservation_holds() {
        // 6000 = 4000 + 1500(余料) + 500(废料)
        let plan = CuttingPlan {
            source_type: SourceType::Module,
            source_id: "M-1".to_string(),
            module_type: Some("模数钢材6000mm".to_string()),
            source_length: 6000.0,
            cuts: vec![Cut {
                design_id: "d1".to_string(),
                length: 4000.0,
                quantity: 1,
            }],
            waste: 500.0,
            new_remainders: vec![Remainder::new_real(1500.0, "job-1", 100.0, None)],
            pseudo_remainders: vec![],
        };

        assert!(plan.check_conservation().is_ok());
    }

    #[test]
    fn test_conservation_broken() {
        let plan = CuttingPlan {
            source_type: SourceType::Module,
            source_id: "M-1".to_string(),
            module_type: None,
            source_length: 6000.0,
            cuts: vec![Cut {
                design_id: "d1".to_string(),
                length: 4000.0,
                quantity: 1,
            }],
            waste: 100.0, // 缺 1900
            new_remainders: vec![],
            pseudo_remainders: vec![],
        };

        let diff = plan.check_conservation().unwrap_err();
        assert!((diff + 1900.0).abs() < 1e-6);
    }

    #[test]
    fn test_pseudo_remainder_not_in_conservation() {
        // 假设余料长度已计入废料,不重复计账
        let plan = CuttingPlan {
            source_type: SourceType::Module,
            source_id: "M-1".to_string(),
            module_type: None,
            source_length: 6000.0,
            cuts: vec![Cut {
                design_id: "d1".to_string(),
                length: 5800.0,
                quantity: 1,
            }],
            waste: 200.0,
            new_remainders: vec![],
            pseudo_remainders: vec![Remainder::new_pseudo(200.0, "job-1", 100.0, None)],
        };

        assert!(plan.check_conservation().is_ok());
    }
}
