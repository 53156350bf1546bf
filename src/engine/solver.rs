// ==========================================
// 钢材采购优化系统 - 一维下料求解引擎
// ==========================================
// 算法: 最佳适应递减 (BFD) + 余料优先复用 + 有界局部回溯
// 红线: 禁止消耗 PSEUDO 余料; 禁止跨兼容分组混切
// 红线: 每条切割方案必须满足长度守恒, 破坏即致命缺陷
// ==========================================
// 输入: 设计钢材 + 模数钢材 + 可用余料 + 约束条件
// 输出: 按分组的切割方案; 无法落位的需求件逐条记录
// 取消: 协作式, 每批落位检查一次取消信号并上报进度
// ==========================================

use crate::config::SolverConfig;
use crate::domain::constraints::{OptimizationConstraints, LENGTH_EPSILON};
use crate::domain::plan::{Cut, CuttingPlan, Solution, UnsatisfiedDemand};
use crate::domain::steel::{DesignSteel, ModuleSteel, Remainder};
use crate::domain::types::SourceType;
use crate::engine::error::OptimizerError;
use crate::engine::validator::{ConstraintValidator, ValidationContext};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ==========================================
// 内部结构
// ==========================================

/// 需求单元 (设计件按数量展开后的单件)
#[derive(Debug, Clone)]
struct DemandUnit {
    design_id: String,
    length: f64,
}

/// 未关账的切割方案 (仍可继续落位)
#[derive(Debug, Clone)]
struct OpenPlan {
    source_type: SourceType,
    source_id: String,
    module_type: Option<String>,
    source_length: f64,
    remaining: f64,
    cuts: Vec<(String, f64)>, // (design_id, length)
}

/// 候选原料选择
#[derive(Debug, Clone)]
enum SourceChoice {
    /// 已开切的原料 (索引指向 open_plans)
    Open(usize),
    /// 未动用的真实余料 (索引指向组内余料池)
    FreshRemainder(usize),
    /// 新开一根模数钢材 (索引指向模数规格表)
    FreshModule(usize),
}

// ==========================================
// CuttingStockSolver - 下料求解引擎
// ==========================================
pub struct CuttingStockSolver {
    validator: ConstraintValidator,
    config: SolverConfig,
}

impl CuttingStockSolver {
    /// 创建求解器 (默认配置)
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// 创建求解器
    ///
    /// # 参数
    /// - config: 求解器配置 (进度检查间隔等)
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            validator: ConstraintValidator::new(),
            config,
        }
    }

    // ==========================================
    // 输入校验
    // ==========================================

    /// 校验求解输入 (快速失败)
    ///
    /// # 校验规则
    /// 1. 设计钢材列表非空, 长度/数量必须为正
    /// 2. 模数钢材列表非空, 长度必须为正
    /// 3. 余料长度必须为正
    ///
    /// # 返回
    /// - Ok(()): 输入合法
    /// - Err(InputError): 带具体原因
    pub fn validate_input(
        design_steels: &[DesignSteel],
        module_steels: &[ModuleSteel],
        remainders: &[Remainder],
    ) -> Result<(), OptimizerError> {
        if design_steels.is_empty() {
            return Err(OptimizerError::InputError(
                "设计钢材列表为空".to_string(),
            ));
        }

        for design in design_steels {
            if !design.length.is_finite() || design.length <= 0.0 {
                return Err(OptimizerError::InputError(format!(
                    "设计件 {} 的长度 {} 必须为正有限值",
                    design.id, design.length
                )));
            }
            if design.quantity == 0 {
                return Err(OptimizerError::InputError(format!(
                    "设计件 {} 的数量必须大于 0",
                    design.id
                )));
            }
        }

        if module_steels.is_empty() {
            return Err(OptimizerError::InputError(
                "模数钢材列表为空".to_string(),
            ));
        }

        for module in module_steels {
            if !module.length.is_finite() || module.length <= 0.0 {
                return Err(OptimizerError::InputError(format!(
                    "模数钢材 {} 的长度 {} 必须为正有限值",
                    module.display_name(),
                    module.length
                )));
            }
        }

        for remainder in remainders {
            if !remainder.length.is_finite() || remainder.length <= 0.0 {
                return Err(OptimizerError::InputError(format!(
                    "余料 {} 的长度 {} 必须为正有限值",
                    remainder.id, remainder.length
                )));
            }
        }

        Ok(())
    }

    // ==========================================
    // 核心求解
    // ==========================================

    /// 执行求解
    ///
    /// # 参数
    /// - design_steels: 设计钢材 (需求)
    /// - module_steels: 模数钢材规格 (供给无限)
    /// - available_remainders: 历史余料 (仅 REAL 参与)
    /// - constraints: 工艺约束
    /// - job_id: 作业ID (新余料溯源)
    /// - progress: 进度回调, 取值单调不减且落在 [0,1]
    /// - cancel: 协作式取消令牌
    ///
    /// # 返回
    /// 按分组键索引的解; 取消返回 Err(Cancelled)
    #[allow(clippy::too_many_arguments)]
    pub fn solve(
        &self,
        design_steels: &[DesignSteel],
        module_steels: &[ModuleSteel],
        available_remainders: &[Remainder],
        constraints: &OptimizationConstraints,
        job_id: &str,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, Solution>, OptimizerError> {
        // 1. 快速失败校验
        Self::validate_input(design_steels, module_steels, available_remainders)?;

        let report = self.validator.validate(constraints, &ValidationContext::constraints_only());
        if !report.valid {
            let reasons: Vec<String> =
                report.violations.iter().map(|v| v.message.clone()).collect();
            return Err(OptimizerError::InputError(format!(
                "约束条件不合法: {}",
                reasons.join("; ")
            )));
        }

        // 2. 按兼容分组拆分需求
        let mut groups: HashMap<String, Vec<&DesignSteel>> = HashMap::new();
        for design in design_steels {
            groups.entry(design.group_key()).or_default().push(design);
        }

        let total_units: u64 = design_steels.iter().map(|d| d.quantity as u64).sum();

        info!(
            job_id = %job_id,
            groups = groups.len(),
            total_units = total_units,
            modules = module_steels.len(),
            remainders = available_remainders.len(),
            "开始下料求解"
        );

        // 3. 逐组求解 (分组键排序保证确定性)
        let mut group_keys: Vec<String> = groups.keys().cloned().collect();
        group_keys.sort();

        let mut solutions = HashMap::new();
        let mut placed_units: u64 = 0;

        for group_key in group_keys {
            let designs = &groups[&group_key];

            // 仅 REAL 余料且分组匹配的才进入原料池 (红线)
            let group_remainders: Vec<&Remainder> = available_remainders
                .iter()
                .filter(|r| r.kind.is_usable() && r.group_key() == group_key)
                .collect();

            let solution = self.solve_group(
                &group_key,
                designs,
                module_steels,
                &group_remainders,
                constraints,
                job_id,
                total_units,
                &mut placed_units,
                progress,
                cancel,
            )?;

            solutions.insert(group_key, solution);
        }

        progress(1.0);

        info!(job_id = %job_id, "下料求解完成");

        Ok(solutions)
    }

    /// 单个兼容分组的求解
    ///
    /// 流程:
    /// 1. 需求按长度降序展开为单件
    /// 2. 逐件选择原料: 已开切原料 > 未动用余料 > 新开模数钢材,
    ///    同类中取剩余最小且放得下的 (最佳适应)
    /// 3. 校验器否决的落位就地回溯, 尝试次优原料
    /// 4. 关账时按复用阈值分类剩余段
    #[allow(clippy::too_many_arguments)]
    fn solve_group(
        &self,
        group_key: &str,
        designs: &[&DesignSteel],
        module_steels: &[ModuleSteel],
        group_remainders: &[&Remainder],
        constraints: &OptimizationConstraints,
        job_id: &str,
        total_units: u64,
        placed_units: &mut u64,
        progress: &(dyn Fn(f64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> Result<Solution, OptimizerError> {
        // 组的截面/材质取自组内首件 (同组必然一致)
        let cross_section = designs[0].cross_section;
        let material = designs[0].material.clone();

        // 1. 展开需求单元, 长度降序 (长件优先减少碎片)
        let mut units: Vec<DemandUnit> = Vec::new();
        for design in designs {
            for _ in 0..design.quantity {
                units.push(DemandUnit {
                    design_id: design.id.clone(),
                    length: design.length,
                });
            }
        }
        units.sort_by(|a, b| b.length.total_cmp(&a.length));

        // 2. 原料池
        let mut open_plans: Vec<OpenPlan> = Vec::new();
        let mut remainder_used = vec![false; group_remainders.len()];
        let mut module_serial: u64 = 0;
        let mut unsatisfied: Vec<UnsatisfiedDemand> = Vec::new();
        let mut backtracks: u64 = 0;

        debug!(
            group_key = %group_key,
            units = units.len(),
            remainders = group_remainders.len(),
            "开始分组求解"
        );

        // 3. 逐件落位
        for unit in &units {
            let choices = self.rank_sources(
                &open_plans,
                group_remainders,
                &remainder_used,
                module_steels,
                unit.length,
            );

            let mut placed = false;
            for choice in choices {
                // 试探落位
                let (plan_index, was_fresh_remainder) = match choice {
                    SourceChoice::Open(i) => (i, None),
                    SourceChoice::FreshRemainder(i) => {
                        let r = group_remainders[i];
                        open_plans.push(OpenPlan {
                            source_type: SourceType::Remainder,
                            source_id: r.id.clone(),
                            module_type: None,
                            source_length: r.length,
                            remaining: r.length,
                            cuts: Vec::new(),
                        });
                        (open_plans.len() - 1, Some(i))
                    }
                    SourceChoice::FreshModule(i) => {
                        let m = &module_steels[i];
                        module_serial += 1;
                        open_plans.push(OpenPlan {
                            source_type: SourceType::Module,
                            source_id: format!("{}-M{}", group_key, module_serial),
                            module_type: Some(m.display_name()),
                            source_length: m.length,
                            remaining: m.length,
                            cuts: Vec::new(),
                        });
                        (open_plans.len() - 1, None)
                    }
                };

                open_plans[plan_index]
                    .cuts
                    .push((unit.design_id.clone(), unit.length));
                open_plans[plan_index].remaining -= unit.length;

                // 以"立即关账"视角校验候选方案
                let candidate = self.close_plan(
                    &open_plans[plan_index],
                    constraints,
                    job_id,
                    cross_section,
                    material.clone(),
                );
                let report = self
                    .validator
                    .validate(constraints, &ValidationContext::for_plan(&candidate));

                if report.valid {
                    placed = true;
                    break;
                }

                // 回溯: 撤销本次落位, 尝试次优原料
                backtracks += 1;
                open_plans[plan_index].remaining += unit.length;
                open_plans[plan_index].cuts.pop();
                if open_plans[plan_index].cuts.is_empty() {
                    // 本次新开的原料未被使用, 整体撤销
                    open_plans.remove(plan_index);
                    if was_fresh_remainder.is_none() {
                        module_serial -= 1;
                    }
                } else if let Some(i) = was_fresh_remainder {
                    // 不可能: 新开余料上已有其他切割
                    debug_assert!(remainder_used[i]);
                }
            }

            if placed {
                // 新开余料标记占用
                for (i, r) in group_remainders.iter().enumerate() {
                    if !remainder_used[i]
                        && open_plans.iter().any(|p| {
                            p.source_type == SourceType::Remainder && p.source_id == r.id
                        })
                    {
                        remainder_used[i] = true;
                    }
                }
            } else {
                // 无任何合法落位: 记录为无法满足, 继续求解 (不中断整组)
                warn!(
                    group_key = %group_key,
                    design_id = %unit.design_id,
                    length = unit.length,
                    "需求件无法落位"
                );
                push_unsatisfied(&mut unsatisfied, unit, module_steels);
            }

            // 进度与取消检查点 (协作式, 延迟有界)
            *placed_units += 1;
            if *placed_units % self.config.progress_check_interval == 0 {
                progress(*placed_units as f64 / total_units as f64);
                if cancel.is_cancelled() {
                    info!(job_id = %job_id, group_key = %group_key, "求解被取消");
                    return Err(OptimizerError::Cancelled);
                }
            }
        }

        // 4. 关账并校验长度守恒
        let mut cutting_plans = Vec::new();
        for open in &open_plans {
            let plan = self.close_plan(open, constraints, job_id, cross_section, material.clone());

            if let Err(diff) = plan.check_conservation() {
                // 长度守恒破坏是内部缺陷, 携带完整方案上下文中止
                return Err(OptimizerError::InvariantViolation {
                    job_id: job_id.to_string(),
                    group_key: group_key.to_string(),
                    detail: format!(
                        "长度守恒破坏 diff={:.6}mm, plan={}",
                        diff,
                        serde_json::to_string(&plan).unwrap_or_else(|_| "<序列化失败>".to_string())
                    ),
                });
            }

            cutting_plans.push(plan);
        }

        debug!(
            group_key = %group_key,
            plans = cutting_plans.len(),
            unsatisfied = unsatisfied.len(),
            backtracks = backtracks,
            "分组求解完成"
        );

        Ok(Solution {
            group_key: group_key.to_string(),
            cutting_plans,
            unsatisfied,
        })
    }

    /// 候选原料排序
    ///
    /// 优先级: 已开切原料 > 未动用余料 > 新开模数钢材;
    /// 同类内按剩余长度升序 (最佳适应, 为后续长件保留大段)
    fn rank_sources(
        &self,
        open_plans: &[OpenPlan],
        group_remainders: &[&Remainder],
        remainder_used: &[bool],
        module_steels: &[ModuleSteel],
        length: f64,
    ) -> Vec<SourceChoice> {
        let mut choices = Vec::new();

        // 1. 已开切原料 (余料来源排在模数之前)
        let mut open: Vec<(usize, f64, bool)> = open_plans
            .iter()
            .enumerate()
            .filter(|(_, p)| p.remaining + LENGTH_EPSILON >= length)
            .map(|(i, p)| (i, p.remaining, p.source_type == SourceType::Remainder))
            .collect();
        open.sort_by(|a, b| {
            b.2.cmp(&a.2).then(a.1.total_cmp(&b.1))
        });
        choices.extend(open.into_iter().map(|(i, _, _)| SourceChoice::Open(i)));

        // 2. 未动用余料, 长度升序
        let mut fresh: Vec<(usize, f64)> = group_remainders
            .iter()
            .enumerate()
            .filter(|(i, r)| !remainder_used[*i] && r.length + LENGTH_EPSILON >= length)
            .map(|(i, r)| (i, r.length))
            .collect();
        fresh.sort_by(|a, b| a.1.total_cmp(&b.1));
        choices.extend(fresh.into_iter().map(|(i, _)| SourceChoice::FreshRemainder(i)));

        // 3. 新开模数钢材, 长度升序
        let mut modules: Vec<(usize, f64)> = module_steels
            .iter()
            .enumerate()
            .filter(|(_, m)| m.length + LENGTH_EPSILON >= length)
            .map(|(i, m)| (i, m.length))
            .collect();
        modules.sort_by(|a, b| a.1.total_cmp(&b.1));
        choices.extend(modules.into_iter().map(|(i, _)| SourceChoice::FreshModule(i)));

        choices
    }

    /// 关账: 将未关账方案定稿为切割方案
    ///
    /// 剩余段分类 (依据约束 §余料复用阈值):
    /// - 低于复用阈值 => 废料 (开启假设余料跟踪时额外记录 PSEUDO)
    /// - 不低于复用阈值 => 新真实余料, 记录 origin_job_id
    fn close_plan(
        &self,
        open: &OpenPlan,
        constraints: &OptimizationConstraints,
        job_id: &str,
        cross_section: f64,
        material: Option<String>,
    ) -> CuttingPlan {
        // 合并同设计件同长度的切割
        let mut merged: Vec<Cut> = Vec::new();
        for (design_id, length) in &open.cuts {
            if let Some(cut) = merged
                .iter_mut()
                .find(|c| &c.design_id == design_id && OptimizationConstraints::lengths_equal(c.length, *length))
            {
                cut.quantity += 1;
            } else {
                merged.push(Cut {
                    design_id: design_id.clone(),
                    length: *length,
                    quantity: 1,
                });
            }
        }

        let leftover = open.remaining.max(0.0);
        let mut waste = 0.0;
        let mut new_remainders = Vec::new();
        let mut pseudo_remainders = Vec::new();

        if leftover > LENGTH_EPSILON {
            if leftover + LENGTH_EPSILON >= constraints.reuse_threshold {
                new_remainders.push(Remainder::new_real(
                    leftover,
                    job_id,
                    cross_section,
                    material.clone(),
                ));
            } else {
                waste = leftover;
                if constraints.track_pseudo_remainders {
                    pseudo_remainders.push(Remainder::new_pseudo(
                        leftover,
                        job_id,
                        cross_section,
                        material.clone(),
                    ));
                }
            }
        }

        CuttingPlan {
            source_type: open.source_type,
            source_id: open.source_id.clone(),
            module_type: open.module_type.clone(),
            source_length: open.source_length,
            cuts: merged,
            waste,
            new_remainders,
            pseudo_remainders,
        }
    }
}

/// 记录无法满足的需求件 (同设计件合并计数)
fn push_unsatisfied(
    unsatisfied: &mut Vec<UnsatisfiedDemand>,
    unit: &DemandUnit,
    module_steels: &[ModuleSteel],
) {
    if let Some(entry) = unsatisfied.iter_mut().find(|u| u.design_id == unit.design_id) {
        entry.quantity += 1;
        return;
    }

    let max_module = module_steels.iter().map(|m| m.length).fold(0.0_f64, f64::max);
    let reason = if unit.length > max_module + LENGTH_EPSILON {
        format!(
            "需求长度 {} 超过最长模数钢材 {}, 且无足够余料",
            unit.length, max_module
        )
    } else {
        "所有候选原料均被约束校验否决".to_string()
    };

    unsatisfied.push(UnsatisfiedDemand {
        design_id: unit.design_id.clone(),
        length: unit.length,
        quantity: 1,
        reason,
    });
}

impl Default for CuttingStockSolver {
    fn default() -> Self {
        Self::new()
    }
}
