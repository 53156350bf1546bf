// ==========================================
// 钢材采购优化系统 - 钢材实体
// ==========================================
// 职责: 设计钢材(需求) / 模数钢材(采购原料) / 余料
// 分组规则: 截面面积(取整) + 材质, 不同分组禁止混切
// ==========================================

use crate::domain::types::RemainderKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ==========================================
// DesignSteel - 设计钢材 (需求件)
// ==========================================

/// 设计钢材
///
/// 不可变输入,对应上传契约的 8 个核心字段
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSteel {
    /// 唯一标识
    pub id: String,
    /// 需求长度 (mm), 必须 > 0
    pub length: f64,
    /// 需求数量 (件), 必须 > 0
    pub quantity: u32,
    /// 截面面积 (mm²)
    #[serde(default)]
    pub cross_section: f64,
    /// 材质
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// 规格
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    /// 构件编号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_number: Option<String>,
    /// 部件编号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    /// 备注
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// 显示ID (A1, A2, B1...), 由 generate_display_ids 生成
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
}

impl DesignSteel {
    /// 总需求长度 (length × quantity)
    pub fn total_length(&self) -> f64 {
        self.length * self.quantity as f64
    }

    /// 兼容分组键
    ///
    /// 截面面积四舍五入到整数 mm²,材质缺省归入 DEFAULT
    pub fn group_key(&self) -> String {
        group_key_of(self.cross_section, self.material.as_deref())
    }
}

/// 计算兼容分组键
///
/// # 参数
/// - cross_section: 截面面积 (mm²)
/// - material: 材质 (可空)
pub fn group_key_of(cross_section: f64, material: Option<&str>) -> String {
    let cs = cross_section.round() as i64;
    let mat = material
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("DEFAULT");
    format!("CS{}-{}", cs, mat)
}

// ==========================================
// ModuleSteel - 模数钢材 (采购原料)
// ==========================================

/// 模数钢材
///
/// 一种可采购的定尺钢材; 求解时视为供给无限
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSteel {
    /// 规格 (如 "HRB400 12m")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification: Option<String>,
    /// 单根长度 (mm), 必须 > 0
    pub length: f64,
}

impl ModuleSteel {
    /// 报表展示用的规格名
    pub fn display_name(&self) -> String {
        match &self.specification {
            Some(spec) if !spec.trim().is_empty() => spec.clone(),
            _ => format!("模数钢材{}mm", self.length.round() as i64),
        }
    }
}

// ==========================================
// Remainder - 余料
// ==========================================

/// 余料
///
/// 之前某次切割留下的剩余段
/// 红线: 只有 REAL 余料可以作为切割原料
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remainder {
    /// 唯一标识
    pub id: String,
    /// 长度 (mm), 必须 > 0
    pub length: f64,
    /// 余料种类 (REAL / PSEUDO)
    pub kind: RemainderKind,
    /// 产生该余料的作业ID (可追溯)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_job_id: Option<String>,
    /// 截面面积 (mm²)
    #[serde(default)]
    pub cross_section: f64,
    /// 材质
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

impl Remainder {
    /// 创建一条真实余料
    ///
    /// # 参数
    /// - length: 余料长度 (mm)
    /// - origin_job_id: 产生该余料的作业ID
    /// - cross_section: 截面面积
    /// - material: 材质
    pub fn new_real(
        length: f64,
        origin_job_id: &str,
        cross_section: f64,
        material: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            length,
            kind: RemainderKind::Real,
            origin_job_id: Some(origin_job_id.to_string()),
            cross_section,
            material,
        }
    }

    /// 创建一条假设余料 (仅用于报表)
    pub fn new_pseudo(
        length: f64,
        origin_job_id: &str,
        cross_section: f64,
        material: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            length,
            kind: RemainderKind::Pseudo,
            origin_job_id: Some(origin_job_id.to_string()),
            cross_section,
            material,
        }
    }

    /// 兼容分组键
    pub fn group_key(&self) -> String {
        group_key_of(self.cross_section, self.material.as_deref())
    }
}

// ==========================================
// 显示ID生成
// ==========================================

/// 生成显示ID (A1, A2, B1, B2...)
///
/// 按截面面积(取整)分组,分组按面积升序编字母 A/B/C...,
/// 组内按长度升序编号 1/2/3...
///
/// # 参数
/// - steels: 设计钢材列表
///
/// # 返回
/// 带 display_id 的设计钢材列表 (分组排序后的顺序)
pub fn generate_display_ids(steels: Vec<DesignSteel>) -> Vec<DesignSteel> {
    // 1. 按截面面积(取整)分组; BTreeMap 保证面积升序
    let mut groups: BTreeMap<i64, Vec<DesignSteel>> = BTreeMap::new();
    for steel in steels {
        groups
            .entry(steel.cross_section.round() as i64)
            .or_default()
            .push(steel);
    }

    // 2. 分组编字母,组内按长度升序编号
    let mut result = Vec::new();
    for (group_index, (_cross_section, mut group)) in groups.into_iter().enumerate() {
        let letter = (b'A' + (group_index % 26) as u8) as char;
        group.sort_by(|a, b| a.length.total_cmp(&b.length));

        for (item_index, mut steel) in group.into_iter().enumerate() {
            steel.display_id = Some(format!("{}{}", letter, item_index + 1));
            result.push(steel);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_design(id: &str, length: f64, cross_section: f64) -> DesignSteel {
        DesignSteel {
            id: id.to_string(),
            length,
            quantity: 1,
            cross_section,
            material: None,
            specification: None,
            component_number: None,
            part_number: None,
            note: None,
            display_id: None,
        }
    }

    #[test]
    fn test_group_key() {
        // 截面面积四舍五入后一致 => 同组
        let a = make_design("d1", 1000.0, 100.2);
        let b = make_design("d2", 2000.0, 99.8);
        assert_eq!(a.group_key(), b.group_key());

        // 材质不同 => 不同组
        let mut c = make_design("d3", 1000.0, 100.0);
        c.material = Some("Q345".to_string());
        assert_ne!(a.group_key(), c.group_key());
    }

    #[test]
    fn test_generate_display_ids() {
        // 两个截面分组: 100 => A, 200 => B; 组内按长度升序
        let steels = vec![
            make_design("d1", 3000.0, 100.0),
            make_design("d2", 1000.0, 100.0),
            make_design("d3", 2000.0, 200.0),
        ];

        let with_ids = generate_display_ids(steels);
        assert_eq!(with_ids.len(), 3);
        assert_eq!(with_ids[0].id, "d2");
        assert_eq!(with_ids[0].display_id.as_deref(), Some("A1"));
        assert_eq!(with_ids[1].id, "d1");
        assert_eq!(with_ids[1].display_id.as_deref(), Some("A2"));
        assert_eq!(with_ids[2].id, "d3");
        assert_eq!(with_ids[2].display_id.as_deref(), Some("B1"));
    }

    #[test]
    fn test_remainder_traceability() {
        let r = Remainder::new_real(500.0, "job-001", 100.0, None);
        assert_eq!(r.kind, RemainderKind::Real);
        assert_eq!(r.origin_job_id.as_deref(), Some("job-001"));
        assert!(!r.id.is_empty());
    }
}
