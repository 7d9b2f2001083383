// ==========================================
// 质检点检表管理系统 - 报表透视引擎
// ==========================================
// 职责: 点检记录 × 参数目录 → 行=记录、列=参数 的透视矩阵
// 输入: Checklist + InspectionRecord(含测量) + CatalogParameter
// 输出: PivotMatrix（表头分组 + 数据行），供 CSV / XLSX 导出使用
// ==========================================
// 红线: 不读写数据库，只做纯计算
// 红线: 列顺序 = 分组首次出现顺序，组内按目录顺序
// ==========================================

use crate::domain::checklist::Checklist;
use crate::domain::inspection::InspectionRecord;
use crate::domain::parameter::CatalogParameter;
use crate::domain::types::{CellHint, MeasurementKind};
use crate::i18n;
use serde::Serialize;
use tracing::instrument;

/// 固定列: 班次 / 时间 / 批号
pub const FIXED_COLUMN_COUNT: usize = 3;

// ==========================================
// 透视矩阵结构
// ==========================================

/// 参数列（子表头）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterColumn {
    pub parameter_key: String, // "param_" + 目录ID
    pub name: String,
    pub unit: String,
    pub kind: MeasurementKind,
    pub range_note: Option<String>, // "min: x | Max: y"
}

impl ParameterColumn {
    /// 单位表头: "(unit)"
    pub fn unit_label(&self) -> String {
        format!("({})", self.unit)
    }
}

/// 列分组（按数据类型分组，跨多列）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnGroup {
    pub name: String,
    pub columns: Vec<ParameterColumn>,
}

/// 数据单元格
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotCell {
    pub value: String,
    pub hint: CellHint,
}

/// 数据行（一条点检记录）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub record_id: i64,
    pub shift: String,
    pub time: String,
    pub note: String,
    /// 与扁平化后的参数列一一对应；未匹配到测量为 None
    pub cells: Vec<Option<PivotCell>>,
}

/// 透视矩阵
#[derive(Debug, Clone, Serialize)]
pub struct PivotMatrix {
    pub checklist: Checklist,
    pub locale: String,
    pub groups: Vec<ColumnGroup>,
    pub rows: Vec<PivotRow>,
}

impl PivotMatrix {
    /// 参数列数
    pub fn parameter_count(&self) -> usize {
        self.groups.iter().map(|g| g.columns.len()).sum()
    }

    /// 总列数（固定列 + 参数列）
    pub fn column_count(&self) -> usize {
        FIXED_COLUMN_COUNT + self.parameter_count()
    }

    /// 扁平化的参数列
    pub fn columns(&self) -> impl Iterator<Item = &ParameterColumn> {
        self.groups.iter().flat_map(|g| g.columns.iter())
    }
}

// ==========================================
// ReportPivotBuilder - 透视矩阵构建器
// ==========================================
pub struct ReportPivotBuilder {
    locale: String,
}

impl ReportPivotBuilder {
    /// # 参数
    /// - locale: 表头标签语言（未分组标签、上下限标注）
    pub fn new(locale: &str) -> Self {
        Self {
            locale: i18n::normalize_locale(locale).to_string(),
        }
    }

    /// 构建透视矩阵
    ///
    /// # 参数
    /// - checklist: 点检表表头
    /// - records: 点检记录（调用方已按创建时间、ID 排序）
    /// - catalogue: 该 FG 的参数目录
    #[instrument(skip_all, fields(
        inspect_code = %checklist.inspect_code,
        records = records.len(),
        parameters = catalogue.len()
    ))]
    pub fn build(
        &self,
        checklist: Checklist,
        records: &[InspectionRecord],
        catalogue: &[CatalogParameter],
    ) -> PivotMatrix {
        let groups = self.build_groups(catalogue);

        let keys: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.columns.iter().map(|c| c.parameter_key.as_str()))
            .collect();

        let rows = records
            .iter()
            .map(|record| PivotRow {
                record_id: record.record_id,
                shift: record.shift.to_string(),
                time: record.time_label(),
                note: record.note.clone().unwrap_or_default(),
                cells: keys
                    .iter()
                    .map(|key| {
                        record.find_measurement(key).map(|m| PivotCell {
                            value: m.value.clone().unwrap_or_default(),
                            hint: CellHint::from_flags(m.is_pass, m.is_fail),
                        })
                    })
                    .collect(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            groups = groups.len(),
            columns = keys.len(),
            rows = rows.len(),
            "透视矩阵构建完成"
        );

        PivotMatrix {
            checklist,
            locale: self.locale.clone(),
            groups,
            rows,
        }
    }

    /// 按数据类型分组，分组顺序为首次出现顺序
    fn build_groups(&self, catalogue: &[CatalogParameter]) -> Vec<ColumnGroup> {
        let mut visible: Vec<&CatalogParameter> = catalogue.iter().filter(|p| !p.hidden).collect();
        // 稳定排序，同序号保持目录原顺序
        visible.sort_by_key(|p| p.sort_order);

        let others = i18n::t_for(&self.locale, "report.ungrouped");
        let mut groups: Vec<ColumnGroup> = Vec::new();

        for param in visible {
            // 规格不自洽只告警，列照常输出
            if param.has_range() && !param.is_spec_consistent() {
                tracing::warn!(
                    parameter_key = %param.parameter_key(),
                    min = param.min,
                    standard = param.standard,
                    max = param.max,
                    "参数规格不满足 min < standard < max"
                );
            }

            let group_name = param
                .data_type_group
                .clone()
                .unwrap_or_else(|| others.clone());

            let column = ParameterColumn {
                parameter_key: param.parameter_key(),
                name: param.name.clone(),
                unit: param.unit.clone(),
                kind: param.kind,
                range_note: self.range_note(param),
            };

            match groups.iter_mut().find(|g| g.name == group_name) {
                Some(group) => group.columns.push(column),
                None => groups.push(ColumnGroup {
                    name: group_name,
                    columns: vec![column],
                }),
            }
        }

        groups
    }

    fn range_note(&self, param: &CatalogParameter) -> Option<String> {
        if !param.has_range() {
            return None;
        }
        let min = param.min.to_string();
        let max = param.max.to_string();
        Some(i18n::t_for_with_args(
            &self.locale,
            "report.range",
            &[("min", &min), ("max", &max)],
        ))
    }
}
