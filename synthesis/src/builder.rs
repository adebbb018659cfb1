use log::warn;

use std::collections::BTreeMap;

pub use crate::config::*;

const STUDENT_THEMES: [&str; 7] = [
    "Engagement",
    "Academic Rigor",
    "Relationships",
    "Culture",
    "Belonging & Peer Collaboration",
    "Instructional Methods",
    "College & Career Readiness",
];

const FAMILY_THEMES: [&str; 6] = [
    "Engagement",
    "Relationships",
    "Culture",
    "Communication & Feedback",
    "Resources",
    "School Safety",
];

const STAFF_THEMES: [&str; 4] = [
    "Engagement",
    "Relationships",
    "Culture",
    "Professional Development & Support",
];

const SCHOOL_THEMES: [&str; 11] = [
    "Engagement",
    "Relationships",
    "Culture",
    "Academic Rigor",
    "Belonging & Peer Collaboration",
    "Instructional Methods",
    "College & Career Readiness",
    "Communication & Feedback",
    "Resources",
    "School Safety",
    "Professional Development & Support",
];

const THEME_TABLES: [(TableId, &str); 3] = [
    (TableId::EngagementTheme, "Engagement"),
    (TableId::RelationshipsTheme, "Relationships"),
    (TableId::CultureTheme, "Culture"),
];

fn group_themes(group: Stakeholder) -> &'static [&'static str] {
    match group {
        Stakeholder::Student => &STUDENT_THEMES,
        Stakeholder::Family => &FAMILY_THEMES,
        Stakeholder::Staff => &STAFF_THEMES,
    }
}

fn key_cell(variables: Option<&String>) -> Cell {
    match variables {
        Some(v) if !v.is_empty() => Cell::Key(v.clone()),
        _ => Cell::Empty,
    }
}

fn factor_cell(
    factors: &BTreeMap<ProductLevel, Vec<String>>,
    pl: ProductLevel,
    idx: usize,
) -> Cell {
    key_cell(factors.get(&pl).and_then(|l| l.get(idx)))
}

/// Builds the empty report tables and bar charts described by a template.
///
/// The tables come out with the keys of their metrics in the value cells, ready
/// to be filled product level by product level.
///
/// ```
/// use synthesis::builder::Builder;
/// use synthesis::{ReportTemplate, SchoolLevel, TableId};
///
/// let template = ReportTemplate::default();
/// let tables = Builder::new(&template).district_tables();
/// assert_eq!(tables.len(), 6);
/// assert_eq!(tables[0].id, TableId::AllFactors);
/// assert_eq!(tables[0].rows.len(), 17);
///
/// let school = Builder::new(&template).school_tables(SchoolLevel::High);
/// assert_eq!(school[0].rows.len(), 11);
/// ```
pub struct Builder<'a> {
    template: &'a ReportTemplate,
}

impl<'a> Builder<'a> {
    pub fn new(template: &'a ReportTemplate) -> Builder<'a> {
        Builder { template }
    }

    fn district_columns(with_theme: bool) -> Vec<Column> {
        let mut cols = vec![Column::label("Group")];
        if with_theme {
            cols.push(Column::label("Survey Theme"));
        }
        for level in SchoolLevel::ALL {
            cols.push(Column::Value(Slot::Level(level)));
            cols.push(Column::Trend(Slot::Level(level)));
        }
        cols
    }

    fn school_columns() -> Vec<Column> {
        let mut cols = vec![Column::label("Survey Theme")];
        for group in Stakeholder::ALL {
            cols.push(Column::Value(Slot::Group(group)));
            cols.push(Column::Trend(Slot::Group(group)));
        }
        cols
    }

    /// The district `all_factors` table: one block of theme rows per stakeholder group.
    fn district_all_factors(&self) -> (MetricTable, Vec<Stakeholder>) {
        let factors = &self.template.district_factors;
        let mut table = MetricTable::new(
            TableId::AllFactors,
            FillMode::Mean,
            Layout::District,
            Builder::district_columns(true),
        );
        let mut groups = Vec::new();
        for group in Stakeholder::ALL {
            let themes = group_themes(group);
            for level in SchoolLevel::ALL {
                let pl = ProductLevel::for_group(group, level);
                if let Some(l) = factors.get(&pl) {
                    if l.len() > themes.len() {
                        warn!(
                            "district_all_factors: {} lists {} factors, only {} are used",
                            pl,
                            l.len(),
                            themes.len()
                        );
                    }
                }
            }
            for (idx, theme) in themes.iter().enumerate() {
                let label = if idx == 0 { group.name() } else { "" };
                let mut cells = vec![
                    Cell::Text(label.to_string()),
                    Cell::Text(theme.to_string()),
                ];
                for level in SchoolLevel::ALL {
                    let pl = ProductLevel::for_group(group, level);
                    cells.push(factor_cell(factors, pl, idx));
                    cells.push(Cell::Empty);
                }
                table.push_row(cells);
                groups.push(group);
            }
        }
        (table, groups)
    }

    fn theme_of(table: &MetricTable, row: &[Cell]) -> Option<String> {
        let idx = table.column_index(&Column::label("Survey Theme"))?;
        match &row[idx] {
            Cell::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn select_rows<F>(table: &MetricTable, id: TableId, pred: F) -> MetricTable
    where
        F: Fn(&str) -> bool,
    {
        let mut res = MetricTable::new(
            id,
            FillMode::PercentPositive,
            table.layout,
            table.columns.clone(),
        );
        for row in table.rows.iter() {
            if Builder::theme_of(table, row).map(|t| pred(&t)).unwrap_or(false) {
                res.push_row(row.clone());
            }
        }
        res
    }

    /// The district tables: `all_factors` (means), `all_factors_pct`,
    /// `common_factors`, the three theme tables and the item tables.
    pub fn district_tables(&self) -> Vec<MetricTable> {
        let common = &self.template.common_themes;
        let (all_factors, groups) = self.district_all_factors();
        let mut pct = all_factors.clone();
        pct.id = TableId::AllFactorsPct;
        pct.mode = FillMode::PercentPositive;

        let common_factors = Builder::select_rows(&all_factors, TableId::CommonFactors, |t| {
            common.iter().any(|c| c == t)
        });

        let mut res = vec![all_factors.clone(), pct, common_factors];
        for (id, theme) in THEME_TABLES {
            let mut t = MetricTable::new(
                id,
                FillMode::PercentPositive,
                Layout::District,
                Builder::district_columns(false),
            );
            let theme_rows = all_factors
                .rows
                .iter()
                .zip(groups.iter())
                .filter(|(row, _)| {
                    Builder::theme_of(&all_factors, row)
                        .map(|th| th == theme && common.iter().any(|c| *c == th))
                        .unwrap_or(false)
                });
            for (row, group) in theme_rows {
                // The group label replaces the theme column.
                let mut cells = vec![Cell::Text(group.name().to_string())];
                cells.extend(row.iter().skip(2).cloned());
                t.push_row(cells);
            }
            res.push(t);
        }

        for item in self.template.items.iter() {
            let mut t = MetricTable::new(
                TableId::Item(item.name.clone()),
                FillMode::PercentPositive,
                Layout::District,
                Builder::district_columns(false),
            );
            for group in Stakeholder::ALL {
                let mut cells = vec![Cell::Text(group.name().to_string())];
                for level in SchoolLevel::ALL {
                    let pl = ProductLevel::for_group(group, level);
                    cells.push(key_cell(item.variables.get(&pl)));
                    cells.push(Cell::Empty);
                }
                t.push_row(cells);
            }
            res.push(t);
        }
        res
    }

    /// The tables of the school reports of one level: `all_factors` (means),
    /// `all_factors_pct`, `common_factors` and the three theme tables.
    pub fn school_tables(&self, level: SchoolLevel) -> Vec<MetricTable> {
        let factors = &self.template.school_factors;
        let common = &self.template.common_themes;
        let mut all_factors = MetricTable::new(
            TableId::AllFactors,
            FillMode::Mean,
            Layout::School(level),
            Builder::school_columns(),
        );
        for (idx, theme) in SCHOOL_THEMES.iter().enumerate() {
            let mut cells = vec![Cell::Text(theme.to_string())];
            for group in Stakeholder::ALL {
                cells.push(factor_cell(factors, ProductLevel::for_group(group, level), idx));
                cells.push(Cell::Empty);
            }
            all_factors.push_row(cells);
        }
        let mut pct = all_factors.clone();
        pct.id = TableId::AllFactorsPct;
        pct.mode = FillMode::PercentPositive;
        let common_factors = Builder::select_rows(&all_factors, TableId::CommonFactors, |t| {
            common.iter().any(|c| c == t)
        });
        let mut res = vec![all_factors.clone(), pct, common_factors];
        for (id, theme) in THEME_TABLES {
            res.push(Builder::select_rows(&all_factors, id, |t| {
                t == theme && common.iter().any(|c| c == t)
            }));
        }
        res
    }

    fn chart(
        name: &str,
        variables: &BTreeMap<ProductLevel, String>,
        level: Option<SchoolLevel>,
    ) -> BarChart {
        BarChart {
            name: name.to_string(),
            entries: variables
                .iter()
                .filter(|(pl, v)| !v.is_empty() && level.map(|l| pl.level == l).unwrap_or(true))
                .map(|(pl, v)| (*pl, BarEntry::Pending(v.clone())))
                .collect(),
        }
    }

    /// One bar chart per item table, then the theme bar charts.
    pub fn district_bars(&self) -> Vec<BarChart> {
        let mut res: Vec<BarChart> = self
            .template
            .items
            .iter()
            .map(|item| Builder::chart(&item.name, &item.variables, None))
            .collect();
        for (name, variables) in self.template.theme_bars.iter() {
            res.push(Builder::chart(name, variables, None));
        }
        res
    }

    /// The theme bar charts, restricted to one school level.
    pub fn school_bars(&self, level: SchoolLevel) -> Vec<BarChart> {
        self.template
            .theme_bars
            .iter()
            .map(|(name, variables)| Builder::chart(name, variables, Some(level)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pl(s: &str) -> ProductLevel {
        s.parse().unwrap()
    }

    fn template() -> ReportTemplate {
        let mut district_factors = BTreeMap::new();
        district_factors.insert(
            pl("OSE_HS"),
            vec!["eng_hs".to_string(), "rig_hs".to_string(), "rel_hs".to_string()],
        );
        district_factors.insert(pl("FAM_HS"), vec!["f_eng_hs".to_string()]);
        let mut school_factors = BTreeMap::new();
        school_factors.insert(
            pl("STA_ES"),
            vec!["s_eng".to_string(), "".to_string(), "s_cult".to_string()],
        );
        let mut theme_bars = BTreeMap::new();
        let mut eng = BTreeMap::new();
        eng.insert(pl("OSE_HS"), "eng_hs".to_string());
        eng.insert(pl("OSE_ES"), "eng_es".to_string());
        theme_bars.insert("eng_theme_bar".to_string(), eng);
        let mut variables = BTreeMap::new();
        variables.insert(pl("OSE_MS"), "edqual_ms".to_string());
        ReportTemplate {
            district_factors,
            school_factors,
            common_themes: vec![
                "Engagement".to_string(),
                "Relationships".to_string(),
                "Culture".to_string(),
            ],
            items: vec![ItemTemplate {
                name: "edqual".to_string(),
                title: "Educational quality".to_string(),
                variables,
            }],
            theme_bars,
        }
    }

    #[test]
    fn district_all_factors_blocks() {
        let t = template();
        let tables = Builder::new(&t).district_tables();
        let af = &tables[0];
        assert_eq!(af.rows.len(), 17);
        let high = Column::Value(Slot::Level(SchoolLevel::High));
        assert_eq!(af.cell(0, &high), Some(&Cell::Key("eng_hs".to_string())));
        assert_eq!(af.cell(2, &high), Some(&Cell::Key("rel_hs".to_string())));
        assert_eq!(af.cell(3, &high), Some(&Cell::Empty));
        // The family block starts after the 7 student rows.
        assert_eq!(af.cell(7, &Column::label("Group")), Some(&Cell::Text("Family".to_string())));
        assert_eq!(af.cell(7, &high), Some(&Cell::Key("f_eng_hs".to_string())));
        assert_eq!(af.cell(13, &Column::label("Group")), Some(&Cell::Text("Staff".to_string())));
        assert_eq!(af.mode, FillMode::Mean);
        assert_eq!(tables[1].mode, FillMode::PercentPositive);
    }

    #[test]
    fn district_derived_tables() {
        let t = template();
        let tables = Builder::new(&t).district_tables();
        let ids: Vec<String> = tables.iter().map(|t| t.id.key()).collect();
        assert_eq!(
            ids,
            vec![
                "all_factors",
                "all_factors_pct",
                "common_factors",
                "eng_theme",
                "rel_theme",
                "cult_theme",
                "edqual"
            ]
        );
        assert_eq!(tables[2].rows.len(), 9);
        let rel = &tables[4];
        assert_eq!(rel.rows.len(), 3);
        assert_eq!(rel.columns.len(), 7);
        assert_eq!(rel.cell(1, &Column::label("Group")), Some(&Cell::Text("Family".to_string())));
        assert_eq!(
            rel.cell(0, &Column::Value(Slot::Level(SchoolLevel::High))),
            Some(&Cell::Key("rel_hs".to_string()))
        );
        let item = &tables[6];
        assert_eq!(
            item.cell(0, &Column::Value(Slot::Level(SchoolLevel::Middle))),
            Some(&Cell::Key("edqual_ms".to_string()))
        );
    }

    #[test]
    fn school_tables_for_level() {
        let t = template();
        let tables = Builder::new(&t).school_tables(SchoolLevel::Elementary);
        assert_eq!(tables.len(), 6);
        let staff = Column::Value(Slot::Group(Stakeholder::Staff));
        assert_eq!(tables[0].cell(0, &staff), Some(&Cell::Key("s_eng".to_string())));
        assert_eq!(tables[0].cell(1, &staff), Some(&Cell::Empty));
        assert_eq!(tables[0].layout, Layout::School(SchoolLevel::Elementary));
        assert_eq!(tables[2].rows.len(), 3);
        assert_eq!(tables[5].rows.len(), 1);
        assert_eq!(tables[5].cell(0, &staff), Some(&Cell::Key("s_cult".to_string())));
    }

    #[test]
    fn bars_by_level() {
        let t = template();
        let b = Builder::new(&t);
        let district = b.district_bars();
        assert_eq!(district.len(), 2);
        assert_eq!(district[0].name, "edqual");
        assert_eq!(district[1].entries.len(), 2);
        let school = b.school_bars(SchoolLevel::High);
        assert_eq!(school.len(), 1);
        assert_eq!(
            school[0].entries.get(&pl("OSE_HS")),
            Some(&BarEntry::Pending("eng_hs".to_string()))
        );
        assert_eq!(school[0].entries.get(&pl("OSE_ES")), None);
    }
}
