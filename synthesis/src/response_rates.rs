use log::debug;

use std::ops::{Add, AddAssign};

use crate::config::*;
use crate::render::{render_table, sanitize};
use crate::round_percent;

/// The surveyed population of a school or a group. Unknown populations absorb
/// every sum they take part in.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Population {
    Known(u64),
    NotAvailable,
}

impl Population {
    pub const EMPTY: Population = Population::Known(0);

    pub fn display(&self) -> String {
        match self {
            Population::Known(x) => x.to_string(),
            Population::NotAvailable => "N/A".to_string(),
        }
    }
}

impl Add for Population {
    type Output = Population;
    fn add(self, rhs: Population) -> Population {
        match (self, rhs) {
            (Population::Known(a), Population::Known(b)) => Population::Known(a + b),
            _ => Population::NotAvailable,
        }
    }
}

impl AddAssign for Population {
    fn add_assign(&mut self, rhs: Population) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Population {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Population::EMPTY, |a, b| a + b)
    }
}

/// The response rate in percent points, when the population is known and not zero.
pub fn response_rate(responses: u64, population: Population) -> Option<i64> {
    match population {
        Population::Known(p) if p > 0 => Some(round_percent(responses as f64 / p as f64)),
        _ => None,
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseRateRow {
    pub school_name: String,
    pub population: Population,
    pub responses: u64,
    pub rate: Option<i64>,
    pub school_id: String,
}

impl ResponseRateRow {
    fn total(rows: &[ResponseRateRow]) -> ResponseRateRow {
        let population: Population = rows.iter().map(|r| r.population).sum();
        let responses: u64 = rows.iter().map(|r| r.responses).sum();
        ResponseRateRow {
            school_name: "Total".to_string(),
            population,
            responses,
            rate: response_rate(responses, population),
            school_id: String::new(),
        }
    }
}

/// The response rates of the schools of one product level, with a total row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseRateTable {
    pub title: String,
    pub group: Stakeholder,
    pub rows: Vec<ResponseRateRow>,
    pub total: ResponseRateRow,
}

fn rate_cell(rate: Option<i64>) -> Cell {
    match rate {
        Some(r) => Cell::Text(format!("{}%", r)),
        None => Cell::NotAvailable,
    }
}

fn rate_columns(first: &str) -> Vec<Column> {
    vec![
        Column::label(first),
        Column::label("Survey Population"),
        Column::label("Number of Responses Received"),
        Column::label("Response Rate"),
    ]
}

impl ResponseRateTable {
    pub fn new(title: String, group: Stakeholder, rows: Vec<ResponseRateRow>) -> ResponseRateTable {
        let total = ResponseRateRow::total(&rows);
        ResponseRateTable {
            title,
            group,
            rows,
            total,
        }
    }

    /// The table as shown in the reports. The school identifiers are not shown.
    pub fn to_metric_table(&self) -> MetricTable {
        let mut t = MetricTable::new(
            TableId::ResponseRates(self.title.clone()),
            FillMode::PercentPositive,
            Layout::Plain,
            rate_columns("School Name"),
        );
        for r in self.rows.iter().chain(std::iter::once(&self.total)) {
            t.push_row(vec![
                Cell::Text(r.school_name.clone()),
                Cell::Text(r.population.display()),
                Cell::Text(r.responses.to_string()),
                rate_cell(r.rate),
            ]);
        }
        t
    }
}

pub fn response_rate_title(pl: ProductLevel, group: Stakeholder) -> String {
    format!("{} School {} Responses", pl.level.name(), group.name())
}

/// Builds the response rates of one product level for the current round.
///
/// Schools without a response count for the round are left out. The population
/// comes from the current school metadata row; a missing or unreadable
/// population makes the rate unavailable.
pub fn build_response_rates(
    pl: ProductLevel,
    group: Stakeholder,
    schools: &[String],
    counts: &[ResponseCount],
    meta: &[SchoolMeta],
    current: &Round,
) -> ResponseRateTable {
    let mut rows = Vec::new();
    for school in schools {
        let count = counts
            .iter()
            .find(|c| &c.school_id == school && c.target.contains(&current.code));
        let responses = match count {
            Some(c) => c.total,
            None => {
                debug!(
                    "build_response_rates: {}: no count for {} in round {}",
                    pl, school, current.code
                );
                continue;
            }
        };
        let current_meta = meta.iter().find(|m| &m.school_id == school && m.current);
        let population = match current_meta.and_then(|m| m.response_target) {
            Some(p) => Population::Known(p),
            None => Population::NotAvailable,
        };
        let school_name = current_meta
            .or_else(|| meta.iter().find(|m| &m.school_id == school))
            .map(|m| m.school_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| school.clone());
        rows.push(ResponseRateRow {
            school_name,
            population,
            responses,
            rate: response_rate(responses, population),
            school_id: school.clone(),
        });
    }
    ResponseRateTable::new(response_rate_title(pl, group), group, rows)
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupRow {
    pub group: Stakeholder,
    pub population: Population,
    pub responses: u64,
    pub rate: Option<i64>,
}

/// Response rates per stakeholder group.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupSummary {
    pub rows: Vec<GroupRow>,
}

impl GroupSummary {
    fn from_rows<'a, F>(tables: &'a [ResponseRateTable], rows_of: F) -> GroupSummary
    where
        F: Fn(&'a ResponseRateTable) -> Vec<&'a ResponseRateRow>,
    {
        let rows = Stakeholder::ALL
            .iter()
            .map(|group| {
                let selected: Vec<&ResponseRateRow> = tables
                    .iter()
                    .filter(|t| t.group == *group)
                    .flat_map(|t| rows_of(t))
                    .collect();
                let population: Population = selected.iter().map(|r| r.population).sum();
                let responses: u64 = selected.iter().map(|r| r.responses).sum();
                GroupRow {
                    group: *group,
                    population,
                    responses,
                    rate: response_rate(responses, population),
                }
            })
            .collect();
        GroupSummary { rows }
    }

    pub fn total_responses(&self) -> u64 {
        self.rows.iter().map(|r| r.responses).sum()
    }

    pub fn to_metric_table(&self) -> MetricTable {
        let mut t = MetricTable::new(
            TableId::ResponseRates("Total".to_string()),
            FillMode::PercentPositive,
            Layout::Plain,
            rate_columns("Group"),
        );
        for r in self.rows.iter() {
            t.push_row(vec![
                Cell::Text(r.group.name().to_string()),
                Cell::Text(r.population.display()),
                Cell::Text(r.responses.to_string()),
                rate_cell(r.rate),
            ]);
        }
        t
    }
}

/// Sums the total rows of the tables per stakeholder group.
pub fn summarize_groups(tables: &[ResponseRateTable]) -> GroupSummary {
    GroupSummary::from_rows(tables, |t| vec![&t.total])
}

/// Sums the rows of one school per stakeholder group.
pub fn summarize_school(tables: &[ResponseRateTable], school_id: &str) -> GroupSummary {
    GroupSummary::from_rows(tables, |t| {
        t.rows.iter().filter(|r| r.school_id == school_id).collect()
    })
}

/// The response rate fragment of the district and multilevel reports: the group
/// totals, then one table per product level.
pub fn render_response_rates(summary: &GroupSummary, tables: &[ResponseRateTable]) -> String {
    let mut html = format!("<b>Total</b>{}<br/>", render_table(&summary.to_metric_table()));
    for t in tables {
        html.push_str(&format!(
            "<b>{}</b>{}<br/>",
            sanitize(&t.title),
            render_table(&t.to_metric_table())
        ));
    }
    html
}
