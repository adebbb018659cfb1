use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// Value used by the survey aggregates for suppressed (too few responses) metrics.
pub const SUPPRESSED: f64 = -1000.0;

// ********* Survey identifiers ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SchoolLevel {
    Elementary,
    Middle,
    High,
}

impl SchoolLevel {
    pub const ALL: [SchoolLevel; 3] = [
        SchoolLevel::Elementary,
        SchoolLevel::Middle,
        SchoolLevel::High,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SchoolLevel::Elementary => "ES",
            SchoolLevel::Middle => "MS",
            SchoolLevel::High => "HS",
        }
    }

    /// The column header used for this level in district tables.
    pub fn name(&self) -> &'static str {
        match self {
            SchoolLevel::Elementary => "Elementary",
            SchoolLevel::Middle => "Middle",
            SchoolLevel::High => "High",
        }
    }

    pub fn trend_column(&self) -> &'static str {
        match self {
            SchoolLevel::Elementary => "es_trend",
            SchoolLevel::Middle => "ms_trend",
            SchoolLevel::High => "hs_trend",
        }
    }
}

/// The stakeholder groups that appear side by side in a synthesis report.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Stakeholder {
    Student,
    Family,
    Staff,
}

impl Stakeholder {
    pub const ALL: [Stakeholder; 3] = [Stakeholder::Student, Stakeholder::Family, Stakeholder::Staff];

    pub fn name(&self) -> &'static str {
        match self {
            Stakeholder::Student => "Student",
            Stakeholder::Family => "Family",
            Stakeholder::Staff => "Staff",
        }
    }

    pub fn product(&self) -> SurveyProduct {
        match self {
            Stakeholder::Student => SurveyProduct::Overall,
            Stakeholder::Family => SurveyProduct::Family,
            Stakeholder::Staff => SurveyProduct::Staff,
        }
    }

    pub fn trend_column(&self) -> &'static str {
        match self {
            Stakeholder::Student => "ose_trend",
            Stakeholder::Family => "fam_trend",
            Stakeholder::Staff => "sta_trend",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SurveyProduct {
    Overall,
    Teacher,
    Family,
    Staff,
}

impl SurveyProduct {
    pub fn code(&self) -> &'static str {
        match self {
            SurveyProduct::Overall => "OSE",
            SurveyProduct::Teacher => "FFT",
            SurveyProduct::Family => "FAM",
            SurveyProduct::Staff => "STA",
        }
    }

    /// The teacher feedback survey has no column in the synthesis templates.
    pub fn stakeholder(&self) -> Option<Stakeholder> {
        match self {
            SurveyProduct::Overall => Some(Stakeholder::Student),
            SurveyProduct::Teacher => None,
            SurveyProduct::Family => Some(Stakeholder::Family),
            SurveyProduct::Staff => Some(Stakeholder::Staff),
        }
    }
}

/// A survey product administered at one school level, e.g. `OSE_HS`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct ProductLevel {
    pub product: SurveyProduct,
    pub level: SchoolLevel,
}

impl ProductLevel {
    pub fn new(product: SurveyProduct, level: SchoolLevel) -> ProductLevel {
        ProductLevel { product, level }
    }

    pub fn for_group(group: Stakeholder, level: SchoolLevel) -> ProductLevel {
        ProductLevel::new(group.product(), level)
    }

    pub fn stakeholder(&self) -> Option<Stakeholder> {
        self.product.stakeholder()
    }
}

impl Display for ProductLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.product.code(), self.level.code())
    }
}

impl FromStr for ProductLevel {
    type Err = SynthesisErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || SynthesisErrors::UnknownProductLevel {
            name: s.to_string(),
        };
        let (p, l) = s.split_once('_').ok_or_else(unknown)?;
        let product = match p.to_ascii_uppercase().as_str() {
            "OSE" => SurveyProduct::Overall,
            "FFT" => SurveyProduct::Teacher,
            "FAM" => SurveyProduct::Family,
            "STA" => SurveyProduct::Staff,
            _ => return Err(unknown()),
        };
        let level = match l.to_ascii_uppercase().as_str() {
            "ES" => SchoolLevel::Elementary,
            "MS" => SchoolLevel::Middle,
            "HS" => SchoolLevel::High,
            _ => return Err(unknown()),
        };
        Ok(ProductLevel { product, level })
    }
}

// ********* Input data structures ***********

/// A table as delivered by a tabular source: one header row and string cells.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// A borrowed view on one record of a [RawTable], addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> RawRow<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        self.cells.get(idx).map(|s| s.as_str())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(parse_number)
    }
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> RawTable {
        RawTable { headers, records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> + '_ {
        self.records.iter().map(move |r| RawRow {
            headers: &self.headers,
            cells: r,
        })
    }

    /// Keeps the records for which the predicate holds.
    pub fn filter<F>(&self, pred: F) -> RawTable
    where
        F: Fn(&RawRow) -> bool,
    {
        let records = self
            .records
            .iter()
            .filter(|r| {
                pred(&RawRow {
                    headers: &self.headers,
                    cells: r.as_slice(),
                })
            })
            .cloned()
            .collect();
        RawTable {
            headers: self.headers.clone(),
            records,
        }
    }

    pub fn require_column(&self, table: &str, column: &str) -> Result<(), SynthesisErrors> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(SynthesisErrors::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
    }
}

/// Reads a numeric cell. Blank and NA-like cells are missing values.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    match t {
        "" | "NA" | "N/A" | "nan" | "NaN" | "None" => None,
        _ => t.parse::<f64>().ok().filter(|x| !x.is_nan()),
    }
}

/// The round code of a target label: `"Davis:19O"` -> `"19O"`.
pub fn round_code(target: &str) -> &str {
    target.rsplit(':').next().unwrap_or(target)
}

/// The entity of a target label: `"Davis:19O"` -> `"Davis"`.
pub fn target_entity(target: &str) -> &str {
    target.split(':').next().unwrap_or(target)
}

/// A score table restricted to one target entity. Every row is one round.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScoreTable {
    pub columns: Vec<String>,
    pub rows: Vec<ScoreRow>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ScoreRow {
    pub target: String,
    // Aligned with the columns of the table.
    pub values: Vec<Option<f64>>,
}

// Columns of the score tables that never hold a metric.
const LABEL_COLUMNS: [&str; 3] = ["target", "genTarget", "type"];

impl ScoreTable {
    /// Builds a score table from raw records, using `join_column` as the target label.
    pub fn from_raw(raw: &RawTable, join_column: &str) -> Result<ScoreTable, SynthesisErrors> {
        if raw.is_empty() {
            return Ok(ScoreTable::default());
        }
        raw.require_column("score table", join_column)?;
        let metric_idxs: Vec<usize> = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.as_str() != join_column && !LABEL_COLUMNS.contains(&h.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        let columns = metric_idxs
            .iter()
            .map(|idx| raw.headers[*idx].clone())
            .collect();
        let rows = raw
            .rows()
            .map(|row| ScoreRow {
                target: row.get(join_column).unwrap_or("").to_string(),
                values: metric_idxs
                    .iter()
                    .map(|idx| row.cells.get(*idx).and_then(|c| parse_number(c)))
                    .collect(),
            })
            .collect();
        Ok(ScoreTable { columns, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The distinct round codes of the table, in order of first appearance.
    pub fn round_codes(&self) -> Vec<String> {
        let mut res: Vec<String> = Vec::new();
        for row in self.rows.iter() {
            let code = round_code(&row.target);
            if !res.iter().any(|c| c == code) {
                res.push(code.to_string());
            }
        }
        res
    }
}

/// One row of the round metadata.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundMeta {
    pub code: String,
    pub id: i64,
    pub label: String,
}

impl RoundMeta {
    pub fn from_table(raw: &RawTable) -> Result<Vec<RoundMeta>, SynthesisErrors> {
        for c in ["rnd", "RoundID", "SurveyPeriod"] {
            raw.require_column("roundMeta", c)?;
        }
        let mut res = Vec::new();
        for row in raw.rows() {
            let id_s = row.get("RoundID").unwrap_or("");
            let id = parse_number(id_s)
                .filter(|x| x.fract() == 0.0)
                .ok_or_else(|| SynthesisErrors::InvalidNumber {
                    table: "roundMeta".to_string(),
                    column: "RoundID".to_string(),
                    value: id_s.to_string(),
                })?;
            res.push(RoundMeta {
                code: row.get("rnd").unwrap_or("").trim().to_string(),
                id: id as i64,
                label: row.get("SurveyPeriod").unwrap_or("").to_string(),
            });
        }
        Ok(res)
    }
}

/// One school as described by the school metadata.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchoolMeta {
    pub school_id: String,
    pub client_name: String,
    pub round: String,
    pub school_name: String,
    pub current: bool,
    /// The survey population, when it is known.
    pub response_target: Option<u64>,
}

impl SchoolMeta {
    pub fn from_table(raw: &RawTable) -> Result<Vec<SchoolMeta>, SynthesisErrors> {
        raw.require_column("schoolMeta", "genTarget")?;
        Ok(raw
            .rows()
            .map(|row| SchoolMeta {
                school_id: row.get("genTarget").unwrap_or("").to_string(),
                client_name: row.get("ClientName").unwrap_or("").to_string(),
                round: row.get("round").unwrap_or("").trim().to_string(),
                school_name: row.get("SchoolName").unwrap_or("").to_string(),
                current: row.number("current") == Some(1.0),
                response_target: row
                    .number("respTarget")
                    .filter(|x| *x >= 0.0 && x.fract() == 0.0)
                    .map(|x| x as u64),
            })
            .collect())
    }
}

/// One row of the response counts.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResponseCount {
    pub school_id: String,
    pub target: String,
    pub total: u64,
}

impl ResponseCount {
    pub fn from_table(raw: &RawTable) -> Result<Vec<ResponseCount>, SynthesisErrors> {
        for c in ["genTarget", "target", "total"] {
            raw.require_column("allcount", c)?;
        }
        let mut res = Vec::new();
        for row in raw.rows() {
            let total_s = row.get("total").unwrap_or("");
            let total = parse_number(total_s)
                .filter(|x| *x >= 0.0)
                .ok_or_else(|| SynthesisErrors::InvalidNumber {
                    table: "allcount".to_string(),
                    column: "total".to_string(),
                    value: total_s.to_string(),
                })?;
            res.push(ResponseCount {
                school_id: row.get("genTarget").unwrap_or("").to_string(),
                target: row.get("target").unwrap_or("").to_string(),
                total: total as u64,
            });
        }
        Ok(res)
    }
}

// ********* Rounds ***********

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Round {
    pub code: String,
    pub label: String,
}

/// The rounds retained for a report. Index 0 is the current round, index 1 the
/// most recent past round, and so on.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RoundSelection {
    rounds: Vec<Round>,
}

impl RoundSelection {
    /// The rounds must already be ordered from the most recent to the oldest.
    pub fn new(rounds: Vec<Round>) -> RoundSelection {
        RoundSelection { rounds }
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Round> {
        self.rounds.get(index)
    }

    pub fn current(&self) -> Option<&Round> {
        self.rounds.first()
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.rounds.iter().position(|r| r.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Round)> {
        self.rounds.iter().enumerate()
    }

    /// Keeps only the `max_rounds` most recent rounds.
    pub fn truncated(mut self, max_rounds: usize) -> RoundSelection {
        self.rounds.truncate(max_rounds);
        self
    }
}

// ********* Metrics ***********

/// A metric value as stored in a report table.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Score {
    /// A mean score, rounded to 2 decimals.
    Mean(f64),
    /// A percent-positive score, in percent points.
    Percent(i64),
    /// The metric was suppressed upstream.
    Suppressed,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Quartile {
    First,
    Second,
    Third,
    Fourth,
}

impl Quartile {
    pub fn rank(&self) -> u8 {
        match self {
            Quartile::First => 1,
            Quartile::Second => 2,
            Quartile::Third => 3,
            Quartile::Fourth => 4,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Direction {
    Increase,
    Decrease,
    /// No change, or nothing to compare with.
    Flat,
}

impl Direction {
    pub fn code(&self) -> u8 {
        match self {
            Direction::Increase => 1,
            Direction::Decrease => 2,
            Direction::Flat => 3,
        }
    }
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Trend {
    pub direction: Direction,
    // Always None for a flat trend.
    pub difference: Option<Score>,
}

impl Trend {
    pub const FLAT: Trend = Trend {
        direction: Direction::Flat,
        difference: None,
    };
}

// ********* Report tables ***********

/// The slot a metric occupies in a report table: a school level in the district
/// layout, a stakeholder group in the school layout.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Slot {
    Level(SchoolLevel),
    Group(Stakeholder),
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Column {
    Label(String),
    Value(Slot),
    Trend(Slot),
}

impl Column {
    pub fn label(s: &str) -> Column {
        Column::Label(s.to_string())
    }

    pub fn header(&self) -> String {
        match self {
            Column::Label(s) => s.clone(),
            Column::Value(Slot::Level(l)) => l.name().to_string(),
            Column::Value(Slot::Group(g)) => g.name().to_string(),
            Column::Trend(Slot::Level(l)) => l.trend_column().to_string(),
            Column::Trend(Slot::Group(g)) => g.trend_column().to_string(),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    /// An unfilled slot, holding the name of the source column that fills it.
    Key(String),
    Score {
        score: Score,
        quartile: Option<Quartile>,
    },
    Trend(Trend),
    /// Cleared because the percentile data of its metric family is missing.
    Withheld,
    NotAvailable,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum FillMode {
    Mean,
    PercentPositive,
}

/// What gets cleared when a percent-positive metric has no percentile.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WithholdScope {
    /// The whole value column of the metric and its trend column.
    Column,
    /// Only the cell and its trend cell.
    Cell,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum TableId {
    AllFactors,
    AllFactorsPct,
    CommonFactors,
    EngagementTheme,
    RelationshipsTheme,
    CultureTheme,
    Item(String),
    ResponseRates(String),
}

impl TableId {
    /// The substitution key of the table in the report.
    pub fn key(&self) -> String {
        match self {
            TableId::AllFactors => "all_factors".to_string(),
            TableId::AllFactorsPct => "all_factors_pct".to_string(),
            TableId::CommonFactors => "common_factors".to_string(),
            TableId::EngagementTheme => "eng_theme".to_string(),
            TableId::RelationshipsTheme => "rel_theme".to_string(),
            TableId::CultureTheme => "cult_theme".to_string(),
            TableId::Item(s) => s.clone(),
            TableId::ResponseRates(s) => s.clone(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Layout {
    /// One value column per school level.
    District,
    /// One value column per stakeholder group, for the schools of one level.
    School(SchoolLevel),
    /// No metric columns.
    Plain,
}

/// A report table with a fixed layout. Rows are built from the template,
/// the value and trend cells get filled from the score tables.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricTable {
    pub id: TableId,
    pub mode: FillMode,
    pub layout: Layout,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl MetricTable {
    pub fn new(id: TableId, mode: FillMode, layout: Layout, columns: Vec<Column>) -> MetricTable {
        MetricTable {
            id,
            mode,
            layout,
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing trailing cells are empty.
    pub fn push_row(&mut self, mut cells: Vec<Cell>) {
        cells.resize(self.columns.len(), Cell::Empty);
        self.rows.push(cells);
    }

    pub fn column_index(&self, column: &Column) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &Column) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

// ********* Bar charts ***********

#[derive(PartialEq, Eq, Debug, Clone)]
pub enum BarEntry {
    /// Not filled yet: the name of the percent-positive column to read.
    Pending(String),
    /// One value per round of the selection. None renders as N/A.
    Series(Vec<Option<i64>>),
}

/// A toggled bar chart: one entry per product level.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct BarChart {
    pub name: String,
    pub entries: BTreeMap<ProductLevel, BarEntry>,
}

impl BarChart {
    pub fn is_filled(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e, BarEntry::Series(_)))
    }
}

// ********* Configuration **********

/// A configured item table: one row per stakeholder group, one value column per level.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ItemTemplate {
    pub name: String,
    pub title: String,
    pub variables: BTreeMap<ProductLevel, String>,
}

/// The static layout information of the reports.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ReportTemplate {
    /// Ordered factor variables of the district `all_factors` table.
    pub district_factors: BTreeMap<ProductLevel, Vec<String>>,
    /// Ordered factor variables of the school `all_factors` tables.
    pub school_factors: BTreeMap<ProductLevel, Vec<String>>,
    pub common_themes: Vec<String>,
    pub items: Vec<ItemTemplate>,
    /// Percent-positive variables of the engagement, relationships and culture bars.
    pub theme_bars: BTreeMap<String, BTreeMap<ProductLevel, String>>,
}

// ********* Output data structures ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Scope {
    District,
    School,
}

impl Scope {
    pub fn tag(&self) -> &'static str {
        match self {
            Scope::District => "district",
            Scope::School => "school",
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SeriesData {
    pub name: String,
    pub data: Vec<Option<i64>>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Segmentation {
    pub name: String,
    pub series: Vec<SeriesData>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct BarChartElement {
    pub categories: Vec<String>,
    pub segmentations: Vec<Segmentation>,
}

/// A finished report. Immutable once assembled.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Report {
    pub name: String,
    pub title: String,
    pub scope: Scope,
    pub total_responses: u64,
    /// The substitutions of the text element: html fragments and plain values.
    pub substitutions: Vec<(String, String)>,
    pub bars: Vec<(String, BarChartElement)>,
}

// ********* Errors ***********

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SynthesisErrors {
    /// A round code in the score data has no entry in the round metadata.
    UnknownRound { code: String },
    MissingColumn { table: String, column: String },
    InvalidNumber {
        table: String,
        column: String,
        value: String,
    },
    UnknownProductLevel { name: String },
}

impl Error for SynthesisErrors {}

impl Display for SynthesisErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisErrors::UnknownRound { code } => write!(
                f,
                "Rounds don't seem to match up: round {:?} is missing from the round metadata",
                code
            ),
            SynthesisErrors::MissingColumn { table, column } => {
                write!(f, "Column {:?} is missing from table {}", column, table)
            }
            SynthesisErrors::InvalidNumber {
                table,
                column,
                value,
            } => write!(
                f,
                "Could not read {:?} as a number (table {}, column {})",
                value, table, column
            ),
            SynthesisErrors::UnknownProductLevel { name } => {
                write!(f, "Unknown product level {:?}", name)
            }
        }
    }
}
