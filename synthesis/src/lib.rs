mod config;
mod render;
mod response_rates;

pub mod builder;
pub mod capacity;
pub mod manual;

use log::{debug, info, warn};

use std::collections::BTreeMap;

pub use crate::config::*;
pub use crate::render::*;
pub use crate::response_rates::*;

// **** Numeric conventions ****

/// Rounds to the given number of decimals, resolving ties to the even neighbour.
pub fn round_to(x: f64, decimals: i32) -> f64 {
    let m = 10f64.powi(decimals);
    (x * m).round_ties_even() / m
}

/// Converts a share in [0, 1] to whole percent points.
pub fn round_percent(x: f64) -> i64 {
    (x * 100.0).round_ties_even() as i64
}

impl Score {
    pub fn from_mean(raw: f64) -> Score {
        if raw == SUPPRESSED {
            Score::Suppressed
        } else {
            Score::Mean(round_to(raw, 2))
        }
    }

    pub fn from_share(raw: f64) -> Score {
        if raw == SUPPRESSED {
            Score::Suppressed
        } else {
            Score::Percent(round_percent(raw))
        }
    }
}

/// The quartile of a percentile. A missing (NaN) percentile has no quartile.
pub fn determine_quartile(percentile: f64) -> Option<Quartile> {
    if percentile.is_nan() {
        None
    } else if percentile >= 75.0 {
        Some(Quartile::First)
    } else if percentile >= 50.0 {
        Some(Quartile::Second)
    } else if percentile >= 25.0 {
        Some(Quartile::Third)
    } else {
        Some(Quartile::Fourth)
    }
}

/// Compares a score with the score of the previous round.
///
/// The trend is flat when there is no previous score, when either score is
/// suppressed, or when the scores are equal.
pub fn determine_trend(score: Score, last: Option<Score>) -> Trend {
    let trend = |direction: Direction, difference: Score| Trend {
        direction,
        difference: Some(difference),
    };
    match (score, last) {
        (Score::Mean(s), Some(Score::Mean(l))) if s > l => {
            trend(Direction::Increase, Score::Mean(round_to(s - l, 2)))
        }
        (Score::Mean(s), Some(Score::Mean(l))) if l > s => {
            trend(Direction::Decrease, Score::Mean(round_to(l - s, 2)))
        }
        (Score::Percent(s), Some(Score::Percent(l))) if s > l => {
            trend(Direction::Increase, Score::Percent(s - l))
        }
        (Score::Percent(s), Some(Score::Percent(l))) if l > s => {
            trend(Direction::Decrease, Score::Percent(l - s))
        }
        _ => Trend::FLAT,
    }
}

// **** Round selection ****

/// Determines the rounds covered by the score tables of one product level.
///
/// The round codes found in the target labels are looked up in the round
/// metadata and ordered from the most recent to the oldest. If any of the
/// tables is empty, the selection is empty.
pub fn select_rounds(
    mean: &ScoreTable,
    percentile: &ScoreTable,
    percent_positive: &ScoreTable,
    meta: &[RoundMeta],
) -> Result<RoundSelection, SynthesisErrors> {
    if mean.is_empty() || percentile.is_empty() || percent_positive.is_empty() {
        warn!(
            "select_rounds: empty score tables (mean: {}, percentile: {}, percent positive: {}), no round selected",
            mean.rows.len(),
            percentile.rows.len(),
            percent_positive.rows.len()
        );
        return Ok(RoundSelection::default());
    }

    let mut by_id: BTreeMap<i64, Round> = BTreeMap::new();
    for table in [mean, percentile, percent_positive] {
        for code in table.round_codes() {
            let m = meta
                .iter()
                .find(|m| m.code == code)
                .ok_or_else(|| SynthesisErrors::UnknownRound { code: code.clone() })?;
            by_id.insert(
                m.id,
                Round {
                    code,
                    label: m.label.clone(),
                },
            );
        }
    }
    let rounds: Vec<Round> = by_id.into_values().rev().collect();
    debug!("select_rounds: rounds: {:?}", rounds);
    Ok(RoundSelection::new(rounds))
}

/// Picks the selection with the most rounds. The first one wins ties.
pub fn merge_round_selections(selections: &[RoundSelection]) -> RoundSelection {
    let mut best: Option<&RoundSelection> = None;
    for s in selections {
        if best.map(|b| s.len() > b.len()).unwrap_or(true) {
            best = Some(s);
        }
    }
    best.cloned().unwrap_or_default()
}

// **** Trend annotation ****

/// A score table in which every row is tagged with its round index.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct AnnotatedTable {
    pub columns: Vec<String>,
    pub rows: Vec<(usize, ScoreRow)>,
}

impl AnnotatedTable {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// The value of a column for a round, if that round has a row and the value is present.
    pub fn value(&self, round: usize, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows
            .iter()
            .find(|(r, _)| *r == round)
            .and_then(|(_, row)| row.values.get(idx).cloned().flatten())
    }
}

/// Tags the rows of a table with the index of their round. Rows from rounds
/// outside the selection are dropped.
pub fn annotate_rounds(table: &ScoreTable, selection: &RoundSelection) -> AnnotatedTable {
    let mut rows = Vec::new();
    for row in table.rows.iter() {
        match selection.index_of(round_code(&row.target)) {
            Some(idx) => rows.push((idx, row.clone())),
            None => {
                debug!("annotate_rounds: dropping row {:?}", row.target);
            }
        }
    }
    AnnotatedTable {
        columns: table.columns.clone(),
        rows,
    }
}

/// The annotated score tables of one product level.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ScoreSet {
    pub mean: AnnotatedTable,
    pub percentile: AnnotatedTable,
    pub percent_positive: AnnotatedTable,
}

impl ScoreSet {
    pub fn annotate(
        mean: &ScoreTable,
        percentile: &ScoreTable,
        percent_positive: &ScoreTable,
        selection: &RoundSelection,
    ) -> ScoreSet {
        ScoreSet {
            mean: annotate_rounds(mean, selection),
            percentile: annotate_rounds(percentile, selection),
            percent_positive: annotate_rounds(percent_positive, selection),
        }
    }
}

// **** Metric filling ****

enum Lookup {
    // The key is not a metric of this product level.
    Missing,
    Filled(Cell, Trend),
    // Percent-positive metric without a percentile.
    Withhold,
}

fn lookup_metric(key: &str, mode: FillMode, scores: &ScoreSet) -> Lookup {
    let percentile = scores.percentile.value(0, key).map(|p| round_to(p, 2));
    let quartile = percentile.and_then(determine_quartile);
    let source = match mode {
        FillMode::Mean => &scores.mean,
        FillMode::PercentPositive => &scores.percent_positive,
    };
    let convert = match mode {
        FillMode::Mean => Score::from_mean,
        FillMode::PercentPositive => Score::from_share,
    };
    let score = match source.value(0, key) {
        Some(v) => convert(v),
        None => return Lookup::Missing,
    };
    if mode == FillMode::PercentPositive
        && percentile.is_none()
        && scores.percentile.has_column(key)
    {
        return Lookup::Withhold;
    }
    let last = source.value(1, key).map(convert);
    Lookup::Filled(Cell::Score { score, quartile }, determine_trend(score, last))
}

fn slot_for(table: &MetricTable, pl: ProductLevel) -> Option<Slot> {
    let group = pl.stakeholder()?;
    match table.layout {
        Layout::District => Some(Slot::Level(pl.level)),
        Layout::School(level) if level == pl.level => Some(Slot::Group(group)),
        _ => None,
    }
}

/// Fills the cells of a table that take their values from the given product level.
///
/// A cell is filled when it still holds the key of a metric present in the
/// scores of the current round. Cells of other product levels are left untouched,
/// which makes filling commutative across product levels.
pub fn fill_table(
    table: MetricTable,
    pl: ProductLevel,
    scores: &ScoreSet,
    scope: WithholdScope,
) -> MetricTable {
    let mut table = table;
    let slot = match slot_for(&table, pl) {
        Some(s) => s,
        None => return table,
    };
    let value_idx = match table.column_index(&Column::Value(slot)) {
        Some(idx) => idx,
        None => return table,
    };
    let trend_idx = table.column_index(&Column::Trend(slot));

    let lookups: Vec<(usize, Lookup)> = table
        .rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| match &row[value_idx] {
            Cell::Key(k) => Some((idx, lookup_metric(k, table.mode, scores))),
            _ => None,
        })
        .collect();

    let withhold_family = scope == WithholdScope::Column
        && lookups.iter().any(|(_, l)| matches!(l, Lookup::Withhold));
    if withhold_family {
        info!(
            "fill_table: {}: missing percentiles for {}, withholding the column",
            table.id.key(),
            pl
        );
    }

    for (idx, lookup) in lookups {
        let row = &mut table.rows[idx];
        match lookup {
            Lookup::Missing => {}
            _ if withhold_family => {
                row[value_idx] = Cell::Withheld;
                if let Some(t) = trend_idx {
                    row[t] = Cell::Withheld;
                }
            }
            Lookup::Withhold => {
                row[value_idx] = Cell::Withheld;
                if let Some(t) = trend_idx {
                    row[t] = Cell::Withheld;
                }
            }
            Lookup::Filled(cell, trend) => {
                row[value_idx] = cell;
                if let Some(t) = trend_idx {
                    row[t] = Cell::Trend(trend);
                }
            }
        }
    }
    table
}

pub fn fill_tables(
    tables: Vec<MetricTable>,
    pl: ProductLevel,
    scores: &ScoreSet,
    scope: WithholdScope,
) -> Vec<MetricTable> {
    tables
        .into_iter()
        .map(|t| fill_table(t, pl, scores, scope))
        .collect()
}

/// Fills the entry of a bar chart for one product level with one
/// percent-positive value per selected round.
pub fn fill_bar_chart(
    chart: BarChart,
    pl: ProductLevel,
    percent_positive: &AnnotatedTable,
    selection: &RoundSelection,
) -> BarChart {
    let mut chart = chart;
    let key = match chart.entries.get(&pl) {
        Some(BarEntry::Pending(k)) if !k.is_empty() => k.clone(),
        _ => return chart,
    };
    if !percent_positive.has_column(&key) {
        debug!(
            "fill_bar_chart: {}: no column {:?} for {}",
            chart.name, key, pl
        );
        return chart;
    }
    let series: Vec<Option<i64>> = (0..selection.len())
        .map(|idx| match percent_positive.value(idx, &key).map(Score::from_share) {
            Some(Score::Percent(p)) => Some(p),
            _ => None,
        })
        .collect();
    chart.entries.insert(pl, BarEntry::Series(series));
    chart
}

pub fn fill_bar_charts(
    charts: Vec<BarChart>,
    pl: ProductLevel,
    percent_positive: &AnnotatedTable,
    selection: &RoundSelection,
) -> Vec<BarChart> {
    charts
        .into_iter()
        .map(|c| fill_bar_chart(c, pl, percent_positive, selection))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn raw(headers: &[&str], records: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            records
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn scores(headers: &[&str], records: &[&[&str]]) -> ScoreTable {
        ScoreTable::from_raw(&raw(headers, records), "target").unwrap()
    }

    fn meta() -> Vec<RoundMeta> {
        RoundMeta::from_table(&raw(
            &["rnd", "RoundID", "SurveyPeriod"],
            &[
                &["16O", "16", "October 2016"],
                &["19O", "19", "October 2019"],
                &["18O", "18", "October 2018"],
                &["17O", "17", "October 2017"],
            ],
        ))
        .unwrap()
    }

    fn sel(codes: &[&str]) -> RoundSelection {
        RoundSelection::new(
            codes
                .iter()
                .map(|c| Round {
                    code: c.to_string(),
                    label: format!("Label {}", c),
                })
                .collect(),
        )
    }

    fn district_table(mode: FillMode, key: &str) -> MetricTable {
        let mut t = MetricTable::new(
            TableId::AllFactors,
            mode,
            Layout::District,
            vec![
                Column::label("Survey Theme"),
                Column::Value(Slot::Level(SchoolLevel::High)),
                Column::Trend(Slot::Level(SchoolLevel::High)),
            ],
        );
        t.push_row(vec![Cell::Text("Engagement".to_string()), Cell::Key(key.to_string())]);
        t
    }

    #[test]
    fn quartile_boundaries() {
        let cases = [
            (0.0, Quartile::Fourth),
            (24.99, Quartile::Fourth),
            (25.0, Quartile::Third),
            (49.99, Quartile::Third),
            (50.0, Quartile::Second),
            (63.0, Quartile::Second),
            (74.99, Quartile::Second),
            (75.0, Quartile::First),
            (100.0, Quartile::First),
        ];
        for (p, q) in cases {
            assert_eq!(determine_quartile(p), Some(q), "percentile {}", p);
        }
        assert_eq!(determine_quartile(f64::NAN), None);
        assert_eq!(determine_quartile(63.0).map(|q| q.rank()), Some(2));
    }

    #[test]
    fn trend_directions() {
        let p = Score::Percent;
        assert_eq!(determine_trend(p(10), None), Trend::FLAT);
        assert_eq!(
            determine_trend(p(10), Some(p(5))),
            Trend {
                direction: Direction::Increase,
                difference: Some(p(5))
            }
        );
        assert_eq!(
            determine_trend(p(95), Some(p(30))),
            Trend {
                direction: Direction::Increase,
                difference: Some(p(65))
            }
        );
        assert_eq!(determine_trend(p(95), Some(p(95))), Trend::FLAT);
        assert_eq!(
            determine_trend(p(95), Some(p(96))),
            Trend {
                direction: Direction::Decrease,
                difference: Some(p(1))
            }
        );
        assert_eq!(determine_trend(p(95), Some(Score::Suppressed)), Trend::FLAT);
        assert_eq!(determine_trend(Score::Suppressed, Some(p(4))), Trend::FLAT);
        assert_eq!(determine_trend(p(3), Some(p(4))).direction.code(), 2);
        assert_eq!(Trend::FLAT.direction.code(), 3);
    }

    #[test]
    fn mean_trend_is_rounded() {
        let t = determine_trend(Score::Mean(3.56), Some(Score::Mean(3.53)));
        assert_eq!(t.direction, Direction::Increase);
        assert_eq!(t.difference, Some(Score::Mean(0.03)));
    }

    #[test]
    fn sentinel_is_suppressed() {
        assert_eq!(Score::from_share(-1000.0), Score::Suppressed);
        assert_eq!(Score::from_mean(-1000.0), Score::Suppressed);
        assert_eq!(Score::from_share(0.8), Score::Percent(80));
        assert_eq!(Score::from_mean(3.556), Score::Mean(3.56));
    }

    #[test]
    fn rounds_sorted_by_recency() {
        init();
        let t = scores(
            &["target", "eng"],
            &[
                &["Davis:16O", "1"],
                &["Davis:19O", "1"],
                &["Davis:18O", "1"],
                &["Davis:17O", "1"],
            ],
        );
        let s = select_rounds(&t, &t, &t, &meta()).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.current().unwrap().code, "19O");
        assert_eq!(s.get(0).unwrap().label, "October 2019");
        assert_eq!(s.get(1).unwrap().code, "18O");
        assert_eq!(s.get(3).unwrap().code, "16O");
    }

    #[test]
    fn unknown_round_is_an_error() {
        let t = scores(&["target", "eng"], &[&["Davis:20O", "1"]]);
        assert_eq!(
            select_rounds(&t, &t, &t, &meta()),
            Err(SynthesisErrors::UnknownRound {
                code: "20O".to_string()
            })
        );
    }

    #[test]
    fn empty_table_gives_empty_selection() {
        init();
        let t = scores(&["target", "eng"], &[&["Davis:19O", "1"]]);
        let empty = ScoreTable::default();
        let s = select_rounds(&t, &empty, &t, &meta()).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn annotation_drops_unselected_rounds() {
        let t = scores(
            &["target", "eng"],
            &[&["Davis:19O", "3.5"], &["Davis:16O", "3.1"], &["Davis:18O", "3.2"]],
        );
        let a = annotate_rounds(&t, &sel(&["19O", "18O"]));
        assert_eq!(a.rows.len(), 2);
        assert_eq!(a.value(0, "eng"), Some(3.5));
        assert_eq!(a.value(1, "eng"), Some(3.2));
        assert_eq!(a.value(2, "eng"), None);
    }

    #[test]
    fn merge_keeps_longest_selection() {
        let a = sel(&["19O"]);
        let b = sel(&["19O", "18O"]);
        let c = sel(&["19S", "18S"]);
        assert_eq!(merge_round_selections(&[a.clone(), b.clone(), c]), b);
        assert_eq!(merge_round_selections(&[]), RoundSelection::default());
    }

    #[test]
    fn mean_fill_without_prior_round() {
        let s = sel(&["19O"]);
        let set = ScoreSet::annotate(
            &scores(&["target", "eng_hs"], &[&["School1:19O", "3.56"]]),
            &scores(&["target", "eng_hs"], &[&["School1:19O", "63"]]),
            &scores(&["target", "eng_hs"], &[&["School1:19O", "0.7"]]),
            &s,
        );
        let pl = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let t = fill_table(
            district_table(FillMode::Mean, "eng_hs"),
            pl,
            &set,
            WithholdScope::Column,
        );
        let high = Slot::Level(SchoolLevel::High);
        assert_eq!(
            t.cell(0, &Column::Value(high)),
            Some(&Cell::Score {
                score: Score::Mean(3.56),
                quartile: Some(Quartile::Second)
            })
        );
        assert_eq!(
            t.cell(0, &Column::Trend(high)),
            Some(&Cell::Trend(Trend::FLAT))
        );
    }

    #[test]
    fn percent_fill_with_prior_round() {
        let s = sel(&["19O", "18O"]);
        let set = ScoreSet::annotate(
            &scores(&["target", "eng_hs"], &[&["D:19O", "3.5"], &["D:18O", "3.4"]]),
            &scores(&["target", "eng_hs"], &[&["D:19O", "80"], &["D:18O", "70"]]),
            &scores(&["target", "eng_hs"], &[&["D:19O", "0.72"], &["D:18O", "0.76"]]),
            &s,
        );
        let pl = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let t = fill_table(
            district_table(FillMode::PercentPositive, "eng_hs"),
            pl,
            &set,
            WithholdScope::Column,
        );
        let high = Slot::Level(SchoolLevel::High);
        assert_eq!(
            t.cell(0, &Column::Value(high)),
            Some(&Cell::Score {
                score: Score::Percent(72),
                quartile: Some(Quartile::First)
            })
        );
        assert_eq!(
            t.cell(0, &Column::Trend(high)),
            Some(&Cell::Trend(Trend {
                direction: Direction::Decrease,
                difference: Some(Score::Percent(4))
            }))
        );
    }

    #[test]
    fn missing_metric_leaves_key() {
        let s = sel(&["19O"]);
        let set = ScoreSet::annotate(
            &scores(&["target", "other"], &[&["D:19O", "3.5"]]),
            &scores(&["target", "other"], &[&["D:19O", "50"]]),
            &scores(&["target", "other"], &[&["D:19O", "0.5"]]),
            &s,
        );
        let pl = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let t0 = district_table(FillMode::Mean, "eng_hs");
        let t = fill_table(t0.clone(), pl, &set, WithholdScope::Column);
        assert_eq!(t, t0);
    }

    fn school_table() -> MetricTable {
        let level = SchoolLevel::High;
        let mut t = MetricTable::new(
            TableId::AllFactorsPct,
            FillMode::PercentPositive,
            Layout::School(level),
            vec![
                Column::label("Survey Theme"),
                Column::Value(Slot::Group(Stakeholder::Student)),
                Column::Trend(Slot::Group(Stakeholder::Student)),
                Column::Value(Slot::Group(Stakeholder::Family)),
                Column::Trend(Slot::Group(Stakeholder::Family)),
            ],
        );
        t.push_row(vec![
            Cell::Text("Engagement".to_string()),
            Cell::Key("ose_eng".to_string()),
            Cell::Empty,
            Cell::Key("fam_eng".to_string()),
        ]);
        t.push_row(vec![
            Cell::Text("Culture".to_string()),
            Cell::Key("ose_cult".to_string()),
            Cell::Empty,
            Cell::Key("fam_cult".to_string()),
        ]);
        t
    }

    fn family_scores() -> ScoreSet {
        ScoreSet::annotate(
            &scores(&["target", "fam_eng", "fam_cult"], &[&["S:19O", "3.1", "3.3"]]),
            &scores(&["target", "fam_eng", "fam_cult"], &[&["S:19O", "40", "NA"]]),
            &scores(&["target", "fam_eng", "fam_cult"], &[&["S:19O", "0.80", "0.70"]]),
            &sel(&["19O"]),
        )
    }

    fn student_scores() -> ScoreSet {
        ScoreSet::annotate(
            &scores(&["target", "ose_eng", "ose_cult"], &[&["S:19O", "3.1", "3.3"]]),
            &scores(&["target", "ose_eng", "ose_cult"], &[&["S:19O", "40", "90"]]),
            &scores(&["target", "ose_eng", "ose_cult"], &[&["S:19O", "0.55", "0.65"]]),
            &sel(&["19O"]),
        )
    }

    #[test]
    fn missing_percentile_withholds_family_column() {
        init();
        let fam = ProductLevel::new(SurveyProduct::Family, SchoolLevel::High);
        let t = fill_table(school_table(), fam, &family_scores(), WithholdScope::Column);
        let family = Slot::Group(Stakeholder::Family);
        for row in 0..2 {
            assert_eq!(t.cell(row, &Column::Value(family)), Some(&Cell::Withheld));
            assert_eq!(t.cell(row, &Column::Trend(family)), Some(&Cell::Withheld));
        }
        // The student column is untouched.
        assert_eq!(
            t.cell(0, &Column::Value(Slot::Group(Stakeholder::Student))),
            Some(&Cell::Key("ose_eng".to_string()))
        );
    }

    #[test]
    fn missing_percentile_withholds_cell_only() {
        let fam = ProductLevel::new(SurveyProduct::Family, SchoolLevel::High);
        let t = fill_table(school_table(), fam, &family_scores(), WithholdScope::Cell);
        let family = Slot::Group(Stakeholder::Family);
        assert_eq!(
            t.cell(0, &Column::Value(family)),
            Some(&Cell::Score {
                score: Score::Percent(80),
                quartile: Some(Quartile::Third)
            })
        );
        assert_eq!(t.cell(1, &Column::Value(family)), Some(&Cell::Withheld));
    }

    #[test]
    fn filling_commutes_across_product_levels() {
        let fam = ProductLevel::new(SurveyProduct::Family, SchoolLevel::High);
        let ose = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let (fs, ss) = (family_scores(), student_scores());
        let scope = WithholdScope::Column;
        let a = fill_table(fill_table(school_table(), fam, &fs, scope), ose, &ss, scope);
        let b = fill_table(fill_table(school_table(), ose, &ss, scope), fam, &fs, scope);
        assert_eq!(a, b);
    }

    #[test]
    fn school_tables_ignore_other_levels() {
        let ose_ms = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::Middle);
        let t = fill_table(school_table(), ose_ms, &student_scores(), WithholdScope::Column);
        assert_eq!(t, school_table());
    }

    #[test]
    fn bar_chart_series_per_round() {
        let s = sel(&["19O", "18O", "17O"]);
        let pp = annotate_rounds(
            &scores(
                &["target", "eng"],
                &[&["D:19O", "0.8"], &["D:18O", "-1000"], &["D:17O", "0.751"]],
            ),
            &s,
        );
        let pl = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let other = ProductLevel::new(SurveyProduct::Staff, SchoolLevel::High);
        let chart = BarChart {
            name: "eng_theme_bar".to_string(),
            entries: [
                (pl, BarEntry::Pending("eng".to_string())),
                (other, BarEntry::Pending("sta_eng".to_string())),
            ]
            .into_iter()
            .collect(),
        };
        let c = fill_bar_chart(chart, pl, &pp, &s);
        assert_eq!(
            c.entries.get(&pl),
            Some(&BarEntry::Series(vec![Some(80), None, Some(75)]))
        );
        // No column for this key: the entry stays a placeholder.
        let c = fill_bar_chart(c, other, &pp, &s);
        assert_eq!(
            c.entries.get(&other),
            Some(&BarEntry::Pending("sta_eng".to_string()))
        );
    }
}
