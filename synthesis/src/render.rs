// HTML rendering of the report tables and assembly of the reports.

use log::debug;

use crate::config::*;

/// The legend explaining the quartile colours, embedded verbatim in every report.
pub const COLOUR_KEY: &str = "<table align='center'; class='reporttable skinny'> <thead>  <tr style=\"font-weight:bold\"><th col width=\"80\">Color Key</th></tr></thead><tbody> <tr class='odd'> \
<td><span style =\"color:#e62e00;font-weight:bold\">0th-24th<br> percentile</span></td>\
<td><span style =\"color:#f67b33;font-weight:bold\">25th-49th<br> percentile</span></td> \
<td><span style =\"color:#2e9fd0;font-weight:bold\">50th-74th<br> percentile</span></td> \
<td><span style =\"color:#0D47A1;font-weight:bold\">75th-100th<br> percentile</span></td></tr></tbody></table>";

const TABLE_HEADER: &str = "<table class=\"reporttable\">  <thead>    <tr style=\"color: rgb(102, 102, 102); background-color: rgb(255, 187, 128); font-weight: normal\">";
const MUTED_NA: &str = "<td style=\"color: #808080;font-size:11px\">N/A</td>";

pub const CATEGORIES: [&str; 3] = ["Student", "Family", "Staff"];

pub fn quartile_colour(q: Quartile) -> &'static str {
    match q {
        Quartile::First => "#0D47A1",
        Quartile::Second => "#2e9fd0",
        Quartile::Third => "#f67b33",
        Quartile::Fourth => "#e62e00",
    }
}

pub fn trend_arrow(direction: Direction) -> &'static str {
    match direction {
        Direction::Increase => "&#8593",
        Direction::Decrease => "&#8595",
        Direction::Flat => "&nbsp;",
    }
}

// Floats keep one decimal when they are whole: 3.0, 3.5, 3.56.
fn format_float(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// The display text of a score. Suppressed scores read N/A.
pub fn format_score(score: &Score) -> String {
    match score {
        Score::Mean(v) => format_float(*v),
        Score::Percent(p) => format!("{}%", p),
        Score::Suppressed => "N/A".to_string(),
    }
}

/// Colours a value according to its quartile. Values without quartile stay plain.
pub fn format_number(value: &str, quartile: Option<Quartile>) -> String {
    match quartile {
        Some(q) => format!(
            "<span style =\"text-align:left; color:{};font-weight:bold\">{}</span>",
            quartile_colour(q),
            value
        ),
        None => value.to_string(),
    }
}

/// Escapes the html special characters and drops the characters outside of ASCII.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out
}

fn render_trend(trend: &Trend) -> String {
    let difference = match trend.difference {
        Some(Score::Mean(v)) => format_float(v),
        Some(Score::Percent(p)) => p.to_string(),
        _ => String::new(),
    };
    format!(
        "<td style=\"color: #808080;font-size:11px\">{}&nbsp;{}</td>",
        trend_arrow(trend.direction),
        difference
    )
}

fn render_header(column: &Column) -> String {
    match column {
        Column::Trend(_) => "<th col width=\"40\"></th>".to_string(),
        Column::Value(_) => format!(
            "<th style=\"text-align:right\">{}</th>",
            sanitize(&column.header())
        ),
        Column::Label(s) => format!("<th col width=\"190\">{}</th>", sanitize(s)),
    }
}

fn render_cell(column: &Column, cell: &Cell) -> String {
    match (column, cell) {
        (_, Cell::Score {
            score: Score::Suppressed,
            ..
        }) => MUTED_NA.to_string(),
        (_, Cell::Score { score, quartile }) => format!(
            "<td style=\"text-align:left\">{}</td>",
            format_number(&format_score(score), *quartile)
        ),
        (_, Cell::Trend(t)) => render_trend(t),
        (_, Cell::Withheld) => MUTED_NA.to_string(),
        // Unfilled trend cells have no arrow.
        (Column::Trend(_), _) => render_trend(&Trend::FLAT),
        (Column::Value(_), _) => MUTED_NA.to_string(),
        (_, Cell::Text(s)) => format!("<td>{}</td>", sanitize(s)),
        (_, Cell::Empty) => "<td></td>".to_string(),
        (_, Cell::Key(_)) | (_, Cell::NotAvailable) => MUTED_NA.to_string(),
    }
}

/// Renders a table to the html fragment embedded in the reports.
///
/// Rendering is pure: the same table always gives the same fragment.
pub fn render_table(table: &MetricTable) -> String {
    let headers: Vec<String> = table.columns.iter().map(render_header).collect();
    let mut parts: Vec<String> = vec![
        TABLE_HEADER.to_string(),
        format!("{} </tr>  </thead>  <tbody> ", headers.join(" ")),
    ];
    for (idx, row) in table.rows.iter().enumerate() {
        let class = if idx % 2 == 0 { "odd" } else { "even" };
        let cells: Vec<String> = table
            .columns
            .iter()
            .zip(row.iter())
            .map(|(c, cell)| render_cell(c, cell))
            .collect();
        parts.push(format!("<tr class=\"{}\">", class));
        parts.push(format!("{} </tr>", cells.join(" ")));
    }
    parts.push("</tbody></table>".to_string());
    parts.join(" ")
}

/// Builds the segmentations of a bar chart: one per school level, each with one
/// series per selected round holding the student, family and staff values.
pub fn bar_chart_element(
    chart: &BarChart,
    selection: &RoundSelection,
    levels: &[SchoolLevel],
) -> BarChartElement {
    let segmentations = levels
        .iter()
        .map(|level| {
            let series = selection
                .iter()
                .map(|(idx, round)| SeriesData {
                    name: format!("{} - {}", level.name(), round.label),
                    data: Stakeholder::ALL
                        .iter()
                        .map(|g| match chart.entries.get(&ProductLevel::for_group(*g, *level)) {
                            Some(BarEntry::Series(v)) => v.get(idx).cloned().flatten(),
                            _ => None,
                        })
                        .collect(),
                })
                .collect();
            Segmentation {
                name: level.name().to_string(),
                series,
            }
        })
        .collect();
    BarChartElement {
        categories: CATEGORIES.iter().map(|s| s.to_string()).collect(),
        segmentations,
    }
}

/// The filled tables and charts of one report, before assembly.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportContent {
    pub tables: Vec<MetricTable>,
    /// The rendered response rate fragment.
    pub response_rates: String,
    pub bars: Vec<BarChart>,
    pub total_responses: u64,
}

pub fn report_title(name: &str, selection: &RoundSelection) -> String {
    match selection.current() {
        Some(r) => format!("{} - Synthesis Report - {}", name, r.label),
        None => format!("{} - Synthesis Report", name),
    }
}

/// Assembles a report from its content.
///
/// District reports show every school level in their charts. School reports only
/// show the levels of their charts, and drop the charts without data.
pub fn assemble_report(
    name: &str,
    scope: Scope,
    selection: &RoundSelection,
    content: &ReportContent,
) -> Report {
    let mut substitutions: Vec<(String, String)> = content
        .tables
        .iter()
        .map(|t| (t.id.key(), render_table(t)))
        .collect();
    substitutions.push((
        "response_rates".to_string(),
        content.response_rates.clone(),
    ));
    substitutions.push(("colour_key".to_string(), COLOUR_KEY.to_string()));
    substitutions.push(("client_name".to_string(), name.to_string()));
    substitutions.push((
        "total_responses".to_string(),
        content.total_responses.to_string(),
    ));
    substitutions.push(("school_district".to_string(), scope.tag().to_string()));

    let mut bars = Vec::new();
    for chart in content.bars.iter() {
        let levels: Vec<SchoolLevel> = match scope {
            Scope::District => SchoolLevel::ALL.to_vec(),
            Scope::School => {
                if !chart.is_filled() {
                    debug!("assemble_report: {}: dropping empty chart {}", name, chart.name);
                    continue;
                }
                let mut l: Vec<SchoolLevel> = chart.entries.keys().map(|pl| pl.level).collect();
                l.sort();
                l.dedup();
                l
            }
        };
        bars.push((
            chart.name.clone(),
            bar_chart_element(chart, selection, &levels),
        ));
    }

    Report {
        name: name.to_string(),
        title: report_title(name, selection),
        scope,
        total_responses: content.total_responses,
        substitutions,
        bars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounds() -> RoundSelection {
        RoundSelection::new(vec![
            Round {
                code: "19O".to_string(),
                label: "October 2019".to_string(),
            },
            Round {
                code: "18O".to_string(),
                label: "October 2018".to_string(),
            },
        ])
    }

    fn high() -> Slot {
        Slot::Level(SchoolLevel::High)
    }

    fn table() -> MetricTable {
        let mut t = MetricTable::new(
            TableId::EngagementTheme,
            FillMode::PercentPositive,
            Layout::District,
            vec![Column::label("Group"), Column::Value(high()), Column::Trend(high())],
        );
        t.push_row(vec![
            Cell::Text("Student".to_string()),
            Cell::Score {
                score: Score::Percent(72),
                quartile: Some(Quartile::Second),
            },
            Cell::Trend(Trend {
                direction: Direction::Increase,
                difference: Some(Score::Percent(4)),
            }),
        ]);
        t.push_row(vec![
            Cell::Text("Family".to_string()),
            Cell::Score {
                score: Score::Suppressed,
                quartile: Some(Quartile::Fourth),
            },
            Cell::Trend(Trend::FLAT),
        ]);
        t.push_row(vec![
            Cell::Text("Staff".to_string()),
            Cell::Key("sta_eng".to_string()),
        ]);
        t.push_row(vec![
            Cell::Text("Student".to_string()),
            Cell::Withheld,
            Cell::Withheld,
        ]);
        t
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number("13", None), "13");
        assert_eq!(
            format_number("13", Some(Quartile::Second)),
            "<span style =\"text-align:left; color:#2e9fd0;font-weight:bold\">13</span>"
        );
        assert_eq!(format_score(&Score::Mean(3.0)), "3.0");
        assert_eq!(format_score(&Score::Mean(3.56)), "3.56");
        assert_eq!(format_score(&Score::Percent(80)), "80%");
    }

    #[test]
    fn arrows() {
        assert_eq!(trend_arrow(Direction::Increase), "&#8593");
        assert_eq!(trend_arrow(Direction::Decrease), "&#8595");
        assert_eq!(trend_arrow(Direction::Flat), "&nbsp;");
    }

    #[test]
    fn sanitized_text() {
        assert_eq!(sanitize("Belonging & Peer <b>"), "Belonging &amp; Peer &lt;b&gt;");
        assert_eq!(sanitize("Caf\u{e9} Lyc\u{e9}e"), "Caf Lyce");
    }

    #[test]
    fn table_rendering() {
        let html = render_table(&table());
        assert!(html.starts_with(TABLE_HEADER));
        assert!(html.contains(
            "<th col width=\"190\">Group</th> <th style=\"text-align:right\">High</th> <th col width=\"40\"></th> </tr>  </thead>  <tbody> "
        ));
        assert!(html.contains(
            "<tr class=\"odd\"> <td>Student</td> <td style=\"text-align:left\"><span style =\"text-align:left; color:#2e9fd0;font-weight:bold\">72%</span></td> <td style=\"color: #808080;font-size:11px\">&#8593&nbsp;4</td> </tr>"
        ));
        // Suppressed scores and unfilled keys read N/A, unfilled trends are blank.
        assert!(html.contains(&format!(
            "<tr class=\"even\"> <td>Family</td> {} <td style=\"color: #808080;font-size:11px\">&nbsp;&nbsp;</td> </tr>",
            MUTED_NA
        )));
        assert!(html.contains(&format!(
            "<tr class=\"odd\"> <td>Staff</td> {} <td style=\"color: #808080;font-size:11px\">&nbsp;&nbsp;</td> </tr>",
            MUTED_NA
        )));
        // Withheld metrics read N/A in both columns.
        assert!(html.contains(&format!(
            "<tr class=\"even\"> <td>Student</td> {} {} </tr>",
            MUTED_NA, MUTED_NA
        )));
        assert!(html.ends_with("</tbody></table>"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let t = table();
        assert_eq!(render_table(&t), render_table(&t));
    }

    #[test]
    fn bar_series_are_padded() {
        let ose = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let fam = ProductLevel::new(SurveyProduct::Family, SchoolLevel::High);
        let chart = BarChart {
            name: "eng_theme_bar".to_string(),
            entries: [
                (ose, BarEntry::Series(vec![Some(80), Some(75)])),
                (fam, BarEntry::Series(vec![Some(60)])),
            ]
            .into_iter()
            .collect(),
        };
        let el = bar_chart_element(&chart, &rounds(), &[SchoolLevel::High]);
        assert_eq!(el.categories, vec!["Student", "Family", "Staff"]);
        assert_eq!(el.segmentations.len(), 1);
        let seg = &el.segmentations[0];
        assert_eq!(seg.name, "High");
        assert_eq!(seg.series[0].name, "High - October 2019");
        assert_eq!(seg.series[0].data, vec![Some(80), Some(60), None]);
        assert_eq!(seg.series[1].data, vec![Some(75), None, None]);
    }

    #[test]
    fn school_reports_drop_empty_charts() {
        let ose = ProductLevel::new(SurveyProduct::Overall, SchoolLevel::High);
        let content = ReportContent {
            tables: vec![table()],
            response_rates: "<b>Total</b>".to_string(),
            bars: vec![
                BarChart {
                    name: "eng_theme_bar".to_string(),
                    entries: [(ose, BarEntry::Series(vec![Some(80)]))].into_iter().collect(),
                },
                BarChart {
                    name: "rel_theme_bar".to_string(),
                    entries: [(ose, BarEntry::Pending("rel".to_string()))]
                        .into_iter()
                        .collect(),
                },
            ],
            total_responses: 42,
        };
        let r = assemble_report("Lincoln High", Scope::School, &rounds(), &content);
        assert_eq!(r.title, "Lincoln High - Synthesis Report - October 2019");
        assert_eq!(r.bars.len(), 1);
        assert_eq!(r.bars[0].1.segmentations.len(), 1);
        let keys: Vec<&str> = r.substitutions.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "eng_theme",
                "response_rates",
                "colour_key",
                "client_name",
                "total_responses",
                "school_district"
            ]
        );
        assert_eq!(r.substitutions[4].1, "42");
        assert_eq!(r.substitutions[5].1, "school");

        let d = assemble_report("Davis", Scope::District, &RoundSelection::default(), &content);
        assert_eq!(d.title, "Davis - Synthesis Report");
        assert_eq!(d.bars.len(), 2);
        assert_eq!(d.bars[1].1.segmentations.len(), 3);
    }
}
