use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use synthesis::builder::Builder;
use synthesis::*;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

pub use crate::synth::io_common::TableKind;
pub use crate::synth::io_csv::CsvSource;
pub use crate::synth::io_xlsx::XlsxSource;

use crate::synth::io_common::TableSource;

#[derive(Debug, Snafu)]
pub enum SynthError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No data in the first worksheet of {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error reading {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the reports"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error listing directory {path}"))]
    ReadingDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing table {path} for product level {product_level}"))]
    MissingTable { path: String, product_level: String },
    #[snafu(display("Invalid data for product level {product_level}: {source}"))]
    Pipeline {
        source: SynthesisErrors,
        product_level: String,
    },
    #[snafu(display("Invalid report template {path}: {source}"))]
    Template {
        source: SynthesisErrors,
        path: String,
    },
    #[snafu(display("Unknown input type {name:?} (expected csv or xlsx)"))]
    UnknownInputType { name: String },
    #[snafu(display("Unknown withholding scope {name:?} (expected column or cell)"))]
    UnknownWithholdScope { name: String },
    #[snafu(display("No product level directory found in {path}"))]
    NoProductLevels { path: String },
    #[snafu(display("No school found for client {client} in round {round}"))]
    NoSchools { client: String, round: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SynthResult<T> = Result<T, SynthError>;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Csv,
    Xlsx,
}

/// The validated settings of a run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub client_dir: PathBuf,
    pub current_round: String,
    pub out_dir: Option<PathBuf>,
    pub testing: bool,
    pub district_report_only: bool,
    pub multi_dict: PathBuf,
    pub template: PathBuf,
    pub reference: Option<PathBuf>,
    pub input: InputType,
    pub withhold: WithholdScope,
    pub max_rounds: Option<usize>,
}

impl RunSettings {
    pub fn new(client_dir: &Path, current_round: &str) -> RunSettings {
        RunSettings {
            client_dir: client_dir.to_path_buf(),
            current_round: current_round.to_string(),
            out_dir: None,
            testing: false,
            district_report_only: false,
            multi_dict: client_dir.join("multi_dict.json"),
            template: client_dir
                .join("..")
                .join("..")
                .join("data")
                .join("synthesis_report_vars.json"),
            reference: None,
            input: InputType::Csv,
            withhold: WithholdScope::Column,
            max_rounds: None,
        }
    }

    pub fn from_args(args: &Args) -> SynthResult<RunSettings> {
        let mut s = RunSettings::new(Path::new(&args.client_dir), &args.current_round);
        s.out_dir = args.out_dir.as_ref().map(PathBuf::from);
        s.testing = args.testing;
        s.district_report_only = args.district_report_only;
        if let Some(p) = &args.multi_dict {
            s.multi_dict = PathBuf::from(p);
        }
        if let Some(p) = &args.config {
            s.template = PathBuf::from(p);
        }
        s.reference = args.reference.as_ref().map(PathBuf::from);
        s.input = match args.input_type.as_deref() {
            None | Some("csv") => InputType::Csv,
            Some("xlsx") => InputType::Xlsx,
            Some(x) => return UnknownInputTypeSnafu { name: x }.fail(),
        };
        s.withhold = match args.withhold_scope.as_deref() {
            None | Some("column") => WithholdScope::Column,
            Some("cell") => WithholdScope::Cell,
            Some(x) => return UnknownWithholdScopeSnafu { name: x }.fail(),
        };
        s.max_rounds = args.max_rounds;
        Ok(s)
    }

    pub fn output_path(&self, client: &str) -> PathBuf {
        let dir = self.out_dir.clone().unwrap_or_else(|| self.client_dir.clone());
        let suffix = if self.testing { ".TESTING" } else { "" };
        dir.join(format!("Synthesis Report_{}{}.json", client, suffix))
    }
}

// Whose scores are read from the shared tables.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Entity<'a> {
    /// The client, with several schools.
    Client(&'a str),
    /// The client has a single school: its rows stand for the client.
    OnlySchool(&'a str),
    School(&'a str),
}

fn by_entity(t: &RawTable, entity: &str) -> RawTable {
    t.filter(|r| r.get("target").map(target_entity) == Some(entity))
}

fn with_type(t: &RawTable, tpe: &str) -> RawTable {
    t.filter(|r| r.get("type") == Some(tpe))
}

// The scores of one product level for one entity.
struct LevelScores {
    selection: RoundSelection,
    scores: ScoreSet,
}

// The filled content of a district-scoped report, and what the school reports
// need from it.
struct Aggregate {
    tables: Vec<MetricTable>,
    bars: Vec<BarChart>,
    rates: Vec<ResponseRateTable>,
    selection: RoundSelection,
    schools: BTreeMap<ProductLevel, Vec<String>>,
    names: BTreeMap<String, String>,
}

impl Aggregate {
    fn content(&self) -> ReportContent {
        let summary = summarize_groups(&self.rates);
        ReportContent {
            tables: self.tables.clone(),
            response_rates: render_response_rates(&summary, &self.rates),
            bars: self.bars.clone(),
            total_responses: summary.total_responses(),
        }
    }

    fn school_name(&self, school: &str) -> String {
        self.names
            .get(school)
            .cloned()
            .unwrap_or_else(|| school.to_string())
    }

    // The product levels of every school, in order.
    fn levels_by_school(&self) -> BTreeMap<String, Vec<ProductLevel>> {
        let mut res: BTreeMap<String, Vec<ProductLevel>> = BTreeMap::new();
        for (pl, schools) in self.schools.iter() {
            for s in schools {
                res.entry(s.clone()).or_default().push(*pl);
            }
        }
        res
    }
}

struct Synthesis<'a> {
    settings: &'a RunSettings,
    client: String,
    template: ReportTemplate,
    source: Box<dyn TableSource>,
}

impl<'a> Synthesis<'a> {
    fn read(&self, pl: ProductLevel, kind: TableKind, name: &str) -> SynthResult<RawTable> {
        io_common::read_table(self.source.as_ref(), &self.settings.client_dir, pl, kind, name)
    }

    fn school_meta(&self, pl: ProductLevel) -> SynthResult<Vec<SchoolMeta>> {
        let raw = self.read(pl, TableKind::Data, "schoolMeta")?;
        SchoolMeta::from_table(&raw).context(PipelineSnafu {
            product_level: pl.to_string(),
        })
    }

    // The schools of the client in the current round, or the members of a
    // multilevel group.
    fn schools_for(&self, meta: &[SchoolMeta], members: Option<&BTreeSet<String>>) -> Vec<String> {
        let round = self.settings.current_round.as_str();
        let selected: Vec<&SchoolMeta> = match members {
            Some(m) => meta.iter().filter(|s| m.contains(&s.school_id)).collect(),
            None => {
                let by_client: Vec<&SchoolMeta> = meta
                    .iter()
                    .filter(|s| s.client_name == self.client && s.round == round)
                    .collect();
                if by_client.is_empty() {
                    meta.iter()
                        .filter(|s| s.school_id == self.client && s.round == round)
                        .collect()
                } else {
                    by_client
                }
            }
        };
        let mut res: Vec<String> = Vec::new();
        for s in selected {
            if !res.contains(&s.school_id) {
                res.push(s.school_id.clone());
            }
        }
        res
    }

    fn load_scores(&self, pl: ProductLevel, entity: Entity) -> SynthResult<LevelScores> {
        let pipeline = || PipelineSnafu {
            product_level: pl.to_string(),
        };
        let all_mean = self.read(pl, TableKind::Agg, "allmean")?;
        let high_prop = self.read(pl, TableKind::Agg, "highprop")?;
        let (mean, percent_positive, name) = match entity {
            Entity::Client(c) => (
                by_entity(&all_mean, c),
                with_type(&by_entity(&high_prop, c), "district"),
                c,
            ),
            Entity::OnlySchool(s) => (
                all_mean.filter(|r| r.get("genTarget") == Some(s)),
                by_entity(&high_prop, s),
                s,
            ),
            Entity::School(s) => (
                by_entity(&all_mean, s),
                with_type(&by_entity(&high_prop, s), "school"),
                s,
            ),
        };
        let pct = io_common::read_percentiles(
            self.source.as_ref(),
            &self.settings.client_dir,
            pl,
            name,
        )?;
        let percentile = by_entity(&pct, name);
        debug!(
            "load_scores: {} {:?}: {} mean rows, {} percentile rows, {} percent positive rows",
            pl,
            entity,
            mean.len(),
            percentile.len(),
            percent_positive.len()
        );

        let mean = ScoreTable::from_raw(&mean, "target").context(pipeline())?;
        let percentile = ScoreTable::from_raw(&percentile, "target").context(pipeline())?;
        let percent_positive =
            ScoreTable::from_raw(&percent_positive, "target").context(pipeline())?;
        let round_meta = RoundMeta::from_table(&self.read(pl, TableKind::Data, "roundMeta")?)
            .context(pipeline())?;
        let mut selection =
            select_rounds(&mean, &percentile, &percent_positive, &round_meta).context(pipeline())?;
        if let Some(n) = self.settings.max_rounds {
            selection = selection.truncated(n);
        }
        let scores = ScoreSet::annotate(&mean, &percentile, &percent_positive, &selection);
        Ok(LevelScores { selection, scores })
    }

    /// Fills the district-scoped tables over the given product levels. With
    /// members, only these schools are considered (multilevel groups).
    fn aggregate(
        &self,
        levels: &[ProductLevel],
        members: Option<&BTreeSet<String>>,
    ) -> SynthResult<Aggregate> {
        let builder = Builder::new(&self.template);
        let mut tables = builder.district_tables();
        let mut bars = builder.district_bars();
        let mut rates: Vec<ResponseRateTable> = Vec::new();
        let mut selections: Vec<RoundSelection> = Vec::new();
        let mut schools: BTreeMap<ProductLevel, Vec<String>> = BTreeMap::new();
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        for pl in levels.iter().cloned() {
            let group = match pl.stakeholder() {
                Some(g) => g,
                None => {
                    debug!("aggregate: skipping {}", pl);
                    continue;
                }
            };
            info!("Processing product level {}", pl);
            let meta = self.school_meta(pl)?;
            for m in meta.iter().filter(|m| !m.school_name.is_empty()) {
                names
                    .entry(m.school_id.clone())
                    .or_insert_with(|| m.school_name.clone());
            }
            let list = self.schools_for(&meta, members);
            if list.is_empty() {
                ensure!(
                    members.is_some(),
                    NoSchoolsSnafu {
                        client: self.client.clone(),
                        round: self.settings.current_round.clone(),
                    }
                );
                warn!("aggregate: {}: no member school, skipping", pl);
                continue;
            }
            let entity = if list.len() == 1 {
                Entity::OnlySchool(&list[0])
            } else {
                Entity::Client(&self.client)
            };
            let level_scores = self.load_scores(pl, entity)?;
            tables = fill_tables(tables, pl, &level_scores.scores, self.settings.withhold);
            bars = fill_bar_charts(
                bars,
                pl,
                &level_scores.scores.percent_positive,
                &level_scores.selection,
            );
            match level_scores.selection.current() {
                Some(current) => {
                    let counts =
                        ResponseCount::from_table(&self.read(pl, TableKind::Agg, "allcount")?)
                            .context(PipelineSnafu {
                                product_level: pl.to_string(),
                            })?;
                    rates.push(build_response_rates(
                        pl, group, &list, &counts, &meta, current,
                    ));
                }
                None => warn!("aggregate: {}: no round selected, no response rates", pl),
            }
            selections.push(level_scores.selection);
            schools.insert(pl, list);
        }
        Ok(Aggregate {
            tables,
            bars,
            rates,
            selection: merge_round_selections(&selections),
            schools,
            names,
        })
    }

    fn school_report(
        &self,
        school: &str,
        levels: &[ProductLevel],
        agg: &Aggregate,
    ) -> SynthResult<Option<Report>> {
        let level = match levels.first() {
            Some(pl) => pl.level,
            None => return Ok(None),
        };
        let builder = Builder::new(&self.template);
        let mut tables = builder.school_tables(level);
        let mut bars = builder.school_bars(level);
        let mut selections: Vec<RoundSelection> = Vec::new();
        for pl in levels.iter().cloned() {
            if pl.level != level {
                debug!("school_report: {}: ignoring {}", school, pl);
                continue;
            }
            let level_scores = self.load_scores(pl, Entity::School(school))?;
            tables = fill_tables(tables, pl, &level_scores.scores, self.settings.withhold);
            bars = fill_bar_charts(
                bars,
                pl,
                &level_scores.scores.percent_positive,
                &level_scores.selection,
            );
            selections.push(level_scores.selection);
        }
        let mut selection = merge_round_selections(&selections);
        if selection.is_empty() {
            selection = agg.selection.clone();
        }
        let summary = summarize_school(&agg.rates, school);
        let content = ReportContent {
            tables,
            response_rates: render_table(&summary.to_metric_table()),
            bars,
            total_responses: summary.total_responses(),
        };
        let name = agg.school_name(school);
        info!("Assembling the report of school {} ({})", name, school);
        Ok(Some(assemble_report(&name, Scope::School, &selection, &content)))
    }

    fn build_reports(&self, levels: &[ProductLevel]) -> SynthResult<Vec<Report>> {
        let mut reports: Vec<Report> = Vec::new();
        let agg = self.aggregate(levels, None)?;

        let distinct: BTreeSet<&String> = agg.schools.values().flatten().collect();
        if distinct.len() > 2 {
            info!("Assembling the district report of {}", self.client);
            reports.push(assemble_report(
                &self.client,
                Scope::District,
                &agg.selection,
                &agg.content(),
            ));
        } else {
            warn!(
                "{} has {} school(s): no district report",
                self.client,
                distinct.len()
            );
        }

        let by_school = agg.levels_by_school();
        let mut absorbed: BTreeSet<String> = BTreeSet::new();
        let groups: BTreeMap<String, Vec<String>> =
            match config_reader::read_multi_dict(&self.settings.multi_dict) {
                Ok(Some(g)) => g,
                Ok(None) => {
                    warn!(
                        "No multilevel groups: {:?} not found",
                        self.settings.multi_dict
                    );
                    BTreeMap::new()
                }
                Err(e @ (SynthError::OpeningJson { .. } | SynthError::ParsingJson { .. })) => {
                    warn!("No multilevel groups: {}", e);
                    BTreeMap::new()
                }
                Err(e) => return Err(e),
            };
        for (combined, member_names) in groups {
            let mut members: BTreeSet<String> = BTreeSet::new();
            for n in member_names.iter() {
                match agg.names.iter().find(|(_, name)| *name == n) {
                    Some((id, _)) => {
                        members.insert(id.clone());
                    }
                    None => warn!("Multilevel group {}: unknown school {:?}", combined, n),
                }
            }
            if members.len() < 2 {
                warn!(
                    "Multilevel group {}: fewer than two known schools, skipping",
                    combined
                );
                continue;
            }
            let mut ml_levels: Vec<ProductLevel> = members
                .iter()
                .flat_map(|m| by_school.get(m).cloned().unwrap_or_default())
                .collect();
            ml_levels.sort();
            ml_levels.dedup();
            let ml = self.aggregate(&ml_levels, Some(&members))?;
            info!("Assembling the multilevel report {}", combined);
            reports.push(assemble_report(
                &combined,
                Scope::District,
                &ml.selection,
                &ml.content(),
            ));
            absorbed.extend(members);
        }

        if self.settings.district_report_only {
            info!("District report only: no school report");
            return Ok(reports);
        }
        for (school, school_levels) in by_school.iter() {
            if absorbed.contains(school) {
                debug!("build_reports: {} is part of a multilevel report", school);
                continue;
            }
            if let Some(r) = self.school_report(school, school_levels, &agg)? {
                reports.push(r);
            }
        }
        Ok(reports)
    }
}

fn bar_to_json(bar: &BarChartElement) -> JSValue {
    let segmentations: Vec<JSValue> = bar
        .segmentations
        .iter()
        .map(|seg| {
            let series: Vec<JSValue> = seg
                .series
                .iter()
                .map(|s| {
                    let data: Vec<JSValue> = s
                        .data
                        .iter()
                        .map(|v| match v {
                            Some(x) => json!(x),
                            None => json!("N/A"),
                        })
                        .collect();
                    json!({"name": s.name, "data": data})
                })
                .collect();
            json!({"name": seg.name, "series": series})
        })
        .collect();
    json!({
        "type": "toggledBarChart",
        "dataType": "percent",
        "categories": bar.categories,
        "current": [],
        "comparative": [],
        "past-results": [],
        "cohort": [],
        "segmentations": segmentations
    })
}

fn report_to_json(report: &Report) -> JSValue {
    let mut substitutions: JSMap<String, JSValue> = JSMap::new();
    for (k, v) in report.substitutions.iter() {
        substitutions.insert(k.clone(), json!(v));
    }
    let mut elements: JSMap<String, JSValue> = JSMap::new();
    elements.insert(
        "tables".to_string(),
        json!({"type": "textElement", "substitutions": substitutions}),
    );
    for (name, bar) in report.bars.iter() {
        elements.insert(name.clone(), bar_to_json(bar));
    }
    json!({
        "name": "Batch Title",
        "title": report.title,
        "elements": elements
    })
}

pub fn build_document(reports: &[Report]) -> JSValue {
    let l: Vec<JSValue> = reports.iter().map(report_to_json).collect();
    json!({"version": "2.0", "reports": l})
}

/// Builds and writes all the reports of a client. Returns the written document.
pub fn run_synthesis(settings: &RunSettings) -> SynthResult<JSValue> {
    info!("settings: {:?}", settings);
    let client = io_common::client_name(&settings.client_dir)?;
    let template = config_reader::read_template(&settings.template)?;
    let levels = io_common::discover_product_levels(&settings.client_dir)?;
    ensure!(
        !levels.is_empty(),
        NoProductLevelsSnafu {
            path: settings.client_dir.display().to_string(),
        }
    );
    info!(
        "Client {}: product levels {:?}",
        client,
        levels.iter().map(|pl| pl.to_string()).collect::<Vec<_>>()
    );

    let synth = Synthesis {
        settings,
        client: client.clone(),
        template,
        source: io_common::source_for(settings.input),
    };
    let reports = synth.build_reports(&levels)?;
    let doc = build_document(&reports);

    let pretty_js = serde_json::to_string_pretty(&doc).context(SerializingJsonSnafu {})?;
    let out = settings.output_path(&client);
    fs::write(&out, pretty_js.as_bytes()).context(WritingOutputSnafu {
        path: out.display().to_string(),
    })?;
    info!("Wrote {} report(s) to {:?}", reports.len(), out);

    // The reference document, if provided for comparison
    if let Some(ref_p) = &settings.reference {
        let reference = config_reader::read_summary(ref_p)?;
        let pretty_js_ref =
            serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference document");
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            whatever!("Difference detected between the reports and the reference document")
        }
    }
    Ok(doc)
}
