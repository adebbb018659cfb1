use clap::Parser;

/// Builds the synthesis reports of a client: district, multilevel and school reports.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (directory) The directory of the client, with one sub-directory per product level (OSE_HS, FAM_ES, ...).
    /// The name of the directory is the name of the client.
    #[clap(short, long, value_parser)]
    pub client_dir: String,

    /// (round code, e.g. 19O) The round being reported on.
    #[clap(short = 'r', long, value_parser)]
    pub current_round: String,

    /// (directory, optional) Where to write the reports. Defaults to the client directory.
    #[clap(short, long, value_parser)]
    pub out_dir: Option<String>,

    /// Marks the output file as a test run (`.TESTING` suffix).
    #[clap(short, long, takes_value = false)]
    pub testing: bool,

    /// Only builds the district-scoped reports.
    #[clap(short, long, takes_value = false)]
    pub district_report_only: bool,

    /// (file path, optional) The multilevel groups, in JSON format. Defaults to multi_dict.json in the client directory.
    #[clap(short, long, value_parser)]
    pub multi_dict: Option<String>,

    /// (file path, optional) The report template, in JSON format. Defaults to data/synthesis_report_vars.json,
    /// two levels above the client directory.
    #[clap(long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the expected reports in JSON format. If provided, synthrep will
    /// check that the output matches the reference.
    #[clap(long, value_parser)]
    pub reference: Option<String>,

    /// (default csv) The format of the tables: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default column) What is withheld when a percent-positive metric has no percentile: column or cell.
    #[clap(long, value_parser)]
    pub withhold_scope: Option<String>,

    /// (number, optional) The maximum number of rounds shown in the charts, current round included.
    #[clap(long, value_parser)]
    pub max_rounds: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
