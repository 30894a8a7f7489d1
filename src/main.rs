use anyhow::Context as _;
use std::path::PathBuf;
use structopt::StructOpt;
use tabstat::{AnalysisOptions, MissingValues};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tabstat",
    about = "Fits a linear model against a CSV column and prints the dashboard as JSON"
)]
struct Opt {
    /// CSV file with a header row.
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Column to predict (defaults to the first numeric column).
    #[structopt(long)]
    target: Option<String>,

    #[structopt(long, default_value = "42")]
    seed: u64,

    #[structopt(long, default_value = "0.2")]
    test_fraction: f64,

    /// Rows with missing cells are dropped or rejected.
    #[structopt(long, default_value = "drop", possible_values = &["drop", "reject"])]
    missing: String,

    #[structopt(long)]
    parallel: bool,

    /// Only print the numeric columns eligible as a target.
    #[structopt(long)]
    list_columns: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let table = tabstat::load_csv_path(&opt.file)
        .with_context(|| format!("cannot load {}", opt.file.display()))?;

    if opt.list_columns {
        let columns = table.numeric_column_names().collect::<Vec<_>>();
        serde_json::to_writer_pretty(std::io::stdout().lock(), &columns)?;
        println!();
        return Ok(());
    }

    let target = match &opt.target {
        Some(target) => target.as_str(),
        None => table.default_target()?,
    };
    let missing = if opt.missing == "reject" {
        MissingValues::Reject
    } else {
        MissingValues::DropRows
    };

    let analysis = AnalysisOptions::new()
        .seed(opt.seed)
        .test_fraction(opt.test_fraction)
        .missing_values(missing)
        .parallel(opt.parallel)
        .run(&table, target)
        .with_context(|| format!("cannot analyze target column {:?}", target))?;

    serde_json::to_writer_pretty(std::io::stdout().lock(), analysis.dashboard())?;
    println!();
    Ok(())
}
