//! Dataset Workbench CLI
//!
//! Command-line tool for browsing, filtering and editing flat-file datasets
//! and for producing the data behind the canned chart views.

use clap::{Parser, Subcommand};
use dw_core::{
    add_record, filter_eq, update_record, views, DatasetStore, Record, Table,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dw-cli")]
#[command(about = "Dataset Workbench", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory containing the dataset files
    #[arg(short, long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable datasets in the data directory
    List,

    /// Show a dataset, optionally projected to chosen columns and rows
    Show {
        /// Dataset name (file stem, e.g. "companies")
        dataset: String,

        /// Columns to keep (comma-separated, output in this order)
        #[arg(short, long)]
        columns: Option<String>,

        /// Rows to keep: a range like 0-9 or indices like 0,2,5
        #[arg(short, long)]
        rows: Option<String>,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the rows where a column equals a value
    Filter {
        /// Dataset name
        dataset: String,

        /// Column to filter by
        #[arg(short, long)]
        column: String,

        /// Value to match
        #[arg(short, long)]
        value: String,
    },

    /// Export a dataset to a file; the format follows the output extension
    /// (.csv, .xlsx or .json)
    Export {
        /// Dataset name
        dataset: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Append a record to a dataset and save it
    Add {
        /// Dataset name
        dataset: String,

        /// Field values as column=value (repeatable)
        #[arg(short, long)]
        set: Vec<String>,
    },

    /// Update the first record matching a key and save the dataset
    Update {
        /// Dataset name
        dataset: String,

        /// Primary-key column used to locate the record
        #[arg(short = 'k', long)]
        key_column: String,

        /// Key value identifying the record
        #[arg(short = 'v', long)]
        key_value: String,

        /// Fields to overwrite as column=value; blank values leave the
        /// field unchanged (repeatable)
        #[arg(short, long)]
        set: Vec<String>,
    },

    /// List the industries available for the prizes histogram
    Industries,

    /// Prize counts per company within an industry
    Prizes {
        /// Industry to filter by
        #[arg(short, long)]
        industry: String,
    },

    /// Coordinate pairs for a scatter plot over two company columns
    Scatter {
        /// Column for the x axis
        #[arg(short, long)]
        x: String,

        /// Column for the y axis
        #[arg(short, long)]
        y: String,
    },

    /// Funding events for one company, ordered by date
    Funding {
        /// Company to chart
        #[arg(short, long)]
        company: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> dw_core::Result<()> {
    let cli = Cli::parse();
    let mut store = DatasetStore::new(cli.data_dir);

    match cli.command {
        Commands::List => cmd_list(&store),
        Commands::Show {
            dataset,
            columns,
            rows,
            limit,
        } => cmd_show(&mut store, &dataset, columns, rows, limit),
        Commands::Filter {
            dataset,
            column,
            value,
        } => cmd_filter(&mut store, &dataset, &column, &value),
        Commands::Export { dataset, output } => cmd_export(&mut store, &dataset, &output),
        Commands::Add { dataset, set } => cmd_add(&mut store, &dataset, &set),
        Commands::Update {
            dataset,
            key_column,
            key_value,
            set,
        } => cmd_update(&mut store, &dataset, &key_column, &key_value, &set),
        Commands::Industries => cmd_industries(&mut store),
        Commands::Prizes { industry } => cmd_prizes(&mut store, &industry),
        Commands::Scatter { x, y } => cmd_scatter(&mut store, &x, &y),
        Commands::Funding { company } => cmd_funding(&mut store, &company),
    }
}

fn cmd_list(store: &DatasetStore) -> dw_core::Result<()> {
    let datasets = store.list()?;

    println!("Datasets in {} ({}):", store.data_dir().display(), datasets.len());
    for dataset in &datasets {
        println!("  {} ({:?}, {})", dataset.name, dataset.format, dataset.path.display());
    }

    Ok(())
}

fn cmd_show(
    store: &mut DatasetStore,
    dataset_name: &str,
    columns: Option<String>,
    rows: Option<String>,
    limit: Option<usize>,
) -> dw_core::Result<()> {
    let dataset = store.dataset(dataset_name)?;

    let column_filter: Option<Vec<String>> = columns
        .as_ref()
        .map(|c| c.split(',').map(|s| s.trim().to_string()).collect());
    let row_filter: Option<Vec<usize>> = rows.as_deref().map(parse_row_spec);

    let table = store.load(&dataset, row_filter.as_deref(), column_filter.as_deref())?;
    print_table(&table, limit);

    Ok(())
}

fn cmd_filter(
    store: &mut DatasetStore,
    dataset_name: &str,
    column: &str,
    value: &str,
) -> dw_core::Result<()> {
    let dataset = store.dataset(dataset_name)?;
    let table = store.load(&dataset, None, None)?;

    let filtered = filter_eq(&table, column, value)?;
    println!("{} of {} rows where {} = {}", filtered.row_count(), table.row_count(), column, value);
    print_table(&filtered, None);

    Ok(())
}

fn cmd_export(
    store: &mut DatasetStore,
    dataset_name: &str,
    output: &PathBuf,
) -> dw_core::Result<()> {
    let dataset = store.dataset(dataset_name)?;
    let table = store.load(&dataset, None, None)?;

    if output.extension().is_some_and(|ext| ext == "json") {
        let file = File::create(output)?;
        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string_pretty(&table)?;
        writeln!(writer, "{}", json)?;
    } else {
        let target = dw_core::DatasetRef::from_path(output)?;
        store.save(&target, &table)?;
    }

    println!("Exported {} rows to {}", table.row_count(), output.display());

    Ok(())
}

fn cmd_add(store: &mut DatasetStore, dataset_name: &str, set: &[String]) -> dw_core::Result<()> {
    let dataset = store.dataset(dataset_name)?;
    let table = store.load(&dataset, None, None)?;

    let record = parse_record(set);
    let updated = add_record(&table, &record)?;
    store.save(&dataset, &updated)?;

    println!("Record added to '{}' ({} rows)", dataset.name, updated.row_count());

    Ok(())
}

fn cmd_update(
    store: &mut DatasetStore,
    dataset_name: &str,
    key_column: &str,
    key_value: &str,
    set: &[String],
) -> dw_core::Result<()> {
    let dataset = store.dataset(dataset_name)?;
    let table = store.load(&dataset, None, None)?;

    let record = parse_record(set);
    let updated = update_record(&table, key_column, key_value, &record)?;
    store.save(&dataset, &updated)?;

    println!("Record updated in '{}' where {} = {}", dataset.name, key_column, key_value);

    Ok(())
}

fn cmd_industries(store: &mut DatasetStore) -> dw_core::Result<()> {
    for industry in views::industries(store)? {
        println!("{}", industry);
    }
    Ok(())
}

fn cmd_prizes(store: &mut DatasetStore, industry: &str) -> dw_core::Result<()> {
    let counts = views::prizes_by_industry(store, industry)?;

    println!("Prizes won in '{}':", industry);
    for (company, count) in counts {
        println!("  {}\t{}", company, count);
    }

    Ok(())
}

fn cmd_scatter(store: &mut DatasetStore, x: &str, y: &str) -> dw_core::Result<()> {
    let points = views::scatter_points(store, x, y)?;

    println!("{}\t{}", x, y);
    for (px, py) in points {
        println!("{}\t{}", px, py);
    }

    Ok(())
}

fn cmd_funding(store: &mut DatasetStore, company: &str) -> dw_core::Result<()> {
    let series = views::funding_over_time(store, company)?;

    println!("Funding over time for '{}':", company);
    for (date, value) in series {
        println!("{}\t{}", date, value);
    }

    Ok(())
}

/// Parse repeated column=value arguments into a record
fn parse_record(set: &[String]) -> Record {
    let mut record = Record::new();

    for entry in set {
        match entry.split_once('=') {
            Some((column, value)) => {
                record.insert(column.trim().to_string(), value.to_string());
            }
            None => {
                eprintln!("Warning: ignoring '{}', expected column=value", entry);
            }
        }
    }

    record
}

/// Parse a row spec: "0-9" expands to that inclusive range, otherwise a
/// comma-separated list of indices
fn parse_row_spec(spec: &str) -> Vec<usize> {
    if let Some((start, end)) = spec.split_once('-') {
        if let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>()) {
            if start <= end {
                return (start..=end).collect();
            }
        }
    }

    spec.split(',')
        .filter_map(|part| {
            let part = part.trim();
            match part.parse::<usize>() {
                Ok(idx) => Some(idx),
                Err(_) => {
                    eprintln!("Warning: ignoring row index '{}'", part);
                    None
                }
            }
        })
        .collect()
}

/// Print a table as tab-separated columns with a header rule
fn print_table(table: &Table, limit: Option<usize>) {
    let header = table.column_names();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }
}
