use anyhow::{Context as _, Result};
use attrclean::cleaning::{AttributeCatalog, EmptyColumnPolicy, clean_tables};
use attrclean::config::CleaningConfig;
use attrclean::io::{load_df, load_df_with_separator, save_df};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "attrclean",
    version,
    about = "Attribute-driven cleaning of population and customer tables"
)]
pub struct Cli {
    /// Directory for log files. Defaults to the platform data directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean a reference and a customer table against the attribute metadata
    Clean(CleanArgs),
    /// Print the attribute catalog parsed from a metadata table as JSON
    Catalog {
        /// Metadata table with Attribute, Value and Meaning columns
        #[arg(short, long)]
        metadata: PathBuf,
    },
}

#[derive(Args)]
pub struct CleanArgs {
    /// Reference (general population) table
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Customer table
    #[arg(short, long)]
    pub customer: PathBuf,

    /// Metadata table with Attribute, Value and Meaning columns
    #[arg(short, long)]
    pub metadata: PathBuf,

    /// Path to a JSON cleaning configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where the cleaned tables are written
    #[arg(short, long, default_value = "cleaned")]
    pub output_dir: PathBuf,

    /// Largest share of nulls a column may have in either table
    #[arg(long)]
    pub column_null_threshold: Option<f64>,

    /// Largest number of nulls a row may have
    #[arg(long)]
    pub row_null_threshold: Option<u32>,

    /// Keep columns the metadata does not describe
    #[arg(long)]
    pub keep_unknown_columns: bool,

    /// What to do with numeric columns that have no values left
    #[arg(long, value_enum)]
    pub empty_column_policy: Option<EmptyColumnPolicy>,

    /// Field separator of the reference and customer CSV files
    #[arg(long, default_value = ",", value_parser = parse_separator)]
    pub separator: u8,

    /// Write the cleaning report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn parse_separator(raw: &str) -> std::result::Result<u8, String> {
    match raw.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("separator must be a single ASCII character, got '{raw}'")),
    }
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Catalog { metadata } => handle_catalog(&metadata),
    }
}

/// The config file (or defaults) with command-line flags applied on top.
fn effective_config(args: &CleanArgs) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => {
            println!("Loading config from {}...", path.display());
            CleaningConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => CleaningConfig::default(),
    };

    if let Some(threshold) = args.column_null_threshold {
        config.column_null_threshold = threshold;
    }
    if let Some(threshold) = args.row_null_threshold {
        config.row_null_threshold = threshold;
    }
    if args.keep_unknown_columns {
        config.drop_unknown_columns = false;
    }
    if let Some(policy) = args.empty_column_policy {
        config.empty_column_policy = policy;
    }

    config.validate().context("Invalid cleaning configuration")?;
    Ok(config)
}

fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "table".to_owned(), |s| s.to_string_lossy().into_owned());
    output_dir.join(format!("{stem}_clean.csv"))
}

fn handle_clean(args: &CleanArgs) -> Result<()> {
    let config = effective_config(args)?;

    println!("Loading {}...", args.reference.display());
    let reference = load_df_with_separator(&args.reference, args.separator)
        .context("Failed to load reference table")?;
    println!("Loading {}...", args.customer.display());
    let customer = load_df_with_separator(&args.customer, args.separator)
        .context("Failed to load customer table")?;
    let metadata = load_df(&args.metadata).context("Failed to load metadata table")?;

    let mut cleaned = clean_tables(&reference, &customer, &metadata, &config)
        .context("Cleaning failed")?;

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!("Failed to create output directory {}", args.output_dir.display())
    })?;
    let reference_out = output_path(&args.output_dir, &args.reference);
    let customer_out = output_path(&args.output_dir, &args.customer);
    save_df(&mut cleaned.reference, &reference_out)?;
    save_df(&mut cleaned.customer, &customer_out)?;
    println!("Saved {}", reference_out.display());
    println!("Saved {}", customer_out.display());

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&cleaned.report)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        println!("Report written to {}", report_path.display());
    }

    println!("{}", cleaned.report.summary());
    Ok(())
}

fn handle_catalog(metadata: &Path) -> Result<()> {
    let frame = load_df(metadata).context("Failed to load metadata table")?;
    let catalog = AttributeCatalog::from_frame(&frame, &CleaningConfig::default().catalog_options())?;
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() -> Result<()> {
        let cli = Cli::try_parse_from([
            "attrclean",
            "clean",
            "-r",
            "azdias.csv",
            "-c",
            "customers.csv",
            "-m",
            "attributes.csv",
            "--row-null-threshold",
            "10",
            "--keep-unknown-columns",
            "--empty-column-policy",
            "drop",
            "--separator",
            ";",
        ])?;
        let Commands::Clean(args) = cli.command else {
            panic!("expected the clean subcommand");
        };

        assert_eq!(args.separator, b';');
        let config = effective_config(&args)?;
        assert_eq!(config.row_null_threshold, 10);
        assert!(!config.drop_unknown_columns);
        assert_eq!(config.empty_column_policy, EmptyColumnPolicy::Drop);
        assert!((config.column_null_threshold - 0.3).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_invalid_threshold_flag() -> Result<()> {
        let cli = Cli::try_parse_from([
            "attrclean",
            "clean",
            "-r",
            "a.csv",
            "-c",
            "b.csv",
            "-m",
            "m.csv",
            "--column-null-threshold",
            "2",
        ])?;
        let Commands::Clean(args) = cli.command else {
            panic!("expected the clean subcommand");
        };
        assert!(effective_config(&args).is_err());
        Ok(())
    }

    #[test]
    fn test_output_path_uses_input_stem() {
        let path = output_path(Path::new("out"), Path::new("data/azdias.csv"));
        assert_eq!(path, Path::new("out").join("azdias_clean.csv"));
    }
}
