//! Ithomiini Maps - command line front end
//!
//! CLI commands:
//! - summary: Dataset statistics for the current filters
//! - filter: Apply filters, print counts and legends
//! - values: Dropdown options and visible values for a field
//! - export: Write visible records as GeoJSON or JSON

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ithomiini_maps::color::{self, Palette};
use ithomiini_maps::config::{Config, Env};
use ithomiini_maps::export::{self, ExportFormat};
use ithomiini_maps::filter::{FilterEdit, FilterState, FilterStore};
use ithomiini_maps::records::loader::{self, LoadReport};
use ithomiini_maps::records::{Field, Record};
use ithomiini_maps::view::{self, DerivedView};
use ithomiini_maps::logging;

#[derive(Parser)]
#[command(name = "ithomiini_maps")]
#[command(about = "Filter, summarize and color Ithomiini specimen records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to viewer.yaml config
    #[arg(short, long, default_value = "viewer.yaml")]
    config: PathBuf,

    /// Record document (overrides config and ITHOMIINI_DATA)
    #[arg(short, long)]
    data: Option<PathBuf>,
}

/// Filter selection: a URL query string plus optional edits on top of it
#[derive(clap::Args)]
struct FilterArgs {
    /// URL query string, e.g. "genus=Mechanitis&status=Sequenced"
    #[arg(short, long, default_value = "")]
    query: String,

    /// Set the genus (clears species and subspecies picked in the query)
    #[arg(long)]
    genus: Option<String>,

    /// Case-insensitive CAM id search
    #[arg(long)]
    search: Option<String>,

    /// Earliest observation date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest observation date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dataset statistics for the current filters
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Apply filters and print counts and legends
    Filter {
        #[command(flatten)]
        filters: FilterArgs,

        /// Fields to color by (defaults to the configured one)
        #[arg(long = "color-by")]
        color_by: Vec<String>,

        /// Legend size before "+N more"
        #[arg(long)]
        max_items: Option<usize>,

        /// Also print the map paint expression
        #[arg(long)]
        paint: bool,
    },

    /// Dropdown options and visible values for a field
    Values {
        /// Field name (genus, species, subspecies, mimicry_ring, sequencing_status, source, country)
        field: String,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Write visible records to a file
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(short, long, value_enum, default_value = "geojson")]
        format: ExportFormat,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Field used for the feature color property
        #[arg(long = "color-by")]
        color_by: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let env = Env::load();
    logging::init_logging(&env.log_dir)?;
    tracing::info!("Ithomiini Maps starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = Config::load_or_default(&cli.config)?;
    let data_path = cli.data.clone().unwrap_or_else(|| config.resolve_data_path(&env));
    let report = loader::load_records(&data_path)
        .with_context(|| format!("loading records from {:?}", data_path))?;

    match cli.command {
        Commands::Summary { filters } => {
            let store = filter_store(filters);
            let view = view::build(&report.records, store.state(), &config.view_spec());
            print_summary(&report, &view);
        }

        Commands::Filter { filters, color_by, max_items, paint } => {
            let store = filter_store(filters);
            let color_by = if color_by.is_empty() { vec![config.color_by.clone()] } else { color_by };
            let max_items = max_items.unwrap_or(config.legend.max_items);
            run_filter(&config, &report.records, &store, &color_by, max_items, paint)?;
        }

        Commands::Values { field, filters } => {
            let field: Field = field.parse()?;
            let store = filter_store(filters);
            let view = view::build(&report.records, store.state(), &config.view_spec());
            println!("Options for {} ({} across all records):", field, view.options(field).len());
            for value in view.options(field) {
                println!("  - {}", value);
            }
            println!();
            println!("Visible {} ({} after filters):", field, view.visible(field).len());
            for value in view.visible(field) {
                println!("  - {}", value);
            }
        }

        Commands::Export { filters, format, output, color_by } => {
            let store = filter_store(filters);
            let view = view::build(&report.records, store.state(), &config.view_spec());
            let field = color_by.unwrap_or_else(|| config.color_by.clone());
            let colors = colors_for(&view, &field, &config.palette);
            let written = export::write_export(&output, format, &view, &colors)?;
            println!("Wrote {} of {} records to {:?}", written, view.total_count, output);
        }
    }

    Ok(())
}

/// Hydrate from the query string, then apply command-line edits
fn filter_store(args: FilterArgs) -> FilterStore {
    let mut store = FilterStore::new(FilterState::from_query(&args.query));
    if let Some(genus) = args.genus {
        store.edit(FilterEdit::Genus(Some(genus)));
    }
    if let Some(search) = args.search {
        store.edit(FilterEdit::CamidSearch(Some(search)));
    }
    if let Some(from) = args.from {
        store.edit(FilterEdit::DateStart(Some(from)));
    }
    if let Some(to) = args.to {
        store.edit(FilterEdit::DateEnd(Some(to)));
    }
    tracing::debug!(
        version = store.version(),
        active = store.state().active_count(),
        "Filters ready"
    );
    store
}

/// Colors for the visible values of a field named in config or on the CLI
fn colors_for(view: &DerivedView<'_>, field: &str, palette: &Palette) -> color::ColorMap {
    match field.parse::<Field>() {
        Ok(f) => color::assign_colors(view.color_values(f), f, palette),
        Err(_) => color::assign_colors_by_name(std::iter::empty(), field, palette),
    }
}

fn run_filter(
    config: &Config,
    records: &[Record],
    store: &FilterStore,
    color_by: &[String],
    max_items: usize,
    paint: bool,
) -> anyhow::Result<()> {
    let view = view::build(records, store.state(), &config.view_spec());
    println!("Showing {} of {} records", view.count, view.total_count);
    let active = store.state().active_count();
    if active > 0 {
        println!("Active filters: {} (share: ?{})", active, store.state().to_query());
    }

    for field in color_by {
        let colors = colors_for(&view, field, &config.palette);
        let legend = color::build_legend(&colors, max_items);

        println!();
        println!("Legend: {}", field);
        if legend.entries.is_empty() {
            println!("  (empty)");
        }
        for entry in &legend.entries {
            println!("  {:<24} {}", entry.color, entry.label);
        }
        if let Some(more) = legend.more_label() {
            println!("  {}", more);
        }
        if paint {
            println!("Paint: {}", serde_json::to_string(&colors.paint_expression())?);
        }
    }

    Ok(())
}

fn print_summary(report: &LoadReport, view: &DerivedView<'_>) {
    println!("Total Records: {}", view.total_count);
    if report.skipped > 0 || report.duplicates > 0 {
        println!("Skipped: {} malformed, {} duplicate ids", report.skipped, report.duplicates);
    }
    println!("Visible Records: {}", view.count);
    println!("Unique Species: {}", view.summary.scientific_names);
    println!("Unique Genera: {}", view.summary.genera);
    println!("Unique Mimicry Rings: {}", view.summary.mimicry_rings);
    println!("Records with Images: {}", view.summary.with_images);

    println!();
    println!("By Source:");
    for (source, count) in &view.summary.by_source {
        println!("  {:<24} {}", source, count);
    }

    println!();
    println!("By Sequencing Status:");
    for (status, count) in &view.summary.by_status {
        println!("  {:<24} {}", status, count);
    }
}
