use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sheetplot::compiler::build_grouped_charts;
use sheetplot::config::ChartConfig;
use sheetplot::data::{CellValue, SheetGrid};
use sheetplot::graph::CanvasSurface;
use sheetplot::header::{groups_by_header_level, load_worksheet};
use sheetplot::layout::project_sheet;
use sheetplot::logging::{init_logging, LogConfig, LogFormat};
use sheetplot::parser::{parse_edit_command, parse_merge_range, EditCommand};
use sheetplot::reconcile::RenderSurface;
use sheetplot::session::ChartSession;
use sheetplot::surface::MemorySurface;
use sheetplot::OutputFormat;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Chart descriptor as JSON
    Json,
    Png,
    Svg,
    /// Raw layout projection for a spreadsheet widget
    Layout,
}

#[derive(Parser, Debug)]
#[command(name = "sheetplot")]
#[command(about = "Build box-plot and scatter charts from spreadsheet data", long_about = None)]
struct Args {
    /// Input file (CSV, or a JSON grid with --json). Reads stdin when omitted.
    input: Option<PathBuf>,

    /// Sheet name used in logs and the layout projection
    #[arg(long, default_value = "Sheet1")]
    sheet_name: String,

    /// Input is a JSON array of rows
    #[arg(long)]
    json: bool,

    /// Merge range to attach to the grid, e.g. A1:C1
    #[arg(long = "merge", value_name = "RANGE")]
    merges: Vec<String>,

    /// One chart per header group instead of a single chart
    #[arg(long)]
    grouped: bool,

    /// Cell edit to commit after the first render, e.g. B4=42
    #[arg(long = "edit", value_name = "CELL=VALUE")]
    edits: Vec<String>,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// JSON chart configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn read_grid(args: &Args) -> Result<SheetGrid> {
    let mut input = Vec::new();
    match &args.input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?
                .read_to_end(&mut input)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .lock()
                .read_to_end(&mut input)
                .context("Failed to read stdin")?;
        }
    }

    let grid = if args.json {
        let value: serde_json::Value = serde_json::from_slice(&input).context("Failed to parse JSON grid")?;
        SheetGrid::from_json(&args.sheet_name, &value)?
    } else {
        SheetGrid::from_csv_reader(&args.sheet_name, input.as_slice())?
    };

    let merges = args
        .merges
        .iter()
        .map(|m| parse_merge_range(m))
        .collect::<Result<Vec<_>>>()?;

    Ok(grid.with_merges(merges))
}

fn write_stdout(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(bytes).context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

fn write_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    text.push('\n');
    write_stdout(text.as_bytes())
}

/// Render once, then commit each edit through the session
fn run_session<S: RenderSurface>(
    grid: SheetGrid,
    surface: S,
    config: &ChartConfig,
    edits: &[EditCommand],
) -> Result<ChartSession<S>> {
    let mut session = ChartSession::open(grid, surface, config)?;
    for edit in edits {
        let outcome = session
            .commit_edit(edit.cell.row, edit.cell.col, &edit.value)
            .with_context(|| format!("Failed to apply edit {}={}", sheetplot::parser::encode_cell(edit.cell), edit.value))?;
        info!(row = edit.cell.row, col = edit.cell.col, ?outcome, "committed edit");
    }
    Ok(session)
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ChartConfig::load(path)?,
        None => ChartConfig::default(),
    };

    let edits = args
        .edits
        .iter()
        .map(|e| parse_edit_command(e))
        .collect::<Result<Vec<_>>>()?;

    let mut grid = read_grid(&args)?;

    if args.format == Format::Layout {
        for edit in &edits {
            grid.set_cell(edit.cell.row, edit.cell.col, CellValue::from_text(&edit.value));
        }
        return write_json(&project_sheet(&grid));
    }

    if args.grouped {
        if !edits.is_empty() {
            bail!("--edit is only supported for single charts");
        }
        if args.format != Format::Json {
            bail!("grouped charts can only be written as json");
        }
        let worksheet = load_worksheet(&grid, &config.header_separator);
        let groups = groups_by_header_level(&worksheet, &config.header_separator);
        let charts = build_grouped_charts(&worksheet, &groups, &config.sanitize_rules());
        if charts.is_empty() {
            bail!("No chartable data found");
        }
        return write_json(&charts);
    }

    match args.format {
        Format::Png | Format::Svg => {
            let mut options = config.render.clone();
            options.format = if args.format == Format::Svg { OutputFormat::Svg } else { OutputFormat::Png };

            let session = run_session(grid, CanvasSurface::new(options), &config, &edits)?;
            let frame = session.surface().frame().context("No chartable data found")?;
            write_stdout(frame)
        }
        _ => {
            let session = run_session(grid, MemorySurface::default(), &config, &edits)?;
            let chart = session.chart().context("No chartable data found")?;
            write_json(&chart)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_config = LogConfig::from_verbosity(args.verbose).with_format(args.log_format);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: {:#}", e);
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
