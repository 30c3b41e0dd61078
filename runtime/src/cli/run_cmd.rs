//! `lotmap run`: fetch every region, thin the markers, write map and CSV.

use crate::acquisition::{build_source, SourceKind};
use crate::cli::output::{self, Styled};
use crate::cli::progress;
use crate::config::{PipelineConfig, RegionTable};
use crate::export;
use crate::model::FacilityCategory;
use crate::pipeline::{Pipeline, PipelineRun};
use crate::reduction::Reducer;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Which record set goes to the CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportSet {
    /// Every extracted facility.
    Full,
    /// Only the representatives shown on the map.
    Reduced,
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Upstream service to query.
    #[arg(long, value_enum, default_value_t = SourceKind::Overpass)]
    pub source: SourceKind,

    /// Facility category (defaults to charging for the nrel source).
    #[arg(long, value_enum)]
    pub category: Option<FacilityCategory>,

    /// Region table JSON (default: ~/.lotmap/regions.json or built-in cities).
    #[arg(long)]
    pub regions: Option<PathBuf>,

    /// Output directory for the map and CSV.
    #[arg(long, default_value = "lotmap-output")]
    pub out: PathBuf,

    /// Records written to the CSV file.
    #[arg(long, value_enum, default_value_t = ExportSet::Full)]
    pub export: ExportSet,

    /// Seconds to wait between consecutive region queries.
    #[arg(long, default_value_t = 5)]
    pub delay_secs: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 180)]
    pub timeout_secs: u64,

    /// Seed for k-means initialization.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl RunArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        let category = self.category.unwrap_or(match self.source {
            SourceKind::Nrel => FacilityCategory::Charging,
            SourceKind::Overpass => FacilityCategory::Parking,
        });
        PipelineConfig {
            category,
            request_delay: Duration::from_secs(self.delay_secs),
            request_timeout: Duration::from_secs(self.timeout_secs),
            seed: self.seed,
            ..PipelineConfig::default()
        }
    }
}

/// Run the pipeline command.
pub async fn run(args: RunArgs) -> Result<()> {
    let s = Styled::new();
    let start = Instant::now();

    let table = RegionTable::load(args.regions.as_deref()).context("failed to load region table")?;
    table.validate()?;

    let config = args.pipeline_config();
    let source = build_source(args.source, &config)?;
    let attribute_keys: Vec<&'static str> = source.attribute_keys().to_vec();

    if !output::is_quiet() && !output::is_json() {
        output::print_header(&s);
        eprintln!(
            "  Fetching {} for {} region(s) from {}",
            config.category.slug().replace('_', " "),
            table.regions.len(),
            source.name()
        );
        eprintln!();
    }

    let bar = progress::create_spinner("Starting...");
    let pipeline = Pipeline::new(source, config.request_delay, Reducer::new(config.seed, config.restarts))
        .with_progress(progress::region_hook(bar.clone()));
    let result = pipeline.run(&table).await;
    bar.finish_and_clear();
    let run = result?;

    if run.is_empty() {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "status": "no_data",
                "regions": table.regions.len(),
            }));
        } else if !output::is_quiet() {
            eprintln!();
            eprintln!("  {} No facilities found in any region.", s.warn_sym());
        }
        return Ok(());
    }

    let slug = config.category.slug();
    let map_path = args.out.join(format!("{slug}_map.html"));
    let csv_path = args.out.join(format!("{slug}_data.csv"));

    let title = format!("{} map", config.category.slug().replace('_', " "));
    export::write_map(&map_path, &run.markers, &attribute_keys, &title)
        .with_context(|| format!("failed to write {}", map_path.display()))?;

    let rows = match args.export {
        ExportSet::Full => &run.records[..],
        ExportSet::Reduced => &run.markers.markers[..],
    };
    export::csv::write_records(&csv_path, rows, &attribute_keys)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    if output::is_json() {
        print_run_json(&run, &map_path, &csv_path, start.elapsed());
    } else if !output::is_quiet() {
        print_run_summary(&s, &run, &map_path, &csv_path, start.elapsed());
    }

    Ok(())
}

fn print_run_summary(s: &Styled, run: &PipelineRun, map_path: &Path, csv_path: &Path, elapsed: Duration) {
    eprintln!();
    eprintln!("  Done in {}", output::format_duration(elapsed.as_secs_f64()));
    eprintln!();
    eprintln!("  {}", s.bold(&format!("{:<24} {:>10} {:>8}", "Region", "Facilities", "Markers")));

    let markers = run.markers.counts_by_group();
    for (key, found) in &run.region_counts {
        let shown = markers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        eprintln!("  {:<24} {found:>10} {shown:>8}", key.to_string());
    }
    eprintln!(
        "  {:<24} {:>10} {:>8}",
        "Total",
        run.records.len(),
        run.markers.len()
    );
    eprintln!();
    eprintln!("  {} Map  {}", s.ok_sym(), s.green(&map_path.display().to_string()));
    eprintln!("  {} Data {}", s.ok_sym(), s.green(&csv_path.display().to_string()));

    if output::is_verbose() {
        let failed: Vec<String> = run
            .region_counts
            .iter()
            .filter(|(_, n)| *n == 0)
            .map(|(k, _)| k.to_string())
            .collect();
        if !failed.is_empty() {
            eprintln!();
            eprintln!("  {}", s.dim(&format!("No data for: {}", failed.join("; "))));
        }
    }
}

fn print_run_json(run: &PipelineRun, map_path: &Path, csv_path: &Path, elapsed: Duration) {
    let markers = run.markers.counts_by_group();
    let regions: Vec<serde_json::Value> = run
        .region_counts
        .iter()
        .map(|(key, found)| {
            let shown = markers
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            serde_json::json!({
                "region": key.region,
                "sub_region": key.sub_region,
                "facilities": found,
                "markers": shown,
            })
        })
        .collect();

    output::print_json(&serde_json::json!({
        "status": "ok",
        "facilities": run.records.len(),
        "markers": run.markers.len(),
        "regions": regions,
        "map": map_path.display().to_string(),
        "data": csv_path.display().to_string(),
        "duration_ms": elapsed.as_millis(),
        "generated_at": chrono::Utc::now().to_rfc3339(),
    }));
}
