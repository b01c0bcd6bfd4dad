use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use hazard_timeline::{
    is_credible, score_submission, BearingPolicy, CatalogSpec, CredibilityParams, EngineParams,
    HazardCatalog, HazardCategory, HazardEvent, LifecycleStatus, ProjectedHazard,
    ReportSubmission, StatusClass, StatusFilter, Timeline, TimelineQuery, TimelineWindow,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_SWEEP_FRAMES: usize = 1_000_000;
const FORECAST_STREAM: u64 = 1;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hazard timeline and forecast CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a demo catalog of coastal hazard reports as JSON
    Generate(GenerateArgs),
    /// Project the catalog (plus forecasts) at a cursor tick
    Project(ProjectArgs),
    /// List hotspots among the reports visible at a tick
    Hotspots(HotspotArgs),
    /// Print the live feed of active reports at a tick
    Feed(FeedArgs),
    /// Sweep the cursor across the timeline and tabulate statuses per tick
    Play(PlayArgs),
    /// Score citizen report submissions for credibility
    Score(ScoreArgs),
}

#[derive(Args, Debug)]
struct CatalogArgs {
    /// Catalog JSON (generated from --seed when omitted)
    #[arg(long, value_hint = ValueHint::FilePath)]
    catalog: Option<PathBuf>,

    /// Seed for catalog generation and forecast draws
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of reports in a generated catalog
    #[arg(long, default_value_t = 150)]
    events: usize,
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Ticks spanned by the timeline
    #[arg(long, default_value_t = 150.0)]
    total_ticks: f64,

    /// Observation instant (RFC 3339); defaults to now
    #[arg(long)]
    observed_at: Option<String>,

    /// Days of history before the observation day
    #[arg(long, default_value_t = 2)]
    days_before: i64,

    /// Days spanned by the timeline
    #[arg(long, default_value_t = 7)]
    span_days: i64,

    /// Prediction boundary tick (overrides the observation instant)
    #[arg(long)]
    boundary: Option<f64>,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Engine parameter JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// Hotspot radius (km)
    #[arg(long)]
    hotspot_radius: Option<f64>,

    /// Forecast displacement from the hotspot seed (km)
    #[arg(long)]
    prediction_offset: Option<f64>,

    /// Maximum number of forecasts
    #[arg(long)]
    max_predictions: Option<usize>,

    /// Forecast bearing policy
    #[arg(long, value_enum)]
    bearing: Option<BearingOpt>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Hazard categories to include (comma separated, or `all`)
    #[arg(long, default_value = "all")]
    categories: String,

    /// Status classes to include (active,resolved)
    #[arg(long, default_value = "active,resolved")]
    status: String,

    /// Hide forecast events
    #[arg(long, action = ArgAction::SetTrue)]
    no_predictions: bool,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Output JSON path (`-` for stdout)
    #[arg(short, long, default_value = "catalog.json", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Seed for catalog generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of reports
    #[arg(long, default_value_t = 150)]
    events: usize,
}

#[derive(Parser, Debug)]
struct ProjectArgs {
    /// Cursor tick
    #[arg(long)]
    tick: f64,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Also write the projection as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    window: WindowArgs,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Parser, Debug)]
struct HotspotArgs {
    /// Cursor tick; reports at or before it are considered
    #[arg(long)]
    tick: f64,

    /// Hazard categories to include (comma separated, or `all`)
    #[arg(long, default_value = "all")]
    categories: String,

    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Parser, Debug)]
struct FeedArgs {
    /// Cursor tick
    #[arg(long)]
    tick: f64,

    /// Maximum entries
    #[arg(long, default_value_t = 20)]
    limit: usize,

    /// Hazard categories to include (comma separated, or `all`)
    #[arg(long, default_value = "all")]
    categories: String,

    #[command(flatten)]
    catalog: CatalogArgs,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// First tick of the sweep
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// Last tick of the sweep (defaults to the end of the timeline)
    #[arg(long)]
    to: Option<f64>,

    /// Cursor advance per step
    #[arg(long, default_value_t = 1.0)]
    step: f64,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(flatten)]
    window: WindowArgs,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Parser, Debug)]
struct ScoreArgs {
    /// JSON array of report submissions
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Credibility parameter JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// Scoring instant (RFC 3339); defaults to now
    #[arg(long)]
    now: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BearingOpt {
    Random,
    AwayFromCentroid,
}

impl From<BearingOpt> for BearingPolicy {
    fn from(value: BearingOpt) -> Self {
        match value {
            BearingOpt::Random => BearingPolicy::Random,
            BearingOpt::AwayFromCentroid => BearingPolicy::AwayFromCentroid,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let profile = cli.profile || cli.verbose;
    match cli.command {
        Command::Generate(args) => handle_generate(args),
        Command::Project(args) => handle_project(args, profile),
        Command::Hotspots(args) => handle_hotspots(args),
        Command::Feed(args) => handle_feed(args),
        Command::Play(args) => handle_play(args, profile),
        Command::Score(args) => handle_score(args),
    }
}

fn handle_generate(args: GenerateArgs) -> Result<()> {
    let spec = CatalogSpec {
        total_events: args.events,
        ..CatalogSpec::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let catalog = HazardCatalog::generate(&spec, &mut rng)?;
    let text = catalog.to_json_pretty()?;
    if args.output.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(text.as_bytes())?;
        handle.write_all(b"\n")?;
    } else {
        fs::write(&args.output, text)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
        info!(
            "Wrote catalog: {} ({} reports, seed {})",
            args.output.display(),
            catalog.len(),
            args.seed
        );
    }
    Ok(())
}

fn handle_project(args: ProjectArgs, profile: bool) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let params = load_engine_params(&args.engine)?;
    let (boundary, total_ticks, window) = resolve_boundary(&args.window)?;
    validate_tick(args.tick, total_ticks)?;
    let query = build_query(args.tick, &args.filters)?;

    let timeline = Timeline::with_boundary(&catalog, &params, boundary, total_ticks)?;
    let t_forecast = Instant::now();
    let predicted = if query.show_predictions {
        let mut rng = forecast_rng(args.catalog.seed);
        timeline.forecast(&query.categories, &mut rng)?
    } else {
        Vec::new()
    };
    if profile {
        info!(
            "Forecast stage: {:.1} ms ({} predictions)",
            t_forecast.elapsed().as_secs_f64() * 1000.0,
            predicted.len()
        );
    }

    let rows = timeline.project(&query, &predicted);
    let when = window
        .as_ref()
        .map(|w| w.datetime_at(args.tick).to_rfc3339())
        .unwrap_or_else(|| "n/a".into());
    info!(
        "Tick {} ({}): {} visible, boundary {:.2}",
        args.tick,
        when,
        rows.len(),
        boundary
    );
    log_status_summary(&rows);

    if args.output.as_os_str() == "-" {
        write_projection_stdout(&rows)?;
    } else {
        write_projection_csv(&rows, &args.output)?;
        info!("Wrote projection CSV: {}", args.output.display());
    }

    if let Some(path) = args.json.as_ref() {
        let text = serde_json::to_string_pretty(&rows)?;
        fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote projection JSON: {}", path.display());
    }
    Ok(())
}

fn handle_hotspots(args: HotspotArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let params = load_engine_params(&args.engine)?;
    if !args.tick.is_finite() || args.tick < 0.0 {
        return Err(anyhow!("--tick must be a finite value >= 0"));
    }
    let categories = parse_categories(&args.categories)?;
    let visible = catalog.filtered(&categories, args.tick);
    let hotspots = hazard_timeline::detect(&visible, params.hotspot_radius_km);
    info!(
        "{} hotspots among {} reports at tick {} (radius {} km)",
        hotspots.len(),
        visible.len(),
        args.tick,
        params.hotspot_radius_km
    );

    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    writer.write_record([
        "seed_id",
        "category",
        "neighbors",
        "lat",
        "lng",
        "centroid_lat",
        "centroid_lng",
    ])?;
    for hotspot in &hotspots {
        writer.write_record([
            hotspot.seed.id.clone(),
            hotspot.seed.category.key().to_string(),
            hotspot.neighbor_count.to_string(),
            format!("{:.5}", hotspot.seed.position.lat),
            format!("{:.5}", hotspot.seed.position.lng),
            format!("{:.5}", hotspot.neighbor_centroid.lat),
            format!("{:.5}", hotspot.neighbor_centroid.lng),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn handle_feed(args: FeedArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    if !args.tick.is_finite() || args.tick < 0.0 {
        return Err(anyhow!("--tick must be a finite value >= 0"));
    }
    let categories = parse_categories(&args.categories)?;
    let feed = catalog.feed(args.tick, &categories, args.limit);
    if feed.is_empty() {
        info!("No active reports at tick {}", args.tick);
    }
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for event in feed {
        writeln!(
            handle,
            "[t={:>6.1}] {:<16} sev {} ({:.4}, {:.4}) {}",
            event.occurs_at,
            event.title,
            event.severity,
            event.position.lat,
            event.position.lng,
            event.description
        )?;
    }
    Ok(())
}

fn handle_play(args: PlayArgs, profile: bool) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let params = load_engine_params(&args.engine)?;
    let (boundary, total_ticks, _) = resolve_boundary(&args.window)?;
    let to = args.to.unwrap_or(total_ticks);
    validate_tick(args.from, total_ticks)?;
    validate_tick(to, total_ticks)?;
    if !args.step.is_finite() || args.step <= 0.0 {
        return Err(anyhow!("--step must be > 0"));
    }
    let base = build_query(args.from, &args.filters)?;

    let timeline = Timeline::with_boundary(&catalog, &params, boundary, total_ticks)?;
    let predicted = if base.show_predictions {
        let mut rng = forecast_rng(args.catalog.seed);
        timeline.forecast(&base.categories, &mut rng)?
    } else {
        Vec::new()
    };

    let ticks = sweep_ticks(args.from, to, args.step)?;
    let t_sweep = Instant::now();
    let frames: Vec<(f64, StatusCounts)> = ticks
        .par_iter()
        .map(|&tick| {
            let query = TimelineQuery {
                cutoff_tick: tick,
                ..base.clone()
            };
            (tick, StatusCounts::tally(&timeline.project(&query, &predicted)))
        })
        .collect();
    if profile {
        info!(
            "Sweep stage: {:.1} ms ({} ticks)",
            t_sweep.elapsed().as_secs_f64() * 1000.0,
            frames.len()
        );
    }

    let write_rows = |writer: &mut csv::Writer<Box<dyn Write>>| -> Result<()> {
        writer.write_record([
            "tick",
            "regime",
            "reported",
            "predicted",
            "forecast_resolved",
            "total",
        ])?;
        for (tick, counts) in &frames {
            let regime = if *tick > boundary { "forecast" } else { "history" };
            writer.write_record([
                format!("{:.2}", tick),
                regime.to_string(),
                counts.reported.to_string(),
                counts.predicted.to_string(),
                counts.forecast_resolved.to_string(),
                counts.total().to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    };

    let sink: Box<dyn Write> = if args.output.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            File::create(&args.output)
                .with_context(|| format!("failed to create {}", args.output.display()))?,
        )
    };
    let mut writer = csv::Writer::from_writer(sink);
    write_rows(&mut writer)?;
    info!(
        "Swept {} ticks from {} to {} (boundary {:.2}, {} forecasts)",
        frames.len(),
        args.from,
        to,
        boundary,
        predicted.len()
    );
    Ok(())
}

fn handle_score(args: ScoreArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let submissions: Vec<ReportSubmission> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of submissions", args.input.display()))?;
    let params = match args.params.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<CredibilityParams>(&text)
                .with_context(|| format!("{} is not valid credibility JSON", path.display()))?
        }
        None => CredibilityParams::default(),
    };
    let now = match args.now.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };

    let sink: Box<dyn Write> = if args.output.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            File::create(&args.output)
                .with_context(|| format!("failed to create {}", args.output.display()))?,
        )
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record([
        "id",
        "user_id",
        "category",
        "score",
        "ml_confidence",
        "consensus",
        "spam_penalty",
        "keyword_score",
        "time_decay",
        "ignored",
        "credible",
    ])?;
    let mut credible = 0usize;
    for submission in &submissions {
        let scored = score_submission(submission, &submissions, now, &params);
        let ok = is_credible(&scored, &params);
        if ok {
            credible += 1;
        }
        let b = &scored.breakdown;
        writer.write_record([
            submission.id.clone(),
            submission.user_id.clone(),
            submission.category.key().to_string(),
            format!("{:.3}", scored.score),
            format!("{:.3}", b.ml_confidence),
            format!("{:.3}", b.consensus),
            format!("{:.3}", b.spam_penalty),
            format!("{:.3}", b.keyword_score),
            format!("{:.3}", b.time_decay),
            b.ignored.to_string(),
            ok.to_string(),
        ])?;
    }
    writer.flush()?;
    info!(
        "Scored {} submissions, {} credible",
        submissions.len(),
        credible
    );
    Ok(())
}

fn load_catalog(args: &CatalogArgs) -> Result<HazardCatalog> {
    match args.catalog.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let catalog = HazardCatalog::from_json(&text)
                .with_context(|| format!("failed to load catalog {}", path.display()))?;
            debug!("Loaded {} reports from {}", catalog.len(), path.display());
            Ok(catalog)
        }
        None => {
            let spec = CatalogSpec {
                total_events: args.events,
                ..CatalogSpec::default()
            };
            let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
            let catalog = HazardCatalog::generate(&spec, &mut rng)?;
            debug!("Generated {} reports (seed {})", catalog.len(), args.seed);
            Ok(catalog)
        }
    }
}

fn load_engine_params(args: &EngineArgs) -> Result<EngineParams> {
    let mut params = match args.params.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read params {}", path.display()))?;
            EngineParams::from_json(&text)
                .with_context(|| format!("invalid params in {}", path.display()))?
        }
        None => EngineParams::default(),
    };
    if let Some(radius) = args.hotspot_radius {
        params.hotspot_radius_km = radius;
    }
    if let Some(offset) = args.prediction_offset {
        params.prediction_offset_km = offset;
    }
    if let Some(max) = args.max_predictions {
        params.max_predictions = max;
    }
    if let Some(bearing) = args.bearing {
        params.bearing = bearing.into();
    }
    params.validate()?;
    Ok(params)
}

/// Prediction boundary and tick span, plus the window when one applies.
fn resolve_boundary(args: &WindowArgs) -> Result<(f64, f64, Option<TimelineWindow>)> {
    if let Some(boundary) = args.boundary {
        if !boundary.is_finite() || boundary < 0.0 || boundary > args.total_ticks {
            return Err(anyhow!(
                "--boundary must lie within 0..={}",
                args.total_ticks
            ));
        }
        return Ok((boundary, args.total_ticks, None));
    }
    let observed_at = match args.observed_at.as_deref() {
        Some(raw) => parse_instant(raw)?,
        None => Utc::now(),
    };
    let window =
        TimelineWindow::around(observed_at, args.days_before, args.span_days, args.total_ticks)?;
    let boundary = window.prediction_boundary();
    if boundary <= 0.0 || boundary >= window.total_ticks {
        warn!(
            "Observation instant {} lies outside the timeline; boundary clamped to {:.2}",
            observed_at.to_rfc3339(),
            boundary
        );
    }
    Ok((boundary, window.total_ticks, Some(window)))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("invalid RFC 3339 instant '{}'", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

fn validate_tick(tick: f64, total_ticks: f64) -> Result<()> {
    if !tick.is_finite() || tick < 0.0 || tick > total_ticks {
        return Err(anyhow!("tick {} outside 0..={}", tick, total_ticks));
    }
    Ok(())
}

fn build_query(tick: f64, filters: &FilterArgs) -> Result<TimelineQuery> {
    Ok(TimelineQuery {
        cutoff_tick: tick,
        categories: parse_categories(&filters.categories)?,
        statuses: parse_statuses(&filters.status)?,
        show_predictions: !filters.no_predictions,
    })
}

fn parse_categories(input: &str) -> Result<HashSet<HazardCategory>> {
    let mut out = HashSet::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("all") {
            out.extend(HazardCategory::ALL);
            continue;
        }
        out.insert(trimmed.parse::<HazardCategory>()?);
    }
    if out.is_empty() {
        return Err(anyhow!("--categories list was empty"));
    }
    Ok(out)
}

fn parse_statuses(input: &str) -> Result<StatusFilter> {
    let classes = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<StatusClass>())
        .collect::<Result<Vec<_>, _>>()?;
    if classes.is_empty() {
        warn!("Empty --status list; nothing will be shown");
    }
    Ok(classes.into_iter().collect())
}

fn sweep_ticks(from: f64, to: f64, step: f64) -> Result<Vec<f64>> {
    if to < from {
        return Ok(Vec::new());
    }
    let steps = ((to - from) / step).floor();
    if steps >= MAX_SWEEP_FRAMES as f64 {
        return Err(anyhow!(
            "sweep by {step} exceeds {MAX_SWEEP_FRAMES} frames; use a larger --step"
        ));
    }
    Ok((0..=steps as usize).map(|i| from + i as f64 * step).collect())
}

/// Forecast draws use their own ChaCha stream so they never replay the
/// catalog generator's sequence for the same seed.
fn forecast_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(FORECAST_STREAM);
    rng
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
struct StatusCounts {
    reported: usize,
    predicted: usize,
    forecast_resolved: usize,
}

impl StatusCounts {
    fn tally(rows: &[ProjectedHazard]) -> Self {
        let mut counts = StatusCounts::default();
        for row in rows {
            match row.status {
                LifecycleStatus::Reported => counts.reported += 1,
                LifecycleStatus::Predicted => counts.predicted += 1,
                LifecycleStatus::ForecastResolved => counts.forecast_resolved += 1,
                LifecycleStatus::Resolved => {}
            }
        }
        counts
    }

    fn total(&self) -> usize {
        self.reported + self.predicted + self.forecast_resolved
    }
}

fn log_status_summary(rows: &[ProjectedHazard]) {
    let mut by_category: BTreeMap<HazardCategory, usize> = BTreeMap::new();
    for row in rows {
        *by_category.entry(row.event.category).or_insert(0) += 1;
    }
    if by_category.is_empty() {
        return;
    }
    let counts = StatusCounts::tally(rows);
    let summary: Vec<String> = by_category
        .into_iter()
        .map(|(category, n)| format!("{} {}", category.key(), n))
        .collect();
    info!(
        "Statuses: {} reported, {} predicted, {} forecast-resolved; {}",
        counts.reported,
        counts.predicted,
        counts.forecast_resolved,
        summary.join(", ")
    );
}

fn write_projection_stdout(rows: &[ProjectedHazard]) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_projection_rows(rows, &mut writer)
}

fn write_projection_csv(rows: &[ProjectedHazard], path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_projection_rows(rows, &mut writer)
}

fn write_projection_rows<W: Write>(
    rows: &[ProjectedHazard],
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record([
        "id",
        "category",
        "origin",
        "status",
        "lat",
        "lng",
        "severity",
        "occurs_at",
        "resolved_at",
        "radius_m",
    ])?;
    for row in rows {
        let event: &HazardEvent = &row.event;
        writer.write_record([
            event.id.clone(),
            event.category.key().to_string(),
            event.origin.key().to_string(),
            row.status.key().to_string(),
            format!("{:.5}", event.position.lat),
            format!("{:.5}", event.position.lng),
            event.severity.to_string(),
            format!("{:.2}", event.occurs_at),
            format!("{:.2}", event.resolved_at()),
            format!("{:.0}", event.display_radius_m()),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_categories() {
        let all = parse_categories("all").unwrap();
        assert_eq!(all.len(), HazardCategory::ALL.len());

        let some = parse_categories("tsunami, oil_spill,").unwrap();
        assert_eq!(some.len(), 2);
        assert!(some.contains(&HazardCategory::OilSpill));

        assert!(parse_categories(" , ").is_err());
        assert!(parse_categories("tsunami,lava").is_err());
    }

    #[test]
    fn test_parse_statuses() {
        let both = parse_statuses("active,resolved").unwrap();
        assert_eq!(both, StatusFilter::default());
        let active = parse_statuses("active").unwrap();
        assert!(active.active && !active.resolved);
        assert!(parse_statuses("pending").is_err());
    }

    #[test]
    fn test_validate_tick_bounds() {
        assert!(validate_tick(0.0, 150.0).is_ok());
        assert!(validate_tick(150.0, 150.0).is_ok());
        assert!(validate_tick(-1.0, 150.0).is_err());
        assert!(validate_tick(f64::NAN, 150.0).is_err());
        assert!(validate_tick(151.0, 150.0).is_err());
    }

    #[test]
    fn test_sweep_ticks_inclusive() {
        assert_eq!(sweep_ticks(0.0, 3.0, 1.0).unwrap(), [0.0, 1.0, 2.0, 3.0]);
        assert_eq!(sweep_ticks(0.0, 2.5, 1.0).unwrap(), [0.0, 1.0, 2.0]);
        assert!(sweep_ticks(5.0, 1.0, 1.0).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_ticks_rejects_runaway_frame_counts() {
        assert!(sweep_ticks(0.0, 150.0, 1e-12).is_err());
        assert!(sweep_ticks(0.0, 150.0, 0.01).is_ok());
    }

    #[test]
    fn test_forecast_rng_is_a_separate_stream() {
        use rand::Rng;
        let mut generator = ChaCha8Rng::seed_from_u64(42);
        let mut forecaster = forecast_rng(42);
        let a: Vec<u64> = (0..4).map(|_| generator.gen()).collect();
        let b: Vec<u64> = (0..4).map(|_| forecaster.gen()).collect();
        assert_ne!(a, b);
        assert_eq!(forecast_rng(42).gen::<u64>(), b[0]);
    }

    #[test]
    fn test_resolve_boundary_from_observation() {
        let args = WindowArgs {
            total_ticks: 150.0,
            observed_at: Some("2025-09-14T18:58:00+05:30".into()),
            days_before: 2,
            span_days: 7,
            boundary: None,
        };
        let (boundary, total, window) = resolve_boundary(&args).unwrap();
        assert_eq!(total, 150.0);
        assert!(window.is_some());
        assert!(boundary > 50.0 && boundary < 60.0, "{boundary}");

        let explicit = WindowArgs {
            boundary: Some(64.0),
            ..args
        };
        assert_eq!(resolve_boundary(&explicit).unwrap().0, 64.0);
    }

    #[test]
    fn test_cli_parses_project_command() {
        let cli = Cli::try_parse_from([
            "hazard-timeline",
            "project",
            "--tick",
            "80",
            "--boundary",
            "64",
            "--categories",
            "tsunami,high_wave",
            "--bearing",
            "away-from-centroid",
        ])
        .unwrap();
        match cli.command {
            Command::Project(args) => {
                assert_eq!(args.tick, 80.0);
                assert_eq!(args.window.boundary, Some(64.0));
                assert!(matches!(args.engine.bearing, Some(BearingOpt::AwayFromCentroid)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
