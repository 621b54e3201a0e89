//! traceview - open a trace database and show the Chrome interaction track

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tv_core::events::events::{StateChanged, TraceLoaded};
use tv_core::{handler_from_fn, CommandRegistry, Event, EventBus, StateStore, TimelineState};
use tv_data::{EngineConfig, QueryEngine, SqliteEngine, TimeWindow};
use tv_tracks::interactions::ADD_INTERACTION_TRACK_COMMAND;
use tv_tracks::{
    builtin_plugins, PluginContext, PluginManager, SliceRef, Timeline, TraceContext,
    TrackRegistry,
};

mod sample;

#[derive(Parser, Debug)]
#[clap(name = "traceview", version, about = "Inspect Chrome critical user interactions in a trace")]
struct Args {
    /// Trace database (in-memory when omitted)
    #[clap(long)]
    db: Option<PathBuf>,

    /// JSON engine configuration
    #[clap(long)]
    config: Option<PathBuf>,

    /// Seed a small demo trace before loading
    #[clap(long)]
    sample: bool,

    /// Only load slices overlapping <start>:<end>
    #[clap(long, value_parser = parse_window)]
    window: Option<TimeWindow>,

    /// Maximum slices per track
    #[clap(long)]
    limit: Option<usize>,

    /// Activate a slice by `<id>` or `<type>:<id>` and print its detail panel
    #[clap(long, value_parser = SliceRef::parse)]
    click: Option<SliceRef>,

    /// Print JSON instead of text
    #[clap(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => EngineConfig::default(),
    };
    if args.db.is_some() {
        config.database = args.db.clone();
    }
    if args.limit.is_some() {
        config.row_limit = args.limit;
    }

    let engine: Arc<dyn QueryEngine> = Arc::new(
        SqliteEngine::from_config(&config).context("Failed to open trace database")?,
    );
    if args.sample {
        sample::seed_sample_trace(engine.as_ref()).await?;
    }

    let event_bus = Arc::new(EventBus::new());
    event_bus.subscribe::<StateChanged>(handler_from_fn(|event: &dyn Event| {
        if let Some(changed) = event.as_any().downcast_ref::<StateChanged>() {
            let names: Vec<&str> = changed.actions.iter().map(|a| a.name()).collect();
            debug!("State generation {}: {:?}", changed.generation, names);
        }
    }));
    let store = Arc::new(StateStore::with_event_bus(event_bus.clone()));
    let commands = Arc::new(CommandRegistry::new());

    let mut plugins = PluginManager::new();
    for descriptor in builtin_plugins() {
        plugins.register(descriptor);
    }
    plugins.activate_all(&PluginContext {
        commands: commands.clone(),
        store: store.clone(),
    })?;

    let tracks = Arc::new(TrackRegistry::new());
    plugins
        .trace_loaded(&TraceContext {
            engine: engine.clone(),
            tracks: tracks.clone(),
        })
        .await?;
    event_bus.publish(TraceLoaded {
        source_name: config.database_name(),
    });
    info!("Loaded trace {} with {} plugin(s)", config.database_name(), plugins.plugin_ids().len());

    commands.run(ADD_INTERACTION_TRACK_COMMAND)?;

    let mut timeline = Timeline::new(tracks, engine, event_bus).with_row_limit(config.row_limit);
    let state = store.snapshot();
    timeline.sync(&state).await;
    timeline.refresh_all(args.window).await;

    let result = match &args.click {
        Some(slice) => print_panel(&timeline, &state, slice, args.json),
        None => {
            print_tracks(&timeline, &state, args.json);
            Ok(())
        }
    };

    timeline.clear().await;
    result
}

fn print_panel(timeline: &Timeline, state: &TimelineState, slice: &SliceRef, json: bool) -> Result<()> {
    for placement in state.ordered_tracks() {
        if let Some(panel) = timeline.click(&placement.key, slice) {
            if json {
                println!("{}", serde_json::to_string_pretty(&panel)?);
            } else {
                println!("{} [{}]", panel.config.title, panel.kind);
                println!("  table: {}", panel.config.sql_table_name);
            }
            return Ok(());
        }
    }
    match &slice.scope {
        Some(scope) => bail!("No slice {}:{}", scope, slice.id),
        None => bail!("No slice with id {} (ambiguous ids need <type>:<id>)", slice.id),
    }
}

fn print_tracks(timeline: &Timeline, state: &TimelineState, json: bool) {
    if json {
        let tracks: Vec<serde_json::Value> = state
            .ordered_tracks()
            .into_iter()
            .filter_map(|placement| {
                let track = timeline.track(&placement.key)?;
                Some(serde_json::json!({
                    "name": placement.name,
                    "kind": track.kind(),
                    "table": track.table_name(),
                    "pinned": state.is_pinned(&placement.key),
                    "slices": track.slices_json(),
                }))
            })
            .collect();
        println!("{}", serde_json::Value::Array(tracks));
        return;
    }

    for placement in state.ordered_tracks() {
        let Some(track) = timeline.track(&placement.key) else {
            continue;
        };
        let pin = if state.is_pinned(&placement.key) { "*" } else { " " };
        println!("{} {} ({})", pin, placement.name, track.table_name());

        let slices = track.slices_json();
        for slice in slices.as_array().into_iter().flatten() {
            println!(
                "  {:>6}  {:>14}  {:>12}  {:<32}  {}",
                slice["id"],
                slice["start"],
                format_dur(slice["duration"].as_i64().unwrap_or_default()),
                slice["type"].as_str().unwrap_or_default(),
                slice["title"].as_str().unwrap_or_default(),
            );
        }
    }
}

fn format_dur(dur: i64) -> String {
    if dur < 0 {
        "-".to_string()
    } else {
        humantime::format_duration(Duration::from_nanos(dur as u64)).to_string()
    }
}

/// Parse `<start>:<end>`. Bounds are nanoseconds or durations like `1s`.
fn parse_window(text: &str) -> Result<TimeWindow, String> {
    let (start, end) = text
        .split_once(':')
        .ok_or_else(|| format!("expected <start>:<end>, got '{}'", text))?;
    let start = parse_ts(start)?;
    let end = parse_ts(end)?;
    if end < start {
        return Err(format!("window end {} is before start {}", end, start));
    }
    Ok(TimeWindow::new(start, end))
}

fn parse_ts(text: &str) -> Result<i64, String> {
    let text = text.trim();
    if let Ok(ns) = text.parse::<i64>() {
        return Ok(ns);
    }
    humantime::parse_duration(text)
        .map_err(|e| format!("invalid timestamp '{}': {}", text, e))
        .and_then(|d| i64::try_from(d.as_nanos()).map_err(|e| e.to_string()))
}
