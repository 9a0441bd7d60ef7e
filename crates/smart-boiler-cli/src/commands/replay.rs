//! Replay a JSON-lines recording of host notifications.
//!
//! Each non-empty line is one `StateChange`. Lines starting with `#` are
//! comments. The new state of every line is applied to an in-process host
//! before the engine sees it, so reactors read the same world the recording
//! describes.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Args;
use smart_boiler_core::runtime::spawn_engine;
use smart_boiler_core::{
    Config, Database, EntityHost, Event, MemoryPersistence, SmartBoiler, StateChange,
    ThresholdPersistence,
};
use tokio::sync::mpsc;

#[derive(Args)]
pub struct ReplayArgs {
    /// Recording to replay, `-` for stdin
    file: PathBuf,
    /// Apply decisions even if the config says dry_run
    #[arg(long)]
    live: bool,
    /// Restore and save the threshold in the real database
    #[arg(long)]
    persist: bool,
    /// Print decisions as JSON lines
    #[arg(long)]
    json: bool,
}

fn read_changes(path: &PathBuf) -> Result<Vec<StateChange>, Box<dyn std::error::Error>> {
    let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(path)?))
    };

    let mut changes = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let change: StateChange = serde_json::from_str(trimmed)
            .map_err(|e| format!("line {}: {e}", index + 1))?;
        changes.push(change);
    }
    Ok(changes)
}

pub fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if args.live {
        config.dry_run = false;
    }
    let changes = read_changes(&args.file)?;

    let persistence: Box<dyn ThresholdPersistence> = if args.persist {
        Box::new(Mutex::new(Database::open()?))
    } else {
        Box::new(MemoryPersistence::new())
    };
    let host = Arc::new(EntityHost::new());
    let engine = Arc::new(SmartBoiler::setup(&config, host.clone(), host.clone(), persistence)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let decisions: Vec<Event> = runtime.block_on(async {
        let (tx, rx) = mpsc::channel(64);
        let (decisions_tx, mut decisions_rx) = mpsc::unbounded_channel();
        let handle = spawn_engine(engine.clone(), rx, decisions_tx);

        for change in changes {
            match &change.new_state {
                Some(state) => host.set_state(&change.entity_key, state.clone()),
                None => host.remove(&change.entity_key),
            };
            if tx.send(change).await.is_err() {
                break;
            }
        }
        drop(tx);
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "engine task failed");
        }

        let mut collected = Vec::new();
        while let Some(event) = decisions_rx.recv().await {
            collected.push(event);
        }
        collected
    });

    for event in &decisions {
        if args.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}  {}", event_time(event), event.description());
        }
    }

    let score = engine.urgency();
    if args.json {
        println!("{}", serde_json::to_string(&score.to_event())?);
    } else {
        match engine.threshold() {
            Some(value) => println!("threshold: {value}"),
            None => println!("threshold: unavailable"),
        }
        println!("urgency: {}%", score.value);
    }
    Ok(())
}

fn event_time(event: &Event) -> String {
    let at = match event {
        Event::ShowerDetected { at, .. }
        | Event::ManualOverride { at, .. }
        | Event::ThresholdAdjusted { at, .. }
        | Event::ThresholdUnavailable { at, .. }
        | Event::UrgencyRecomputed { at, .. } => at,
    };
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
