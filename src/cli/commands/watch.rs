use crate::cli::load_leases;
use crate::config::Config;
use crate::countdown::{CountdownEngine, CountdownObserver};
use crate::error::Result;
use crate::models::AnnotatedLease;
use crate::search;
use crate::source::events::load_events;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Serialize)]
struct TickLine<'a> {
    tick: u64,
    leases: Vec<&'a AnnotatedLease>,
}

pub async fn execute(
    config: &Config,
    file: Option<PathBuf>,
    ticks: Option<u64>,
    events: Option<PathBuf>,
    query: Option<String>,
) -> Result<()> {
    let leases = load_leases(file, config)?;
    let engine = CountdownEngine::with_system_clock(leases, config.tick_interval());

    if let Some(path) = events {
        let events = load_events(&path)?;
        tracing::info!("Applying {} lease events from {}", events.len(), path.display());
        engine.update_leases(|leases| {
            for event in &events {
                event.apply(leases);
            }
        });
        tracing::debug!("{} leases after events", engine.leases().len());
    }

    tracing::debug!("Watching with a {} ms tick", engine.period().as_millis());
    let observer = engine.observe();
    let query = query.unwrap_or_default();
    let mut stdout = std::io::stdout().lock();

    let result = tokio::select! {
        result = stream(observer, ticks, &query, &mut stdout) => result,
        signal = tokio::signal::ctrl_c() => interrupted(signal),
    };

    tracing::debug!(
        "Countdown {:?} after {} ticks",
        engine.state(),
        engine.ticks()
    );
    result
}

fn interrupted(signal: std::io::Result<()>) -> Result<()> {
    signal?;
    tracing::info!("Interrupted, stopping countdown");
    Ok(())
}

/// Write one JSON line per snapshot until `limit` lines are out.
/// The observer is dropped on return, which stops the timer.
async fn stream(
    mut observer: CountdownObserver,
    limit: Option<u64>,
    query: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut tick = 0;
    while limit.map_or(true, |limit| tick < limit) {
        let snapshot = observer.next().await;
        tick += 1;

        let line = TickLine {
            tick,
            leases: search::filter_annotated(&snapshot, query).collect(),
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
        out.flush()?;
    }
    Ok(())
}
