use crate::aggregate::Aggregator;
use crate::cli::{CommonArgs, Session};
use crate::metrics::CounterSink;
use anyhow::{anyhow, bail, Context};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Folds every project into one counter sink, one thread per project, and
/// writes the exposition text to `output` or stdout.
///
/// A failing project only ends its own contribution. The counters are written
/// regardless, and the command fails afterwards if any project did.
pub fn exec(common: CommonArgs, output: Option<PathBuf>) -> anyhow::Result<()> {
    let session = common.session()?;
    let started = Instant::now();

    let (sink, failed) = collect(&session);
    let text = sink.render();

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, &text)
                .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
            info!(path = %path.display(), series = sink.snapshot().len(), "metrics written");
        }
        None => print!("{text}"),
    }

    info!(
        elapsed = %humantime::format_duration(std::time::Duration::from_millis(
            started.elapsed().as_millis() as u64
        )),
        "metrics collected"
    );
    if !failed.is_empty() {
        bail!("Failed to collect metrics for: {}", failed.join(", "));
    }
    Ok(())
}

/// Returns the shared sink and the names of projects that failed part way.
fn collect(session: &Session) -> (Arc<CounterSink>, Vec<String>) {
    let sink = Arc::new(CounterSink::new());
    let projects = session.project_names();

    let results: Vec<(String, anyhow::Result<usize>)> = std::thread::scope(|s| {
        let handles: Vec<_> = projects
            .iter()
            .map(|project| {
                let sink = Arc::clone(&sink);
                let handle = s.spawn(move || -> anyhow::Result<usize> {
                    let commits = session
                        .collection(project)
                        .open()
                        .with_context(|| format!("Failed to open commits of '{project}'"))?;
                    let mut agg = Aggregator::with_counters(sink);
                    agg.consume(project, commits)
                        .with_context(|| format!("Failed to aggregate '{project}'"))
                });
                (project.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(project, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("Worker for '{project}' panicked")));
                (project, result)
            })
            .collect()
    });

    let mut failed = Vec::new();
    for (project, result) in results {
        match result {
            Ok(folded) => info!(project = %project, commits = folded, "project folded"),
            Err(e) => {
                error!(project = %project, error = %format!("{e:#}"), "project aborted");
                failed.push(project);
            }
        }
    }
    (sink, failed)
}
