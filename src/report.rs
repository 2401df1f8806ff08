use crate::aggregate::Aggregator;
use crate::cli::{CommonArgs, Session};
use crate::model::{AuthorReport, ProjectReport, Totals, SCHEMA_VERSION};
use anyhow::{bail, Context};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

pub fn exec(
    common: CommonArgs,
    author: Option<String>,
    project: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if author.is_none() && project.is_none() {
        bail!("Specify an author (--author) or a project (--project)");
    }
    let session = common.session()?;
    let started = Instant::now();

    if let Some(project) = project {
        if !session.project_names().contains(&project) {
            bail!("Unknown project '{project}'");
        }
        let mut agg = Aggregator::new();
        scan(&session, &mut agg, &project, json)?;
        let authors = agg.project(&project).cloned().unwrap_or_default();

        if json {
            let output = ProjectReport {
                version: SCHEMA_VERSION,
                generated_at: Utc::now(),
                project,
                authors,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{} '{}'", style("Totals by author for project").bold(), project);
            output_table("Author", authors.iter());
            println!();
        }
    }

    if let Some(author) = author {
        let mut agg = Aggregator::new().with_author(author.clone());
        for project in session.project_names() {
            scan(&session, &mut agg, &project, json)?;
        }
        let projects = agg.by_author().clone();

        if json {
            let output = AuthorReport {
                version: SCHEMA_VERSION,
                generated_at: Utc::now(),
                author,
                projects,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{} '{}'", style("Totals by project for author").bold(), author);
            output_table("Project", projects.iter());
            println!();
        }
    }

    if !json {
        let elapsed = humantime::format_duration(std::time::Duration::from_millis(
            started.elapsed().as_millis() as u64,
        ));
        println!("{}", style(format!("Scanned in {elapsed}")).dim());
    }
    Ok(())
}

fn scan(session: &Session, agg: &mut Aggregator, project: &str, quiet: bool) -> anyhow::Result<()> {
    let commits = session
        .collection(project)
        .open()
        .with_context(|| format!("Failed to open commits of '{project}'"))?;

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(commits.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message(project.to_string());

    let result = agg.consume(project, commits.inspect(|_| pb.inc(1)));
    pb.finish_and_clear();
    result.with_context(|| format!("Failed to aggregate '{project}'"))?;
    Ok(())
}

fn output_table<'a>(key: &str, rows: impl Iterator<Item = (&'a String, &'a Totals)>) {
    println!(
        "{:<40} {:>8} {:>10} {:>10}",
        style(key).bold(),
        style("Commits").bold(),
        style("Added").bold(),
        style("Deleted").bold()
    );
    println!("{}", "─".repeat(71));
    for (name, totals) in rows {
        println!(
            "{:<40} {:>8} {:>10} {:>10}",
            name, totals.commits, totals.added_rows, totals.deleted_rows
        );
    }
}
