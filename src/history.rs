use crate::cli::{CommonArgs, Session};
use crate::error::MetricsError;
use crate::model::Commit;
use anyhow::{bail, Context};
use console::style;

/// Prints every commit of `project`, or of all projects when `None`. In the
/// all-projects form a failing project is reported and skipped.
pub fn exec(common: CommonArgs, project: Option<String>) -> anyhow::Result<()> {
    let session = common.session()?;
    let names = session.project_names();

    match project {
        Some(name) => {
            if !names.contains(&name) {
                bail!("Unknown project '{name}'");
            }
            print_project(&session, &name)
        }
        None => {
            for name in &names {
                if let Err(e) = print_project(&session, name) {
                    eprintln!("{} {name}: {e:#}", style("error:").red().bold());
                }
            }
            Ok(())
        }
    }
}

fn print_project(session: &Session, project: &str) -> anyhow::Result<()> {
    println!("{}", "─".repeat(80));
    println!("{}", style(format!("Project {project}")).bold());
    println!("{}", "─".repeat(80));

    let commits = session
        .collection(project)
        .open()
        .with_context(|| format!("Failed to open commits of '{project}'"))?;

    for item in commits {
        match item {
            Ok(commit) => print_commit(&commit),
            Err(MetricsError::CachePutFailed { commit, source }) => {
                tracing::warn!(project, id = commit.id, error = %source, "commit not cached");
                print_commit(&commit);
            }
            Err(e) => return Err(e).context("Failed to resolve commit"),
        }
    }
    Ok(())
}

fn print_commit(commit: &Commit) {
    println!(
        "{} {} <{}>",
        style(format!("#{}", commit.id)).yellow(),
        commit.author,
        commit.email
    );
    println!("Date: {}", style(commit.date.format("%Y-%m-%d %H:%M:%S")).dim());
    println!(
        "{} lines added, {} lines deleted",
        style(commit.added_rows).green(),
        style(commit.deleted_rows).red()
    );
    println!("\n    {}\n", commit.message);
}
