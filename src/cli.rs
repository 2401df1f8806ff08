use crate::cache::{Cache, CommitStore};
use crate::config::Settings;
use crate::git::{GitProvider, GitRepo};
use crate::sequence::CommitCollection;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "linemetrics")]
#[command(about = "Line-change statistics per commit, by author and by project")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArg {
    pub name: Option<String>,
    pub path: PathBuf,
}

fn parse_project(value: &str) -> std::result::Result<ProjectArg, String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok(ProjectArg {
            name: Some(name.to_string()),
            path: PathBuf::from(path),
        }),
        Some(_) => Err(format!("expected NAME=PATH or PATH, got '{value}'")),
        None => Ok(ProjectArg {
            name: None,
            path: PathBuf::from(value),
        }),
    }
}

#[derive(Args, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Path to settings file (default: ./linemetrics.toml)")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "repo",
        value_name = "NAME=PATH",
        value_parser = parse_project,
        help = "Git repository to analyze as a project; repeatable"
    )]
    pub repos: Vec<ProjectArg>,

    #[arg(long, help = "Path to cache database")]
    pub cache: Option<PathBuf>,

    #[arg(long, help = "Do not read or write the commit cache")]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the configured projects
    List,
    /// Print every commit of a project, or of all projects
    Log {
        #[arg(help = "Project name")]
        project: Option<String>,
    },
    /// Totals per author of a project and/or per project of an author
    Report {
        #[arg(long, help = "Author display name")]
        author: Option<String>,

        #[arg(long, help = "Project name")]
        project: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Fold every project into counters and print them in Prometheus text format
    Metrics {
        #[arg(long, help = "Write to this file instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Forget the cached commits of a project
    ResetCache {
        #[arg(help = "Project name")]
        project: String,
    },
    /// Print the effective settings
    Config,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::List => crate::list::exec(self.common),
            Commands::Log { project } => crate::history::exec(self.common, project),
            Commands::Report {
                author,
                project,
                json,
            } => crate::report::exec(self.common, author, project, json),
            Commands::Metrics { output } => crate::export::exec(self.common, output),
            Commands::ResetCache { project } => reset_cache(self.common, &project),
            Commands::Config => {
                let session = self.common.session()?;
                print!("{}", session.settings.to_toml()?);
                Ok(())
            }
        }
    }
}

/// Everything a command needs: effective settings, the opened repositories and
/// the cache when enabled.
pub struct Session {
    pub settings: Settings,
    pub provider: GitProvider,
    pub cache: Option<Cache>,
}

impl CommonArgs {
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(path) = &self.cache {
            settings.cache_path = path.clone();
        }
        if self.no_cache {
            settings.cache_enabled = false;
        }
        Ok(settings)
    }

    pub fn session(&self) -> Result<Session> {
        let mut settings = self.settings()?;
        let mut provider = GitProvider::new();

        for (name, path) in &settings.projects {
            let repo = GitRepo::open(path)
                .with_context(|| format!("Failed to open git repository for project '{name}'"))?;
            provider.add(name.clone(), repo);
        }

        let mut extra = Vec::new();
        for arg in &self.repos {
            let repo = GitRepo::open(&arg.path)
                .with_context(|| format!("Failed to open git repository at {}", arg.path.display()))?;
            let name = arg.name.clone().unwrap_or_else(|| repo.default_name());
            extra.push((name.clone(), repo.path().to_path_buf()));
            provider.add(name, repo);
        }
        if settings.projects.is_empty() && extra.is_empty() {
            let cwd = std::env::current_dir()?;
            let repo = GitRepo::open(&cwd).context("Failed to open git repository")?;
            extra.push((repo.default_name(), repo.path().to_path_buf()));
            provider.add(repo.default_name(), repo);
        }
        settings.projects.extend(extra);

        let cache = if settings.cache_enabled {
            Some(Cache::open(&settings.cache_path).context("Failed to initialize cache")?)
        } else {
            None
        };

        Ok(Session {
            settings,
            provider,
            cache,
        })
    }
}

impl Session {
    pub fn project_names(&self) -> Vec<String> {
        self.settings.projects.keys().cloned().collect()
    }

    pub fn store(&self) -> Option<&dyn CommitStore> {
        self.cache.as_ref().map(|c| c as &dyn CommitStore)
    }

    pub fn collection(&self, project: &str) -> CommitCollection<'_> {
        CommitCollection::new(project, &self.provider, self.store())
            .with_skip_extensions(self.settings.skip_extensions.iter().cloned())
    }
}

fn reset_cache(common: CommonArgs, project: &str) -> Result<()> {
    let settings = common.settings()?;
    let cache = Cache::open(&settings.cache_path).context("Failed to initialize cache")?;
    let removed = cache
        .reset(project)
        .with_context(|| format!("Failed to reset cache for '{project}'"))?;
    println!("Removed {removed} cached commits of '{project}'");
    Ok(())
}
