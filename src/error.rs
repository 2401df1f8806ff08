use crate::model::Commit;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetricsError>;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Unknown project: {0}")]
    UnknownProject(String),
    #[error("Unknown change {id} in project {project}")]
    UnknownChange { project: String, id: u64 },
    #[error("Git repository error: {0}")]
    GitRepo(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Failed to cache commit {}: {source}", .commit.id)]
    CachePutFailed {
        commit: Box<Commit>,
        source: Box<MetricsError>,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Invalid settings: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Settings serialization error: {0}")]
    ConfigFormat(#[from] toml::ser::Error),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Object find error: {0}")]
    ObjectFind(#[from] Box<gix::object::find::existing::Error>),
    #[error("Object find with conversion error: {0}")]
    ObjectFindConv(#[from] Box<gix::object::find::existing::with_conversion::Error>),
    #[error("Commit error: {0}")]
    Commit(#[from] Box<gix::object::commit::Error>),
    #[error("Reference find error: {0}")]
    RefFind(#[from] Box<gix::reference::find::existing::Error>),
    #[error("Head peel error: {0}")]
    HeadPeel(#[from] Box<gix::head::peel::to_commit::Error>),
    #[error("Object decode error: {0}")]
    ObjectDecode(#[from] Box<gix::objs::decode::Error>),
    #[error("Diff tree to tree error: {0}")]
    DiffTreeToTree(#[from] Box<gix::repository::diff_tree_to_tree::Error>),
}

impl MetricsError {
    /// The commit carried by a non-fatal cache write failure, if this is one.
    pub fn resolved_commit(&self) -> Option<&Commit> {
        match self {
            MetricsError::CachePutFailed { commit, .. } => Some(&**commit),
            _ => None,
        }
    }
}

// Manual From implementations for unboxed to boxed conversions
impl From<gix::discover::Error> for MetricsError {
    fn from(err: gix::discover::Error) -> Self {
        MetricsError::GitDiscover(Box::new(err))
    }
}

impl From<gix::object::find::existing::Error> for MetricsError {
    fn from(err: gix::object::find::existing::Error) -> Self {
        MetricsError::ObjectFind(Box::new(err))
    }
}

impl From<gix::object::find::existing::with_conversion::Error> for MetricsError {
    fn from(err: gix::object::find::existing::with_conversion::Error) -> Self {
        MetricsError::ObjectFindConv(Box::new(err))
    }
}

impl From<gix::object::commit::Error> for MetricsError {
    fn from(err: gix::object::commit::Error) -> Self {
        MetricsError::Commit(Box::new(err))
    }
}

impl From<gix::reference::find::existing::Error> for MetricsError {
    fn from(err: gix::reference::find::existing::Error) -> Self {
        MetricsError::RefFind(Box::new(err))
    }
}

impl From<gix::head::peel::to_commit::Error> for MetricsError {
    fn from(err: gix::head::peel::to_commit::Error) -> Self {
        MetricsError::HeadPeel(Box::new(err))
    }
}

impl From<gix::objs::decode::Error> for MetricsError {
    fn from(err: gix::objs::decode::Error) -> Self {
        MetricsError::ObjectDecode(Box::new(err))
    }
}

impl From<gix::repository::diff_tree_to_tree::Error> for MetricsError {
    fn from(err: gix::repository::diff_tree_to_tree::Error) -> Self {
        MetricsError::DiffTreeToTree(Box::new(err))
    }
}
