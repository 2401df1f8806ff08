//! The version-control provider the core consumes.
//!
//! Implementations talk to whatever backs the history (a local repository, a
//! remote service). Nothing in the core reaches a repository except through here.

use crate::error::Result;
use crate::model::{ChangeId, ChangeMetadata};

pub trait ChangeProvider {
    /// Names of every project the provider can serve.
    fn list_projects(&self) -> Result<Vec<String>>;

    /// Changeset identifiers of `project`, in provider order.
    fn list_change_ids(&self, project: &str) -> Result<Vec<ChangeId>>;

    fn change_metadata(&self, project: &str, id: ChangeId) -> Result<ChangeMetadata>;

    /// Raw content of `path` as of `version`, or `None` when the path does not
    /// exist there (it was removed by that version).
    fn path_content(&self, project: &str, path: &str, version: &str) -> Result<Option<Vec<u8>>>;

    /// Raw content of the version of `path` preceding `version`, or `None` when
    /// `version` is the first one.
    fn previous_path_content(
        &self,
        project: &str,
        path: &str,
        version: &str,
    ) -> Result<Option<Vec<u8>>>;
}
