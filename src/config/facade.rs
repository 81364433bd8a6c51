//! Config loader: layers defaults, global file, workspace files, an explicit
//! file and the environment, then deserializes into `FolioConfig`.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::FolioConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: defaults, global file, `config/config.toml`,
    /// `config/{FOLIO_ENV}.toml`, then `FOLIO__SECTION__KEY` variables.
    pub fn load(workspace_root: &Path) -> Result<FolioConfig, ConfigError> {
        Self::load_with_override(workspace_root, None)
    }

    /// Like [`ConfigLoader::load`], with `explicit` layered above the workspace
    /// files and below the environment.
    pub fn load_with_override(
        workspace_root: &Path,
        explicit: Option<&Path>,
    ) -> Result<FolioConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        builder = workspace_file::add_to_builder(builder, workspace_root)?;
        if let Some(path) = explicit {
            debug!(config_path = %path.display(), "Adding explicit configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(merge_policy::environment_source());
        builder.build()?.try_deserialize()
    }

    /// Load a single file on top of the defaults, ignoring every other layer.
    pub fn load_from_file(path: &Path) -> Result<FolioConfig, ConfigError> {
        merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
