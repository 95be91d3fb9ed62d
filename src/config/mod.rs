mod file_config;

pub use file_config::{DirectoryConfig, FileConfig};

use crate::coordinator::AggregateRepository;
use crate::fragment::{
    DirectoryFragment, DirectoryFragmentConfig, Fragment, InMemoryFragment, Operation,
    SqliteScheduleFragment,
};
use crate::song_director::Property;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const IDENTITY_PROPERTIES: &[Property] = &[
    Property::FullName,
    Property::EmailAddress,
    Property::PhoneNumber,
    Property::Rank,
];
const SCHEDULE_PROPERTIES: &[Property] = &[Property::IsActive];

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub schedule_db_path: Option<PathBuf>,
    pub directory_url: Option<String>,
    pub directory_domain: Option<String>,
    pub directory_timeout_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file of the schedule fragment, in memory when unset.
    pub schedule_db_path: Option<PathBuf>,
    /// Directory service of the identity fragment, in memory when unset.
    pub directory: Option<DirectoryFragmentConfig>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let schedule_db_path = file
            .schedule_db_path
            .map(PathBuf::from)
            .or_else(|| cli.schedule_db_path.clone());
        if let Some(path) = &schedule_db_path {
            if path.is_dir() {
                bail!("schedule_db_path is a directory: {:?}", path);
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    bail!("Schedule database directory does not exist: {:?}", parent);
                }
            }
        }

        let directory = match file.directory {
            Some(section) => Some(resolve_directory(cli, section)?),
            None if cli.directory_url.is_some() || cli.directory_domain.is_some() => {
                Some(resolve_directory(cli, DirectoryConfig::default())?)
            }
            None => None,
        };

        Ok(Self {
            schedule_db_path,
            directory,
        })
    }

    /// Builds the fragments described by this config. Unconfigured stores fall back
    /// to in-memory fragments with the same ordering.
    pub fn build_fragments(&self) -> Result<Vec<Arc<dyn Fragment>>> {
        let identity: Arc<dyn Fragment> = match &self.directory {
            Some(directory) => {
                info!("Using directory at {}", directory.base_url);
                Arc::new(DirectoryFragment::new(directory.clone())?)
            }
            None => {
                info!("No directory configured, keeping identities in memory");
                Arc::new(
                    InMemoryFragment::new("identity", IDENTITY_PROPERTIES)
                        .generating_ids()
                        .with_execution_order(Operation::Add, 1)
                        .with_execution_order(Operation::RemoveById, 2),
                )
            }
        };

        let schedule: Arc<dyn Fragment> = match &self.schedule_db_path {
            Some(path) => {
                info!("Using schedule database {:?}", path);
                Arc::new(
                    SqliteScheduleFragment::open(path)
                        .with_context(|| format!("Failed to open schedule database {:?}", path))?,
                )
            }
            None => {
                info!("No schedule database configured, keeping schedules in memory");
                Arc::new(
                    InMemoryFragment::new("schedule", SCHEDULE_PROPERTIES)
                        .with_execution_order(Operation::Add, 2)
                        .with_execution_order(Operation::RemoveById, 1),
                )
            }
        };

        Ok(vec![identity, schedule])
    }

    pub fn build_repository(&self) -> Result<AggregateRepository> {
        Ok(AggregateRepository::new(self.build_fragments()?))
    }
}

fn resolve_directory(cli: &CliConfig, section: DirectoryConfig) -> Result<DirectoryFragmentConfig> {
    let base_url = section
        .base_url
        .or_else(|| cli.directory_url.clone())
        .filter(|s| !s.trim().is_empty())
        .context("Directory base_url must be specified via --directory-url or in config file")?;
    let domain = section
        .domain
        .or_else(|| cli.directory_domain.clone())
        .filter(|s| !s.trim().is_empty())
        .context("Directory domain must be specified via --directory-domain or in config file")?;

    let mut config = DirectoryFragmentConfig::new(base_url, domain);
    if let Some(roles_attribute) = section.roles_attribute {
        config.roles_attribute = roles_attribute;
    }
    if let Some(job_title) = section.job_title {
        config.job_title = job_title;
    }
    if let Some(timeout_sec) = section.timeout_sec.or(cli.directory_timeout_sec) {
        config.timeout_sec = timeout_sec;
    }
    Ok(config)
}
