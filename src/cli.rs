use clap::Parser;
use dsfind_catalog::error::Result;
use dsfind_catalog::{FileDetails, Pattern, SearchSpec};
use dsfind_config::ScanConfig;
use dsfind_scanner::{ScanRequest, VolumeSelection};
use std::path::PathBuf;

/// Find files across every datastore of a catalog, in parallel.
#[derive(Debug, Parser)]
#[command(name = "dsfind", version, about)]
pub struct Args {
    /// File-name patterns (`*`, `?`, `[...]`); a file matches if any of them does
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Configuration file (toml, yaml or json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local catalog root; every subdirectory is a volume
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Only search these volumes
    #[arg(short = 'v', long = "volume", value_name = "NAME")]
    pub volumes: Vec<String>,

    /// Only search volumes whose names match
    #[arg(long, value_name = "GLOB", conflicts_with = "volumes")]
    pub volume_match: Option<String>,

    /// Folder inside each volume to start from
    #[arg(short, long, value_name = "PATH")]
    pub prefix: Option<PathBuf>,

    /// Maximum number of volumes searched at once
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Do not descend into sub-folders
    #[arg(long)]
    pub no_recursive: bool,

    /// Match file names case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Also fetch file owners
    #[arg(long)]
    pub owner: bool,

    /// Hide the progress bar and log progress instead
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Merge flags over the configured scan settings.
    pub fn request(&self, config: &ScanConfig) -> Result<ScanRequest> {
        let pattern = match self.case_sensitive || config.case_sensitive {
            true => Pattern::case_sensitive(&self.patterns)?,
            false => Pattern::new(&self.patterns)?,
        };
        let details = FileDetails {
            size: config.details.size,
            modified: config.details.modified,
            owner: self.owner || config.details.owner,
            file_type: config.details.file_type,
        };
        let spec = SearchSpec::new(pattern)
            .with_details(details)
            .with_recursive(config.recursive && !self.no_recursive);

        let volumes = match (&self.volume_match, self.volumes.is_empty()) {
            (Some(glob), _) => VolumeSelection::Matching(Pattern::new([glob])?),
            (None, false) => VolumeSelection::Named(self.volumes.clone()),
            (None, true) => VolumeSelection::All,
        };

        Ok(ScanRequest::new(spec)
            .with_volumes(volumes)
            .with_prefix(self.prefix.clone().unwrap_or_default())
            .with_concurrency(self.concurrency.unwrap_or(config.concurrency))
            .with_progress_interval(config.progress_interval())
            .with_grace_period(config.grace_period()))
    }
}
