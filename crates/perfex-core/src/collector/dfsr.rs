//! DFS Replication metrics.
//!
//! Three independent sources, each backed by its own counter object. Only the
//! objects of enabled sources are requested from the backend.

use std::fmt;
use std::str::FromStr;

use super::table::{self, CounterMetric, counter, gauge};
use super::{CollectError, Collector};
use crate::config::{CollectorSettings, ConfigError, ConfigOption};
use crate::context::ScrapeContext;
use crate::enabled::expand_child_list;
use crate::metric::MetricSink;
use crate::registry::CollectorDescriptor;

pub const NAME: &str = "dfsr";
const SUBSYSTEM: &str = "dfsr";

pub const OPT_SOURCES: &str = "collectors.dfsr.sources-enabled";

pub const OPTIONS: &[ConfigOption] = &[ConfigOption {
    name: OPT_SOURCES,
    help: "Comma-separated list of DFSR perflib sources to use.",
    default: "connection,folder,volume",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    Connection,
    Folder,
    Volume,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Connection, Source::Folder, Source::Volume];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Connection => "connection",
            Source::Folder => "folder",
            Source::Volume => "volume",
        }
    }

    /// Counter object backing this source.
    pub fn object(self) -> &'static str {
        match self {
            Source::Connection => "DFS Replication Connections",
            Source::Folder => "DFS Replicated Folders",
            Source::Volume => "DFS Replication Service Volumes",
        }
    }

    fn metrics(self) -> &'static [CounterMetric] {
        match self {
            Source::Connection => CONNECTION_METRICS,
            Source::Folder => FOLDER_METRICS,
            Source::Volume => VOLUME_METRICS,
        }
    }

    fn subsystem(self) -> String {
        format!("{SUBSYSTEM}_{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|src| src.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownSource {
                option: OPT_SOURCES.to_string(),
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CONNECTION_METRICS: &[CounterMetric] = &[
    counter(
        "Bandwidth Savings Using DFS Replication",
        "bandwidth_savings_using_dfs_replication_bytes_total",
        "Total bytes of bandwidth saved using DFS Replication for this connection",
    ),
    counter(
        "Total Bytes Received",
        "bytes_received_total",
        "Total bytes received for connection",
    ),
    counter(
        "Compressed Size of Files Received",
        "compressed_size_of_files_received_total",
        "Total compressed size of files received on the connection, in bytes",
    ),
    counter(
        "Total Files Received",
        "received_files_total",
        "Total number of files received for connection",
    ),
    counter(
        "RDC Bytes Received",
        "rdc_received_bytes_total",
        "Total bytes received on the connection while replicating files using Remote Differential Compression",
    ),
    counter(
        "RDC Compressed Size of Files Received",
        "rdc_compressed_size_of_files_received_total",
        "Total compressed size (in bytes) of files received with Remote Differential Compression",
    ),
    counter(
        "RDC Number of Files Received",
        "rdc_received_files_total",
        "Total number of files received using Remote Differential Compression",
    ),
    counter(
        "RDC Size of Files Received",
        "rdc_size_of_received_files_bytes_total",
        "Total uncompressed size (in bytes) of files received with Remote Differential Compression",
    ),
    counter(
        "Size of Files Received",
        "files_received_bytes_total",
        "Total uncompressed size of files received on the connection, in bytes",
    ),
];

const FOLDER_METRICS: &[CounterMetric] = &[
    counter(
        "Bandwidth Savings Using DFS Replication",
        "bandwidth_savings_using_dfs_replication_bytes_total",
        "Total bytes of bandwidth saved using DFS Replication for this folder",
    ),
    counter(
        "Compressed Size of Files Received",
        "compressed_size_of_files_received_bytes_total",
        "Total compressed size of files received on the folder, in bytes",
    ),
    counter(
        "Conflict Bytes Cleaned Up",
        "conflict_cleaned_up_bytes_total",
        "Total size of conflict loser files and folders deleted from the Conflict and Deleted folder, in bytes",
    ),
    counter(
        "Conflict Bytes Generated",
        "conflict_generated_bytes_total",
        "Total size of conflict loser files and folders moved to the Conflict and Deleted folder, in bytes",
    ),
    counter(
        "Conflict Files Cleaned Up",
        "conflict_cleaned_up_files_total",
        "Number of conflict loser files deleted from the Conflict and Deleted folder",
    ),
    counter(
        "Conflict Files Generated",
        "conflict_generated_files_total",
        "Number of files and folders moved to the Conflict and Deleted folder",
    ),
    counter(
        "Conflict Folder Cleanups Completed",
        "conflict_folder_cleanups_total",
        "Number of deletions of conflict loser files and folders in the Conflict and Deleted",
    ),
    gauge(
        "Conflict Space In Use",
        "conflict_space_in_use_bytes",
        "Total size of the conflict loser files and folders currently in the Conflict and Deleted folder",
    ),
    gauge(
        "Deleted Space In Use",
        "deleted_space_in_use_bytes",
        "Total size (in bytes) of the deleted files and folders currently in the Conflict and Deleted folder",
    ),
    counter(
        "Deleted Bytes Cleaned Up",
        "deleted_cleaned_up_bytes_total",
        "Total size (in bytes) of replicating deleted files and folders that were cleaned up from the Conflict and Deleted folder",
    ),
    counter(
        "Deleted Bytes Generated",
        "deleted_generated_bytes_total",
        "Total size (in bytes) of replicated deleted files and folders that were moved to the Conflict and Deleted folder after they were deleted",
    ),
    counter(
        "Deleted Files Cleaned Up",
        "deleted_cleaned_up_files_total",
        "Number of files and folders that were cleaned up from the Conflict and Deleted folder",
    ),
    counter(
        "Deleted Files Generated",
        "deleted_generated_files_total",
        "Number of deleted files and folders that were moved to the Conflict and Deleted folder",
    ),
    counter(
        "File Installs Retried",
        "file_installs_retried_total",
        "Total number of file installs that are being retried due to sharing violations or other errors encountered when installing the files",
    ),
    counter(
        "File Installs Succeeded",
        "file_installs_succeeded_total",
        "Total number of files that were successfully received from sending members and installed locally on this server",
    ),
    counter(
        "Total Files Received",
        "received_files_total",
        "Total number of files received",
    ),
    counter(
        "RDC Bytes Received",
        "rdc_received_bytes_total",
        "Total number of bytes received in replicating files using Remote Differential Compression",
    ),
    counter(
        "RDC Compressed Size of Files Received",
        "rdc_compressed_size_of_files_received_bytes_total",
        "Total compressed size (in bytes) of the files received with Remote Differential Compression",
    ),
    counter(
        "RDC Number of Files Received",
        "rdc_received_files_total",
        "Total number of files received with Remote Differential Compression",
    ),
    counter(
        "RDC Size of Files Received",
        "rdc_files_received_bytes_total",
        "Total uncompressed size (in bytes) of the files received with Remote Differential Compression",
    ),
    counter(
        "Size of Files Received",
        "files_received_bytes_total",
        "Total uncompressed size (in bytes) of the files received",
    ),
    gauge(
        "Staging Space In Use",
        "staging_space_in_use_bytes",
        "Total size of files and folders currently in the staging folder",
    ),
    counter(
        "Staging Bytes Cleaned Up",
        "staging_cleaned_up_bytes_total",
        "Total size (in bytes) of the files and folders that have been cleaned up from the staging folder",
    ),
    counter(
        "Staging Bytes Generated",
        "staging_generated_bytes_total",
        "Total size (in bytes) of replicated files and folders in the staging folder created by the DFS Replication service since last restart",
    ),
    counter(
        "Staging Files Cleaned Up",
        "staging_cleaned_up_files_total",
        "Total number of files and folders that have been cleaned up from the staging folder",
    ),
    counter(
        "Staging Files Generated",
        "staging_generated_files_total",
        "Total number of times replicated files and folders have been staged by the DFS Replication service",
    ),
    counter(
        "Updates Dropped",
        "dropped_updates_total",
        "Total number of redundant file replication update records that have been ignored by the DFS Replication service because they did not change the replicated file or folder",
    ),
];

const VOLUME_METRICS: &[CounterMetric] = &[
    counter(
        "Database Commits",
        "database_commits_total",
        "Total number of DFSR Volume database commits",
    ),
    counter(
        "Database Lookups",
        "database_lookups_total",
        "Total number of DFSR Volume database lookups",
    ),
    gauge(
        "USN Journal Records Unread Percentage",
        "usn_journal_unread_percentage",
        "Percentage of DFSR Volume USN journal records that are unread",
    ),
    counter(
        "USN Journal Records Accepted",
        "usn_journal_accepted_records_total",
        "Total number of USN journal records accepted",
    ),
    counter(
        "USN Journal Records Read",
        "usn_journal_read_records_total",
        "Total number of DFSR Volume USN journal records read",
    ),
];

pub fn descriptor() -> CollectorDescriptor {
    CollectorDescriptor::new(NAME, |settings| {
        let config = DfsrConfig::from_settings(settings)?;
        Ok(Box::new(DfsrCollector::new(config)))
    })
    .with_options(OPTIONS)
    .with_dependencies(&[
        "DFS Replication Connections",
        "DFS Replicated Folders",
        "DFS Replication Service Volumes",
    ])
}

/// Enabled sources, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfsrConfig {
    sources: Vec<Source>,
}

impl DfsrConfig {
    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, ConfigError> {
        let mut sources = expand_child_list(settings.value(OPT_SOURCES))
            .iter()
            .map(|s| s.parse::<Source>())
            .collect::<Result<Vec<_>, _>>()?;
        sources.sort();
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
}

#[derive(Debug)]
pub struct DfsrCollector {
    config: DfsrConfig,
}

impl DfsrCollector {
    pub fn new(config: DfsrConfig) -> Self {
        Self { config }
    }

    fn collect_source(
        &self,
        source: Source,
        ctx: &ScrapeContext,
        sink: &dyn MetricSink,
    ) -> Result<(), CollectError> {
        let object = ctx.object(source.object())?;
        let subsystem = source.subsystem();
        for instance in &object.instances {
            table::emit(sink, &subsystem, source.metrics(), instance, "name", &instance.name);
        }
        Ok(())
    }
}

impl Collector for DfsrCollector {
    fn collect(&self, ctx: &ScrapeContext, sink: &dyn MetricSink) -> Result<(), CollectError> {
        for source in &self.config.sources {
            self.collect_source(*source, ctx, sink)?;
        }
        Ok(())
    }

    fn dependencies(&self, _declared: &[&'static str]) -> Vec<String> {
        self.config
            .sources
            .iter()
            .map(|s| s.object().to_string())
            .collect()
    }
}
