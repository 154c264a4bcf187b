//! Pre-built counter snapshots for tests and `--demo` mode.

use super::provider::MockProvider;
use crate::provider::{CounterInstance, CounterObject};

impl MockProvider {
    /// A small file server: two adapters, one DFSR replication group and a
    /// couple of message queues.
    pub fn typical_host() -> Self {
        let mut provider = Self::new();

        provider.add_object(
            CounterObject::new("Network Interface")
                .with_instance(
                    CounterInstance::new("Ethernet 1")
                        .with("Bytes Received/sec", 1000.0)
                        .with("Bytes Sent/sec", 500.0)
                        .with("Bytes Total/sec", 1500.0)
                        .with("Packets/sec", 30.0)
                        .with("Packets Received/sec", 20.0)
                        .with("Packets Sent/sec", 10.0)
                        .with("Packets Received Errors", 1.0)
                        .with("Current Bandwidth", 1_000_000_000.0),
                )
                .with_instance(
                    CounterInstance::new("isatap.{4A1C2D3E}")
                        .with("Bytes Received/sec", 0.0)
                        .with("Current Bandwidth", 100_000.0),
                ),
        );

        provider.add_object(
            CounterObject::new("DFS Replication Connections").with_instance(
                CounterInstance::new("fs01-to-fs02")
                    .with("Total Bytes Received", 4096.0)
                    .with("Total Files Received", 12.0)
                    .with("Size of Files Received", 8192.0),
            ),
        );
        provider.add_object(
            CounterObject::new("DFS Replicated Folders").with_instance(
                CounterInstance::new("Shares")
                    .with("Conflict Space In Use", 2048.0)
                    .with("Staging Space In Use", 1024.0)
                    .with("Updates Dropped", 3.0),
            ),
        );
        provider.add_object(
            CounterObject::new("DFS Replication Service Volumes").with_instance(
                CounterInstance::new("D:")
                    .with("Database Commits", 77.0)
                    .with("Database Lookups", 120.0)
                    .with("USN Journal Records Unread Percentage", 5.0),
            ),
        );

        provider.add_object(
            CounterObject::new("MSMQ Queue")
                .with_instance(
                    CounterInstance::new("Computer Queues")
                        .with("Messages in Queue", 9.0)
                        .with("Bytes in Queue", 900.0),
                )
                .with_instance(
                    CounterInstance::new("FS01\\private$\\Orders")
                        .with("Messages in Queue", 4.0)
                        .with("Bytes in Queue", 400.0)
                        .with("Messages in Journal Queue", 1.0)
                        .with("Bytes in Journal Queue", 100.0),
                )
                .with_instance(
                    CounterInstance::new("FS01\\private$\\Invoices")
                        .with("Messages in Queue", 5.0)
                        .with("Bytes in Queue", 500.0),
                ),
        );

        provider
    }

    /// A host whose backend reports nothing at all.
    pub fn empty() -> Self {
        Self::new()
    }
}
