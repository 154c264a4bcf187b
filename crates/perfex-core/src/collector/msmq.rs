//! Message Queuing metrics from the `MSMQ Queue` counter object.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::table::{self, CounterMetric, gauge};
use super::{CollectError, Collector};
use crate::config::{CollectorSettings, ConfigError, ConfigOption};
use crate::context::ScrapeContext;
use crate::metric::MetricSink;
use crate::registry::CollectorDescriptor;

pub const NAME: &str = "msmq";
pub const OBJECT: &str = "MSMQ Queue";
const SUBSYSTEM: &str = "msmq";

/// Aggregate instance summing all queues of the machine.
const AGGREGATE_INSTANCE: &str = "Computer Queues";

pub const OPT_WHITELIST: &str = "collector.msmq.queue-whitelist";

pub const OPTIONS: &[ConfigOption] = &[ConfigOption {
    name: OPT_WHITELIST,
    help: "Regexp of queue names to include (case-insensitive). Empty includes every queue.",
    default: "",
}];

const METRICS: &[CounterMetric] = &[
    gauge(
        "Bytes in Journal Queue",
        "bytes_in_journal_queue",
        "Size of queue journal in bytes",
    ),
    gauge("Bytes in Queue", "bytes_in_queue", "Size of queue in bytes"),
    gauge(
        "Messages in Journal Queue",
        "messages_in_journal_queue",
        "Count messages in queue journal",
    ),
    gauge(
        "Messages in Queue",
        "messages_in_queue",
        "Count messages in queue",
    ),
];

pub fn descriptor() -> CollectorDescriptor {
    CollectorDescriptor::new(NAME, |settings| {
        let config = MsmqConfig::from_settings(settings)?;
        Ok(Box::new(MsmqCollector::new(config)))
    })
    .with_options(OPTIONS)
    .with_dependencies(&[OBJECT])
}

#[derive(Debug, Clone)]
pub struct MsmqConfig {
    /// `None` includes every queue.
    whitelist: Option<Regex>,
}

impl MsmqConfig {
    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, ConfigError> {
        let pattern = settings.value(OPT_WHITELIST);
        if pattern.is_empty() {
            warn!(
                option = OPT_WHITELIST,
                "no queue whitelist for msmq collector, this can generate a very large number of series"
            );
            return Ok(Self { whitelist: None });
        }

        let whitelist = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                option: OPT_WHITELIST.to_string(),
                source,
            })?;
        Ok(Self {
            whitelist: Some(whitelist),
        })
    }

    pub fn includes(&self, queue: &str) -> bool {
        self.whitelist.as_ref().is_none_or(|re| re.is_match(queue))
    }
}

#[derive(Debug)]
pub struct MsmqCollector {
    config: MsmqConfig,
}

impl MsmqCollector {
    pub fn new(config: MsmqConfig) -> Self {
        Self { config }
    }
}

impl Collector for MsmqCollector {
    fn collect(&self, ctx: &ScrapeContext, sink: &dyn MetricSink) -> Result<(), CollectError> {
        let object = ctx.object(OBJECT)?;

        for queue in &object.instances {
            if queue.name == AGGREGATE_INSTANCE || !self.config.includes(&queue.name) {
                continue;
            }
            let name = queue.name.to_lowercase();
            table::emit(sink, SUBSYSTEM, METRICS, queue, "name", &name);
        }
        Ok(())
    }
}
