//! Network adapter metrics from the `Network Interface` counter object.

use regex::Regex;

use super::table::{self, CounterMetric, counter, gauge};
use super::{CollectError, Collector};
use crate::config::{CollectorSettings, ConfigError, ConfigOption};
use crate::context::ScrapeContext;
use crate::metric::MetricSink;
use crate::registry::CollectorDescriptor;

pub const NAME: &str = "net";
pub const OBJECT: &str = "Network Interface";
const SUBSYSTEM: &str = "net";

pub const OPT_WHITELIST: &str = "collector.net.nic-whitelist";
pub const OPT_BLACKLIST: &str = "collector.net.nic-blacklist";

pub const OPTIONS: &[ConfigOption] = &[
    ConfigOption {
        name: OPT_WHITELIST,
        help: "Regexp of NICs to include. A NIC must match the whitelist and not the blacklist.",
        default: ".+",
    },
    ConfigOption {
        name: OPT_BLACKLIST,
        help: "Regexp of NICs to exclude. A NIC must match the whitelist and not the blacklist.",
        default: "",
    },
];

const METRICS: &[CounterMetric] = &[
    counter(
        "Bytes Received/sec",
        "bytes_received_total",
        "Total bytes received by interface",
    ),
    counter("Bytes Sent/sec", "bytes_sent_total", "Total bytes transmitted by interface"),
    counter(
        "Bytes Total/sec",
        "bytes_total",
        "Total bytes received and transmitted by interface",
    ),
    counter(
        "Packets Outbound Discarded",
        "packets_outbound_discarded_total",
        "Total outbound packets that were chosen to be discarded even though no errors had been detected",
    ),
    counter(
        "Packets Outbound Errors",
        "packets_outbound_errors_total",
        "Total packets that could not be transmitted due to errors",
    ),
    counter(
        "Packets Received Discarded",
        "packets_received_discarded_total",
        "Total inbound packets that were chosen to be discarded even though no errors had been detected",
    ),
    counter(
        "Packets Received Errors",
        "packets_received_errors_total",
        "Total packets that could not be received due to errors",
    ),
    counter(
        "Packets Received/sec",
        "packets_received_total",
        "Total packets received by interface",
    ),
    counter(
        "Packets Received Unknown",
        "packets_received_unknown_total",
        "Total packets received by interface that were discarded because of an unknown or unsupported protocol",
    ),
    counter(
        "Packets/sec",
        "packets_total",
        "Total packets received and transmitted by interface",
    ),
    counter(
        "Packets Sent/sec",
        "packets_sent_total",
        "Total packets transmitted by interface",
    ),
    gauge(
        "Current Bandwidth",
        "current_bandwidth",
        "Estimate of the interface's current bandwidth in bits per second",
    ),
];

pub fn descriptor() -> CollectorDescriptor {
    CollectorDescriptor::new(NAME, |settings| {
        let config = NetConfig::from_settings(settings)?;
        Ok(Box::new(NetCollector::new(config)))
    })
    .with_options(OPTIONS)
    .with_dependencies(&[OBJECT])
}

/// Validated NIC filters.
#[derive(Debug, Clone)]
pub struct NetConfig {
    whitelist: Regex,
    blacklist: Regex,
}

impl NetConfig {
    pub fn from_settings(settings: &CollectorSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            whitelist: anchored(OPT_WHITELIST, settings.value(OPT_WHITELIST))?,
            blacklist: anchored(OPT_BLACKLIST, settings.value(OPT_BLACKLIST))?,
        })
    }

    /// Whether the adapter `name` passes both filters.
    pub fn includes(&self, name: &str) -> bool {
        self.whitelist.is_match(name) && !self.blacklist.is_match(name)
    }
}

/// Compiles `pattern` so that it must match the whole input.
pub(crate) fn anchored(option: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        option: option.to_string(),
        source,
    })
}

/// Replaces every character outside `[A-Za-z0-9]` with `_`.
pub fn mangle_nic_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[derive(Debug)]
pub struct NetCollector {
    config: NetConfig,
}

impl NetCollector {
    pub fn new(config: NetConfig) -> Self {
        Self { config }
    }
}

impl Collector for NetCollector {
    fn collect(&self, ctx: &ScrapeContext, sink: &dyn MetricSink) -> Result<(), CollectError> {
        let object = ctx.object(OBJECT)?;

        for nic in &object.instances {
            if !self.config.includes(&nic.name) {
                continue;
            }
            let label = mangle_nic_name(&nic.name);
            if label.is_empty() {
                continue;
            }
            table::emit(sink, SUBSYSTEM, METRICS, nic, "nic", &label);
        }
        Ok(())
    }
}
