//! Prometheus text exposition of collected samples.
//!
//! Samples are grouped into families by name and replayed into a throwaway
//! `prometheus::Registry`, which owns the actual wire encoding.

use std::collections::HashMap;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tracing::warn;

use crate::metric::{MetricKind, Sample};

#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("metric encoding failed: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("encoded metrics are not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// `Content-Type` header value matching [`encode`]'s output.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

struct Family<'a> {
    name: &'a str,
    help: &'a str,
    kind: MetricKind,
    label_keys: Vec<&'a str>,
    samples: Vec<&'a Sample>,
}

fn group(samples: &[Sample]) -> Vec<Family<'_>> {
    let mut families: Vec<Family<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for sample in samples {
        let keys: Vec<&str> = sample.labels.iter().map(|(k, _)| k.as_str()).collect();
        match index.get(sample.name.as_str()) {
            Some(&i) => {
                let family = &mut families[i];
                if family.kind != sample.kind || family.label_keys != keys {
                    warn!(
                        metric = %sample.name,
                        "dropping sample with inconsistent type or label set"
                    );
                    continue;
                }
                family.samples.push(sample);
            }
            None => {
                index.insert(sample.name.as_str(), families.len());
                families.push(Family {
                    name: &sample.name,
                    help: &sample.help,
                    kind: sample.kind,
                    label_keys: keys,
                    samples: vec![sample],
                });
            }
        }
    }
    families
}

fn register_family(registry: &Registry, family: &Family<'_>) -> Result<(), prometheus::Error> {
    // The client library rejects empty help strings.
    let help = if family.help.is_empty() {
        family.name
    } else {
        family.help
    };
    let opts = Opts::new(family.name, help);

    match family.kind {
        MetricKind::Gauge => {
            let vec = GaugeVec::new(opts, family.label_keys.as_slice())?;
            for sample in &family.samples {
                let values: Vec<&str> = sample.labels.iter().map(|(_, v)| v.as_str()).collect();
                vec.with_label_values(values.as_slice()).set(sample.value);
            }
            registry.register(Box::new(vec))
        }
        MetricKind::Counter => {
            let vec = CounterVec::new(opts, family.label_keys.as_slice())?;
            let mut kept = 0;
            for sample in &family.samples {
                if !(sample.value >= 0.0) {
                    warn!(metric = %sample.name, value = sample.value, "dropping negative counter");
                    continue;
                }
                let values: Vec<&str> = sample.labels.iter().map(|(_, v)| v.as_str()).collect();
                vec.with_label_values(values.as_slice()).inc_by(sample.value);
                kept += 1;
            }
            // A family without children has nothing to expose.
            if kept == 0 {
                return Ok(());
            }
            registry.register(Box::new(vec))
        }
    }
}

/// Encodes samples in the Prometheus text format.
///
/// A family that the client library refuses (invalid name, label clash) is
/// logged and left out; the rest of the output is unaffected.
pub fn encode(samples: &[Sample]) -> Result<String, ExpositionError> {
    let registry = Registry::new();
    for family in group(samples) {
        if let Err(e) = register_family(&registry, &family) {
            warn!(metric = family.name, error = %e, "skipping metric family");
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
