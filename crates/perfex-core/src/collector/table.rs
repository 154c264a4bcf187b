//! Table-driven mapping from counter names to metrics.

use crate::metric::{MetricKind, MetricSink, NAMESPACE, Sample, fq_name};
use crate::provider::CounterInstance;

/// One counter of a counter object and the metric it becomes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CounterMetric {
    pub counter: &'static str,
    pub metric: &'static str,
    pub kind: MetricKind,
    pub help: &'static str,
}

pub(crate) const fn counter(
    counter: &'static str,
    metric: &'static str,
    help: &'static str,
) -> CounterMetric {
    CounterMetric {
        counter,
        metric,
        kind: MetricKind::Counter,
        help,
    }
}

pub(crate) const fn gauge(
    counter: &'static str,
    metric: &'static str,
    help: &'static str,
) -> CounterMetric {
    CounterMetric {
        counter,
        metric,
        kind: MetricKind::Gauge,
        help,
    }
}

/// Emits one sample per table row for `instance`, labelled `label = value`.
pub(crate) fn emit(
    sink: &dyn MetricSink,
    subsystem: &str,
    table: &[CounterMetric],
    instance: &CounterInstance,
    label: &str,
    value: &str,
) {
    for row in table {
        sink.push(Sample {
            name: fq_name(NAMESPACE, subsystem, row.metric),
            help: row.help.to_string(),
            labels: vec![(label.to_string(), value.to_string())],
            value: instance.value(row.counter),
            kind: row.kind,
        });
    }
}
