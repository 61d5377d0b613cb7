// Gauge family rendered from an immutable snapshot that is swapped as a whole.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntGaugeVec, Opts};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

use crate::models::MetricRecord;

/// A labelled gauge whose samples are replaced atomically. Scrapes render
/// either the previous or the next record set, never a mix.
#[derive(Clone)]
pub struct SnapshotGauge {
    opts: Opts,
    label_names: &'static [&'static str],
    template: IntGaugeVec,
    current: Arc<RwLock<Arc<Vec<MetricRecord>>>>,
}

impl SnapshotGauge {
    pub fn new(opts: Opts, label_names: &'static [&'static str]) -> prometheus::Result<Self> {
        let template = IntGaugeVec::new(opts.clone(), label_names)?;
        Ok(Self {
            opts,
            label_names,
            template,
            current: Arc::new(RwLock::new(Arc::new(Vec::new()))),
        })
    }

    /// Publishes `records` in place of the current set.
    pub fn replace(&self, records: Vec<MetricRecord>) {
        let next = Arc::new(records);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    pub fn snapshot(&self) -> Arc<Vec<MetricRecord>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

}

/// Renders `records` as one labelled gauge family.
pub(super) fn render_records(
    opts: &Opts,
    label_names: &[&str],
    records: &[MetricRecord],
) -> prometheus::Result<Vec<MetricFamily>> {
    let vec = IntGaugeVec::new(opts.clone(), label_names)?;
    for record in records {
        let values: Vec<&str> = label_names
            .iter()
            .map(|name| record.label(name).unwrap_or_default())
            .collect();
        vec.get_metric_with_label_values(&values)?
            .set(record.status);
    }
    Ok(vec.collect())
}

impl Collector for SnapshotGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.template.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let records = self.snapshot();
        match render_records(&self.opts, self.label_names, &records) {
            Ok(families) => families,
            Err(e) => {
                warn!(error = %e, metric = %self.opts.name, "failed to render gauge snapshot");
                Vec::new()
            }
        }
    }
}
