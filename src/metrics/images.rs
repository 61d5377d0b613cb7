// Image records and cycle counters published together from one snapshot.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{IntGauge, IntGaugeVec, Opts};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

use super::snapshot::render_records;
use crate::models::{CycleCounters, MetricRecord};

/// What one successful image listing published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageState {
    pub counters: CycleCounters,
    pub records: Arc<Vec<MetricRecord>>,
}

/// `image_info` plus the `images_*` counters. A scrape renders all four
/// families from the same `ImageState`, so counters never disagree with each
/// other or with the record set.
#[derive(Clone)]
pub struct ImageGauges {
    info_opts: Opts,
    label_names: &'static [&'static str],
    total_opts: Opts,
    success_opts: Opts,
    error_opts: Opts,
    info_template: IntGaugeVec,
    total_template: IntGauge,
    success_template: IntGauge,
    error_template: IntGauge,
    current: Arc<RwLock<Arc<ImageState>>>,
}

impl ImageGauges {
    pub fn new(
        info_opts: Opts,
        label_names: &'static [&'static str],
        total_opts: Opts,
        success_opts: Opts,
        error_opts: Opts,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            info_template: IntGaugeVec::new(info_opts.clone(), label_names)?,
            total_template: IntGauge::with_opts(total_opts.clone())?,
            success_template: IntGauge::with_opts(success_opts.clone())?,
            error_template: IntGauge::with_opts(error_opts.clone())?,
            info_opts,
            label_names,
            total_opts,
            success_opts,
            error_opts,
            current: Arc::new(RwLock::new(Arc::new(ImageState::default()))),
        })
    }

    /// Publishes `counters`, and `records` when given. `None` keeps the
    /// current record set next to the new counters.
    pub fn replace(&self, counters: CycleCounters, records: Option<Vec<MetricRecord>>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let records = match records {
            Some(records) => Arc::new(records),
            None => current.records.clone(),
        };
        *current = Arc::new(ImageState { counters, records });
    }

    pub fn snapshot(&self) -> Arc<ImageState> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn render(&self, state: &ImageState) -> prometheus::Result<Vec<MetricFamily>> {
        let mut families = render_records(&self.info_opts, self.label_names, &state.records)?;
        for (opts, value) in [
            (&self.total_opts, state.counters.total),
            (&self.success_opts, state.counters.succeeded),
            (&self.error_opts, state.counters.failed),
        ] {
            let gauge = IntGauge::with_opts(opts.clone())?;
            gauge.set(value as i64);
            families.extend(gauge.collect());
        }
        Ok(families)
    }
}

impl Collector for ImageGauges {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.info_template.desc();
        descs.extend(self.total_template.desc());
        descs.extend(self.success_template.desc());
        descs.extend(self.error_template.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let state = self.snapshot();
        match self.render(&state) {
            Ok(families) => families,
            Err(e) => {
                warn!(error = %e, metric = %self.info_opts.name, "failed to render image snapshot");
                Vec::new()
            }
        }
    }
}
