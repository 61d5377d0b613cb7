// Domain models: image references, metric records, per-cycle counters

use std::collections::BTreeMap;

use crate::version_compare::Decision;

pub const LABEL_IMAGE: &str = "image";
pub const LABEL_RUNNING_VERSION: &str = "running_version";
pub const LABEL_CURRENT_VERSION: &str = "current_version";

/// Image reference split into name and tag (`<name>:<tag>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub name: &'a str,
    pub tag: &'a str,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("could not get parts of the image {0}")]
    Malformed(String),
}

impl<'a> ImageReference<'a> {
    /// Splits on the last `:`. Digest references, a missing tag, and a colon
    /// that belongs to a registry port (`host:5000/app`) are malformed.
    pub fn parse(reference: &'a str) -> Result<Self, ReferenceError> {
        let malformed = || ReferenceError::Malformed(reference.to_string());
        if reference.contains('@') {
            return Err(malformed());
        }
        let (name, tag) = reference.rsplit_once(':').ok_or_else(malformed)?;
        if name.is_empty() || tag.is_empty() || tag.contains('/') {
            return Err(malformed());
        }
        Ok(Self { name, tag })
    }
}

/// One gauge sample: label set plus 0/1 status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub labels: BTreeMap<String, String>,
    pub status: i64,
}

impl MetricRecord {
    /// `cluster_info{running_version, current_version}`
    pub fn cluster(decision: &Decision) -> Self {
        Self {
            labels: BTreeMap::from([
                (LABEL_RUNNING_VERSION.to_string(), decision.versions.running.clone()),
                (LABEL_CURRENT_VERSION.to_string(), decision.versions.latest.clone()),
            ]),
            status: decision.status(),
        }
    }

    /// `image_info{image, running_version, current_version}`
    pub fn image(reference: &str, decision: &Decision) -> Self {
        let mut record = Self::cluster(decision);
        record
            .labels
            .insert(LABEL_IMAGE.to_string(), reference.to_string());
        record
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Outcome counts of the most recent image check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCounters {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}
