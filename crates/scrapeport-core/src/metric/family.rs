use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::error::{Result, ScrapeError};

use super::{Desc, MetricFamily, MetricPoint, PointValue};

/// Per-label-set value cell. Each cell owns its synchronization.
pub(crate) trait Child: Send + Sync + 'static {
    type Config: Send + Sync + PartialEq + fmt::Debug;

    fn new(config: &Self::Config) -> Self;
    fn point_value(&self) -> PointValue;
}

/// Children of one instrument:
/// - the unlabelled child (eager when the schema is empty, lazy otherwise)
/// - `label values -> child` for labelled access
pub(crate) struct Family<C: Child> {
    desc: Desc,
    config: C::Config,
    unlabelled: OnceLock<Arc<C>>,
    children: DashMap<Vec<String>, Arc<C>>,
}

impl<C: Child> Family<C> {
    pub(crate) fn new(desc: Desc, config: C::Config) -> Self {
        let unlabelled = OnceLock::new();
        if desc.label_names.is_empty() {
            let _ = unlabelled.set(Arc::new(C::new(&config)));
        }
        Self {
            desc,
            config,
            unlabelled,
            children: DashMap::new(),
        }
    }

    pub(crate) fn desc(&self) -> &Desc {
        &self.desc
    }

    pub(crate) fn config(&self) -> &C::Config {
        &self.config
    }

    pub(crate) fn unlabelled(&self) -> &C {
        self.unlabelled
            .get_or_init(|| Arc::new(C::new(&self.config)))
            .as_ref()
    }

    pub(crate) fn with_label_values(&self, values: &[&str]) -> Result<Arc<C>> {
        if values.len() != self.desc.label_names.len() {
            return Err(ScrapeError::InvalidArgument(format!(
                "{} expects {} label values, got {}",
                self.desc.name,
                self.desc.label_names.len(),
                values.len()
            )));
        }
        if values.is_empty() {
            return Ok(Arc::clone(
                self.unlabelled
                    .get_or_init(|| Arc::new(C::new(&self.config))),
            ));
        }

        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        if let Some(existing) = self.children.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }
        let child = self
            .children
            .entry(key)
            .or_insert_with(|| Arc::new(C::new(&self.config)));
        Ok(Arc::clone(child.value()))
    }

    pub(crate) fn remove_label_values(&self, values: &[&str]) -> bool {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.children.remove(&key).is_some()
    }

    /// Read every child independently. Labelled children are sorted by label
    /// values so output is deterministic.
    pub(crate) fn collect(&self) -> MetricFamily {
        let mut points = Vec::with_capacity(self.children.len() + 1);

        if let Some(child) = self.unlabelled.get() {
            points.push(MetricPoint {
                label_values: Vec::new(),
                value: child.point_value(),
                timestamp_ms: None,
            });
        }

        let mut labelled: Vec<(Vec<String>, Arc<C>)> = self
            .children
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        labelled.sort_by(|a, b| a.0.cmp(&b.0));

        for (label_values, child) in labelled {
            points.push(MetricPoint {
                label_values,
                value: child.point_value(),
                timestamp_ms: None,
            });
        }

        MetricFamily {
            name: self.desc.name.clone(),
            help: self.desc.help.clone(),
            kind: self.desc.kind,
            label_names: self.desc.label_names.clone(),
            points,
        }
    }
}
