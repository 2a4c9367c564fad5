use crate::page::{PageContext, PageError};
use crate::snapshot::{LongTask, NetworkFailure, PerformanceSnapshot, Rating, SlowResource, VitalReading};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;

/// Resources slower than this are reported
pub const SLOW_RESOURCE_MS: u64 = 1000;

/// Extra time granted to the browser beyond the sampling window
const GRACE: Duration = Duration::from_secs(2);

/// Observes the page for `arguments[0]` ms, then disconnects every observer
/// from an in-page timer and reports. Entry types the engine does not
/// support are skipped.
const SAMPLER_SCRIPT: &str = r#"
const windowMs = arguments[0];
const slowMs = arguments[1];
const done = arguments[arguments.length - 1];
const out = { vitals: {}, longTasks: [], slowResources: [], networkFailures: [] };
const observers = [];

function observe(type, onEntry) {
    try {
        if (typeof PerformanceObserver === 'undefined') return;
        const supported = PerformanceObserver.supportedEntryTypes || [];
        if (supported.indexOf(type) === -1) return;
        const observer = new PerformanceObserver(function (list) {
            list.getEntries().forEach(onEntry);
        });
        observer.observe({ type: type, buffered: true });
        observers.push(observer);
    } catch (e) {}
}

observe('largest-contentful-paint', function (e) {
    out.vitals.LCP = e.renderTime || e.loadTime || e.startTime;
});
observe('first-input', function (e) {
    out.vitals.FID = e.processingStart - e.startTime;
});
let cls = 0;
observe('layout-shift', function (e) {
    if (!e.hadRecentInput) { cls += e.value; out.vitals.CLS = cls; }
});
observe('longtask', function (e) {
    out.longTasks.push({ duration: e.duration, startTime: e.startTime });
});
observe('resource', function (e) {
    if (e.duration > slowMs) {
        out.slowResources.push({ name: e.name, duration: e.duration, size: e.transferSize || 0 });
    }
    if (e.responseStatus && e.responseStatus >= 400) {
        out.networkFailures.push({ name: e.name, status: e.responseStatus });
    }
});

setTimeout(function () {
    observers.forEach(function (o) { try { o.disconnect(); } catch (e) {} });
    done(out);
}, windowMs);
"#;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSample {
    #[serde(default)]
    vitals: BTreeMap<String, f64>,
    #[serde(default)]
    long_tasks: Vec<LongTask>,
    #[serde(default)]
    slow_resources: Vec<SlowResource>,
    #[serde(default)]
    network_failures: Vec<NetworkFailure>,
}

/// Samples Core Web Vitals, long tasks and slow or failed resources
#[derive(Debug, Clone)]
pub struct PerformanceSampler {
    window: Duration,
}

impl PerformanceSampler {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Sample the page. `None` when the sampler could not run.
    pub async fn collect(&self, page: &dyn PageContext) -> Option<PerformanceSnapshot> {
        match self.sample(page).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                ::log::warn!("Performance collection partial failure: {}", e);
                None
            }
        }
    }

    async fn sample(&self, page: &dyn PageContext) -> Result<PerformanceSnapshot, PageError> {
        let limit = self.window + GRACE;
        let args = vec![json!(self.window.as_millis() as u64), json!(SLOW_RESOURCE_MS)];

        let raw = tokio::time::timeout(limit, page.execute_async(SAMPLER_SCRIPT, args))
            .await
            .map_err(|_| PageError::Timeout(limit.as_millis() as u64))??;

        let sample: RawSample = serde_json::from_value(raw)?;
        Ok(rate_sample(sample))
    }
}

fn rate_sample(sample: RawSample) -> PerformanceSnapshot {
    let core_vitals = sample
        .vitals
        .into_iter()
        .filter_map(|(metric, value)| {
            Rating::classify(&metric, value).map(|rating| (metric, VitalReading { value, rating }))
        })
        .collect();

    PerformanceSnapshot {
        core_vitals,
        long_tasks: sample.long_tasks,
        slow_resources: sample.slow_resources,
        network_failures: sample.network_failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_sample_classifies_vitals() {
        let raw: RawSample = serde_json::from_value(json!({
            "vitals": {"LCP": 4200.0, "FID": 50.0, "CLS": 0.12, "FCP": 900.0},
            "longTasks": [{"duration": 120.0, "startTime": 10.0}],
            "slowResources": [{"name": "https://cdn.example.com/app.js", "duration": 1800.0, "size": 51200}],
            "networkFailures": [{"name": "https://api.example.com/user", "status": 500}]
        }))
        .unwrap();

        let snapshot = rate_sample(raw);
        assert_eq!(snapshot.core_vitals["LCP"].rating, Rating::Poor);
        assert_eq!(snapshot.core_vitals["FID"].rating, Rating::Good);
        assert_eq!(snapshot.core_vitals["CLS"].rating, Rating::NeedsImprovement);
        // No thresholds for FCP
        assert!(!snapshot.core_vitals.contains_key("FCP"));
        assert_eq!(snapshot.long_tasks.len(), 1);
        assert_eq!(snapshot.slow_resources[0].size, 51200);
        assert_eq!(snapshot.network_failures[0].status, Some(500));
        assert_eq!(snapshot.poor_vitals(), vec!["LCP"]);
    }

    #[test]
    fn test_missing_fields_default() {
        let raw: RawSample = serde_json::from_value(json!({})).unwrap();
        assert!(rate_sample(raw).is_empty());
    }
}
