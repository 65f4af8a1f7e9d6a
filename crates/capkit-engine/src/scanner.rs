//! Fleet-wide module completion scan.

use crate::fanout::fan_out;
use crate::modules::{ModuleSet, ProbeOrder, WorkspaceModule};
use capkit_core::{
    Document, DocumentStore, EngineConfig, ModuleStats, ProgramStats, Result, StoreConfig,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct FleetScanner {
    store: Arc<dyn DocumentStore>,
    layout: StoreConfig,
    config: EngineConfig,
    modules: ModuleSet,
}

impl FleetScanner {
    pub fn new(store: Arc<dyn DocumentStore>, layout: StoreConfig, config: EngineConfig) -> Self {
        Self {
            store,
            layout,
            config,
            modules: ModuleSet::program(),
        }
    }

    /// Replaces the tracked module list.
    pub fn with_modules(mut self, modules: ModuleSet) -> Self {
        self.modules = modules;
        self
    }

    /// Runs the scan. Store failures yield [`ProgramStats::failed`].
    pub async fn scan(&self) -> ProgramStats {
        match self.try_scan().await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Deep scan failed: {}", e);
                ProgramStats::failed()
            }
        }
    }

    /// Runs the scan, returning an error only when the user list is
    /// unreadable. Users whose modules fail to load are skipped and counted
    /// without contributing to any module count.
    #[instrument(skip(self), fields(modules = self.modules.len()))]
    pub async fn try_scan(&self) -> Result<ProgramStats> {
        let users = self
            .store
            .list_documents(&self.layout.users_collection)
            .await?;
        let total_users = users.len();

        let counters: Vec<AtomicUsize> = self
            .modules
            .modules()
            .iter()
            .map(|_| AtomicUsize::new(0))
            .collect();
        let samples = SampleCollector::new(&self.config);

        let results = fan_out(users, self.config.max_concurrent_users, |user| {
            let counters = &counters;
            let samples = &samples;
            async move {
                let result = self.scan_user(&user.id, counters, samples).await;
                (user.id, result)
            }
        })
        .await;

        let mut skipped_users = 0;
        for (user_id, result) in results {
            if let Err(e) = result {
                warn!(user = %user_id, "Skipping user in scan: {}", e);
                skipped_users += 1;
            }
        }

        let counts: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        let mut stats = summarize(
            self.modules.modules(),
            &counts,
            total_users,
            samples.into_samples(),
        );
        stats.skipped_users = skipped_users;

        info!(
            "Scanned {} users ({} skipped), bottleneck: {}",
            total_users, skipped_users, stats.top_bottleneck
        );
        Ok(stats)
    }

    async fn scan_user(
        &self,
        user_id: &str,
        counters: &[AtomicUsize],
        samples: &SampleCollector,
    ) -> Result<()> {
        let probes = self
            .modules
            .probe(self.store.as_ref(), &self.layout, user_id, ProbeOrder::Sequential)
            .await?;

        for (counter, probe) in counters.iter().zip(&probes) {
            if let Some(document) = &probe.document {
                counter.fetch_add(1, Ordering::SeqCst);
                samples.offer(probe.module, document);
            }
        }
        Ok(())
    }
}

/// Completion percentage, rounded half up. Zero when there are no users.
pub fn completion_rate(count: usize, total_users: usize) -> u32 {
    if total_users == 0 {
        return 0;
    }
    ((count as f64 / total_users as f64) * 100.0).round() as u32
}

/// Builds the scan result from per-module counts given in `modules` order.
/// Module stats keep that order; the bottleneck is the lowest rate, with ties
/// going to the earliest module.
pub fn summarize(
    modules: &[WorkspaceModule],
    counts: &[usize],
    total_users: usize,
    samples: Vec<String>,
) -> ProgramStats {
    let module_stats: Vec<ModuleStats> = modules
        .iter()
        .zip(counts)
        .map(|(module, &count)| ModuleStats {
            name: module.doc_id().to_string(),
            count,
            completion_rate: completion_rate(count, total_users),
        })
        .collect();

    let mut ranked: Vec<&ModuleStats> = module_stats.iter().collect();
    ranked.sort_by_key(|stats| stats.completion_rate);
    let top_bottleneck = ranked
        .first()
        .map(|stats| stats.name.clone())
        .unwrap_or_else(|| ProgramStats::NO_BOTTLENECK.to_string());

    ProgramStats {
        total_startups: total_users,
        module_stats,
        top_bottleneck,
        samples,
        skipped_users: 0,
    }
}

/// Collects a few random content snippets during a scan.
struct SampleCollector {
    state: Mutex<SampleState>,
    probability: f64,
    max_samples: usize,
    snippet_chars: usize,
}

struct SampleState {
    rng: fastrand::Rng,
    samples: Vec<String>,
}

impl SampleCollector {
    fn new(config: &EngineConfig) -> Self {
        let rng = match config.sample_seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            state: Mutex::new(SampleState {
                rng,
                samples: Vec::new(),
            }),
            probability: config.sample_probability,
            max_samples: config.max_samples,
            snippet_chars: config.sample_snippet_chars,
        }
    }

    fn offer(&self, module: WorkspaceModule, document: &Document) {
        let mut state = self.state.lock();
        if state.samples.len() >= self.max_samples {
            return;
        }
        if state.rng.f64() >= self.probability {
            return;
        }
        let Ok(serialized) = serde_json::to_string(document) else {
            return;
        };
        let snippet: String = serialized.chars().take(self.snippet_chars).collect();
        state.samples.push(format!("[{}]: {}...", module, snippet));
    }

    fn into_samples(self) -> Vec<String> {
        self.state.into_inner().samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completion_rate_rounding() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(5, 0), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn test_summarize_with_no_users() {
        let modules = ModuleSet::program();
        let counts = vec![0; modules.len()];
        let stats = summarize(modules.modules(), &counts, 0, Vec::new());
        assert!(stats.module_stats.iter().all(|m| m.completion_rate == 0));
        assert_eq!(stats.top_bottleneck, "canvas");
        assert_eq!(stats.total_startups, 0);
    }

    #[test]
    fn test_summarize_keeps_order_and_breaks_ties_stably() {
        let modules = [
            WorkspaceModule::Canvas,
            WorkspaceModule::Sales,
            WorkspaceModule::Grow,
            WorkspaceModule::Team,
        ];
        let stats = summarize(&modules, &[4, 1, 1, 3], 4, Vec::new());
        let names: Vec<_> = stats.module_stats.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["canvas", "sales", "grow", "team"]);
        assert_eq!(stats.top_bottleneck, "sales");
    }

    #[test]
    fn test_summarize_empty_module_list() {
        let stats = summarize(&[], &[], 10, Vec::new());
        assert!(stats.module_stats.is_empty());
        assert_eq!(stats.top_bottleneck, ProgramStats::NO_BOTTLENECK);
    }

    #[test]
    fn test_sample_collector_respects_cap_and_truncates() {
        let config = EngineConfig {
            sample_probability: 1.0,
            max_samples: 2,
            sample_snippet_chars: 10,
            ..EngineConfig::default()
        };
        let collector = SampleCollector::new(&config);
        let doc = match json!({"Problem": "Farmers lose crops to disease"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        for _ in 0..5 {
            collector.offer(WorkspaceModule::Canvas, &doc);
        }
        let samples = collector.into_samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0], "[canvas]: {\"Problem\"...");
    }

    #[test]
    fn test_sample_collector_zero_probability_collects_nothing() {
        let config = EngineConfig {
            sample_probability: 0.0,
            ..EngineConfig::default()
        };
        let collector = SampleCollector::new(&config);
        collector.offer(WorkspaceModule::Team, &Document::new());
        assert!(collector.into_samples().is_empty());
    }
}
