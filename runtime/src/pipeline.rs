//! Pipeline coordinator: extract every region, merge, partition, reduce.
//!
//! Regions are fetched one after another through a `RateLimiter`, so the
//! upstream service sees at most one request at a time with a minimum gap
//! between them. Reduction runs per group on rayon; `collect` keeps group
//! order, so output is identical to a sequential run.

use crate::acquisition::rate_limiter::RateLimiter;
use crate::acquisition::{extract, FacilitySource};
use crate::config::RegionTable;
use crate::error::{PipelineError, Result};
use crate::model::{FacilityRecord, GroupKey, ReducedMarkerSet};
use crate::reduction::{partition, Partitions, Reducer};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Progress notifications emitted while regions are extracted.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionProgress<'a> {
    Started(&'a GroupKey),
    Finished(&'a GroupKey, usize),
}

type ProgressHook = Box<dyn Fn(RegionProgress<'_>) + Send + Sync>;

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Every extracted record, in region order. Kept for full export.
    pub records: Vec<FacilityRecord>,
    /// One representative per cluster per group.
    pub markers: ReducedMarkerSet,
    /// Records fetched per configured region, in table order.
    pub region_counts: Vec<(GroupKey, usize)>,
}

impl PipelineRun {
    /// True when no region produced any data.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Sequences extraction and reduction for a region table.
pub struct Pipeline {
    source: Arc<dyn FacilitySource>,
    limiter: RateLimiter,
    reducer: Reducer,
    progress: Option<ProgressHook>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn FacilitySource>, request_delay: Duration, reducer: Reducer) -> Self {
        Self {
            source,
            limiter: RateLimiter::sequential(request_delay),
            reducer,
            progress: None,
        }
    }

    /// Install a callback for per-region progress.
    pub fn with_progress(
        mut self,
        hook: impl Fn(RegionProgress<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(hook));
        self
    }

    pub fn source(&self) -> &dyn FacilitySource {
        self.source.as_ref()
    }

    fn notify(&self, event: RegionProgress<'_>) {
        if let Some(hook) = &self.progress {
            hook(event);
        }
    }

    /// Run the whole pipeline.
    ///
    /// The table is validated before any request is made. Regions that fail
    /// or return nothing are skipped; if none return data the run is empty.
    pub async fn run(&self, table: &RegionTable) -> Result<PipelineRun> {
        table.validate()?;

        let mut records = Vec::new();
        let mut region_counts = Vec::with_capacity(table.regions.len());

        for region in &table.regions {
            let query = region.query();
            let key = region.group_key();
            self.notify(RegionProgress::Started(&key));

            let fetched = {
                let _guard = self.limiter.acquire().await;
                extract(self.source.as_ref(), &query).await
            };

            self.notify(RegionProgress::Finished(&key, fetched.len()));
            region_counts.push((key, fetched.len()));
            records.extend(fetched);
        }

        if records.is_empty() {
            info!("no facilities found in any region");
            return Ok(PipelineRun {
                records,
                markers: ReducedMarkerSet::default(),
                region_counts,
            });
        }

        info!("total facilities found: {}", records.len());
        let partitions = partition(records.iter().cloned());
        let markers = reduce_partitions(&partitions, table, &self.reducer)?;
        info!("reduced to {} markers", markers.len());

        Ok(PipelineRun {
            records,
            markers,
            region_counts,
        })
    }
}

/// Reduce every group with its configured divisor, concatenating results in
/// group order.
pub fn reduce_partitions(
    partitions: &Partitions,
    table: &RegionTable,
    reducer: &Reducer,
) -> Result<ReducedMarkerSet> {
    let per_group: Vec<Vec<FacilityRecord>> = partitions
        .groups()
        .par_iter()
        .map(|(key, group)| {
            let divisor = table
                .divisor_for(key)
                .ok_or_else(|| PipelineError::UnknownGroup {
                    group: key.to_string(),
                })?;
            reducer.reduce(key, group, divisor)
        })
        .collect::<Result<_>>()?;

    Ok(per_group.into_iter().flatten().collect::<Vec<_>>().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::error::ExtractError;
    use crate::model::{BoundingBox, FacilityId, FacilityKind, RegionQuery};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// In-memory source keyed by region name; `Err` entries simulate failures.
    struct FakeSource {
        responses: HashMap<String, std::result::Result<Vec<(f64, f64)>, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(entries: Vec<(&str, std::result::Result<Vec<(f64, f64)>, u16>)>) -> Self {
            Self {
                responses: entries
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FacilitySource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn attribute_keys(&self) -> &[&'static str] {
            &["capacity"]
        }

        async fn fetch(
            &self,
            query: &RegionQuery,
        ) -> std::result::Result<Vec<FacilityRecord>, ExtractError> {
            self.calls.lock().unwrap().push(query.region.clone());
            match self.responses.get(&query.region) {
                Some(Ok(points)) => Ok(points
                    .iter()
                    .enumerate()
                    .map(|(i, &(lat, lon))| FacilityRecord {
                        id: FacilityId::Num(i as i64),
                        kind: FacilityKind::Point,
                        latitude: lat,
                        longitude: lon,
                        name: format!("Parking {i}"),
                        attributes: BTreeMap::new(),
                        group_key: query.group_key(),
                    })
                    .collect()),
                Some(Err(status)) => Err(ExtractError::Status(*status)),
                None => Ok(Vec::new()),
            }
        }
    }

    fn region(name: &str, divisor: usize) -> RegionConfig {
        RegionConfig::new(name, "XX", BoundingBox::new(0.0, 0.0, 1.0, 1.0), divisor)
    }

    fn pipeline(source: Arc<FakeSource>) -> Pipeline {
        Pipeline::new(source, Duration::ZERO, Reducer::default())
    }

    #[tokio::test]
    async fn test_failed_region_does_not_abort() {
        let source = Arc::new(FakeSource::new(vec![
            ("Phoenix", Err(500)),
            ("Tampa", Ok(vec![(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (10.0, 10.0), (10.0, 11.0)])),
        ]));
        let table = RegionTable {
            regions: vec![region("Phoenix", 10), region("Tampa", 2)],
        };

        let run = pipeline(source.clone()).run(&table).await.unwrap();

        assert_eq!(*source.calls.lock().unwrap(), vec!["Phoenix", "Tampa"]);
        assert_eq!(run.records.len(), 5);
        assert_eq!(run.markers.len(), 2);
        assert!(run.markers.iter().all(|m| m.group_key.region == "Tampa"));
        assert_eq!(run.region_counts[0].1, 0);
        assert_eq!(run.region_counts[1].1, 5);
    }

    #[tokio::test]
    async fn test_all_regions_empty_is_no_data() {
        let source = Arc::new(FakeSource::new(vec![("Phoenix", Err(429))]));
        let table = RegionTable {
            regions: vec![region("Phoenix", 10), region("Tampa", 10)],
        };

        let run = pipeline(source).run(&table).await.unwrap();
        assert!(run.is_empty());
        assert!(run.markers.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_requests() {
        let source = Arc::new(FakeSource::new(vec![]));
        let table = RegionTable {
            regions: vec![region("Phoenix", 10), region("Tampa", 0)],
        };

        let err = pipeline(source.clone()).run(&table).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidDivisor { .. }));
        assert!(source.calls.lock().unwrap().is_empty());

        let err = pipeline(source.clone())
            .run(&RegionTable { regions: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoRegions));
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_groups_keep_table_order_and_own_divisor() {
        let dense: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 * 0.01, 0.0)).collect();
        let source = Arc::new(FakeSource::new(vec![
            ("Atlanta", Ok(dense.clone())),
            ("Phoenix", Ok(dense)),
        ]));
        let table = RegionTable {
            regions: vec![region("Atlanta", 10), region("Phoenix", 40)],
        };

        let run = pipeline(source).run(&table).await.unwrap();
        let counts = run.markers.counts_by_group();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].0.region, "Atlanta");
        assert_eq!(counts[0].1, 4);
        assert_eq!(counts[1].0.region, "Phoenix");
        assert_eq!(counts[1].1, 1);
    }

    #[tokio::test]
    async fn test_progress_hook_sees_every_region() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let source = Arc::new(FakeSource::new(vec![("Tampa", Ok(vec![(1.0, 1.0)]))]));
        let table = RegionTable {
            regions: vec![region("Tampa", 5), region("Atlanta", 5)],
        };

        pipeline(source)
            .with_progress(move |event| {
                if let RegionProgress::Finished(key, n) = event {
                    sink.lock().unwrap().push((key.region.clone(), n));
                }
            })
            .run(&table)
            .await
            .unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("Tampa".to_string(), 1), ("Atlanta".to_string(), 0)]
        );
    }

    #[test]
    fn test_reduce_partitions_unknown_group() {
        let record = FacilityRecord {
            id: FacilityId::Num(1),
            kind: FacilityKind::Point,
            latitude: 0.0,
            longitude: 0.0,
            name: "Parking 1".into(),
            attributes: BTreeMap::new(),
            group_key: GroupKey::new("Nowhere", "ZZ"),
        };
        let parts = partition(vec![record]);
        let err = reduce_partitions(&parts, &RegionTable::default(), &Reducer::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownGroup { .. }));
    }

    /// Source that takes `latency` per call and records when each call ran.
    struct SlowSource {
        latency: Duration,
        spans: Mutex<Vec<(std::time::Instant, std::time::Instant)>>,
    }

    #[async_trait]
    impl FacilitySource for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        fn attribute_keys(&self) -> &[&'static str] {
            &[]
        }

        async fn fetch(
            &self,
            _query: &RegionQuery,
        ) -> std::result::Result<Vec<FacilityRecord>, ExtractError> {
            let start = std::time::Instant::now();
            tokio::time::sleep(self.latency).await;
            self.spans
                .lock()
                .unwrap()
                .push((start, std::time::Instant::now()));
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_pause_follows_slow_requests() {
        let delay = Duration::from_millis(300);
        let source = Arc::new(SlowSource {
            latency: Duration::from_millis(400),
            spans: Mutex::new(Vec::new()),
        });
        let table = RegionTable {
            regions: vec![region("Phoenix", 10), region("Tampa", 10)],
        };

        let began = std::time::Instant::now();
        let pipeline = Pipeline::new(source.clone(), delay, Reducer::default());
        pipeline.run(&table).await.unwrap();

        let spans = source.spans.lock().unwrap();
        assert_eq!(spans.len(), 2);
        // No pause before the first request
        assert!(spans[0].0.duration_since(began) < Duration::from_millis(200));
        // Full pause between the end of one request and the start of the next
        assert!(spans[1].0.duration_since(spans[0].1) >= delay);
    }
}
