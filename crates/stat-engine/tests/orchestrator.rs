use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use stat_core::{ArtifactKind, CellValue, Dataset, Fingerprint};
use stat_engine::{
    BackendError, ComputeBackend, InlineBackend, JobRequest, NoProgress, Outcome, PipelineEventKind,
    PipelineOrchestrator, ProgressScope, RecordingSink, WorkerBackend,
};
use stat_persistence::{ArtifactCache, KeyValueStore, StorageError};
use tokio_util::sync::CancellationToken;

fn dataset(shift: f64) -> Dataset {
    let n = 40;
    Dataset::from_columns(vec![
        ("a".into(), (0..n).map(|i| CellValue::Number(i as f64 + shift)).collect()),
        ("b".into(), (0..n).map(|i| CellValue::Number(((i * 7) % 11) as f64)).collect()),
        ("c".into(), (0..n).map(|i| CellValue::Number((i as f64 * 0.3).sin())).collect()),
    ])
    .unwrap()
}

/// Delega en `InlineBackend`, cuenta invocaciones por job y puede demorar
/// cada una.
struct CountingBackend {
    inner: InlineBackend,
    delay: Duration,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingBackend {
    fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(Self { inner: InlineBackend::new(), delay: Duration::from_millis(delay_ms), calls: Mutex::default() })
    }

    fn calls(&self, kind: ArtifactKind) -> usize { self.calls.lock().unwrap().get(kind.job_name()).copied().unwrap_or(0) }
}

#[async_trait]
impl ComputeBackend for CountingBackend {
    fn name(&self) -> &str { "counting" }

    async fn run(&self, request: JobRequest, progress: ProgressScope, cancel: CancellationToken) -> Result<Value, BackendError> {
        *self.calls.lock().unwrap().entry(request.job_name.clone()).or_default() += 1;
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = cancel.cancelled() => return Err(BackendError::Cancelled),
        }
        self.inner.run(request, progress, cancel).await
    }

    fn reset(&self) { self.inner.reset(); }
}

/// Store que falla en toda operación.
struct BrokenStore;

impl KeyValueStore for BrokenStore {
    fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> { Err(StorageError::TransientIo("down".into())) }
    fn set(&self, _key: &str, _value: &Value) -> Result<(), StorageError> { Err(StorageError::TransientIo("down".into())) }
    fn remove(&self, _key: &str) -> Result<(), StorageError> { Err(StorageError::TransientIo("down".into())) }
    fn remove_many(&self, _keys: &[&str]) -> Result<(), StorageError> { Err(StorageError::TransientIo("down".into())) }
    fn replace_prefix(&self, _prefix: &str, _entries: &[(&str, Value)]) -> Result<(), StorageError> {
        Err(StorageError::TransientIo("down".into()))
    }
    fn keys(&self) -> Result<Vec<String>, StorageError> { Err(StorageError::TransientIo("down".into())) }
    fn clear(&self) -> Result<(), StorageError> { Err(StorageError::TransientIo("down".into())) }
}

fn started(orch: &PipelineOrchestrator, kind: ArtifactKind) -> usize {
    orch.events()
        .list(orch.session_id())
        .iter()
        .filter(|e| e.kind == PipelineEventKind::StageStarted { kind })
        .count()
}

#[tokio::test]
async fn second_request_is_a_cache_hit_without_progress() {
    let backend = CountingBackend::new(0);
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend.clone());
    let d = dataset(0.0);

    let first_sink = Arc::new(RecordingSink::new());
    let first = orch.request(ArtifactKind::PValues, &d, first_sink.clone(), None).await.unwrap();
    assert!(first.is_ready());
    let values = first_sink.values();
    assert!(!values.is_empty());
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));

    let second_sink = Arc::new(RecordingSink::new());
    let second = orch.request(ArtifactKind::PValues, &d, second_sink.clone(), None).await.unwrap();
    assert_eq!(first, second);
    assert!(second_sink.values().is_empty());
    assert_eq!(backend.calls(ArtifactKind::PValues), 1);
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 1);
    assert_eq!(started(&orch, ArtifactKind::PValues), 1);
}

#[tokio::test]
async fn prerequisite_is_shared_between_dependents() {
    let backend = CountingBackend::new(0);
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend.clone());
    let d = dataset(0.0);
    orch.request(ArtifactKind::RegularCorrelations, &d, Arc::new(NoProgress), None).await.unwrap();
    orch.request(ArtifactKind::PcaLoadings, &d, Arc::new(NoProgress), None).await.unwrap();
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 1);
    let hits = orch
        .events()
        .list(orch.session_id())
        .iter()
        .filter(|e| e.kind == PipelineEventKind::CacheHit { kind: ArtifactKind::NumbersOnly })
        .count();
    assert_eq!(hits, 1);
}

#[tokio::test]
async fn new_dataset_invalidates_everything() {
    let backend = CountingBackend::new(0);
    let cache = ArtifactCache::in_memory();
    let orch = PipelineOrchestrator::new(cache.clone(), backend.clone());
    let (d1, d2) = (dataset(0.0), dataset(1.0));

    orch.request(ArtifactKind::NumbersOnly, &d1, Arc::new(NoProgress), None).await.unwrap();
    let s1 = orch.session_id();
    orch.request(ArtifactKind::NumbersOnly, &d2, Arc::new(NoProgress), None).await.unwrap();
    assert_ne!(s1, orch.session_id());
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 2);
    assert_eq!(cache.get_fingerprint().unwrap(), Some(Fingerprint::of(&d2)));
    assert_eq!(cache.get_dataset().unwrap(), Some(d2));
}

#[tokio::test]
async fn fingerprint_override_controls_invalidation() {
    let backend = CountingBackend::new(0);
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend.clone());
    orch.request(ArtifactKind::NumbersOnly, &dataset(0.0), Arc::new(NoProgress), Some("v1")).await.unwrap();
    // mismo override: se considera el mismo dataset
    orch.request(ArtifactKind::NumbersOnly, &dataset(5.0), Arc::new(NoProgress), Some("v1")).await.unwrap();
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 1);
}

#[tokio::test]
async fn concurrent_requests_run_the_kernel_once() {
    let backend = CountingBackend::new(150);
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend.clone());
    let d = dataset(0.0);

    let (a, b) = tokio::join!(
        orch.request(ArtifactKind::NumbersOnly, &d, Arc::new(NoProgress), None),
        orch.request(ArtifactKind::NumbersOnly, &d, Arc::new(NoProgress), None),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.is_ready());
    assert_eq!(b, Outcome::AlreadyComputing);
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 1);
    assert!(!orch.is_computing(ArtifactKind::NumbersOnly));

    let rejected = orch
        .events()
        .list(orch.session_id())
        .iter()
        .any(|e| e.kind == PipelineEventKind::SingleFlightRejected { kind: ArtifactKind::NumbersOnly });
    assert!(rejected);
}

#[tokio::test]
async fn new_fingerprint_discards_in_flight_result() {
    let backend = CountingBackend::new(300);
    let cache = ArtifactCache::in_memory();
    let orch = PipelineOrchestrator::new(cache.clone(), backend.clone());
    let (d1, d2) = (dataset(0.0), dataset(1.0));

    let (old, new) = tokio::join!(orch.request(ArtifactKind::NumbersOnly, &d1, Arc::new(NoProgress), None), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        orch.request(ArtifactKind::DataTypes, &d2, Arc::new(NoProgress), None).await
    });
    assert_eq!(old.unwrap(), Outcome::Cancelled);
    assert!(new.unwrap().is_ready());
    assert!(cache.get(ArtifactKind::NumbersOnly).unwrap().is_none());
    assert!(!orch.is_computing(ArtifactKind::NumbersOnly));
}

#[tokio::test]
async fn reset_cancels_and_leaves_no_stale_handle() {
    let backend = CountingBackend::new(300);
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend.clone());
    let d = dataset(0.0);

    let (cancelled, _) = tokio::join!(orch.request(ArtifactKind::PValues, &d, Arc::new(NoProgress), None), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        orch.reset_session();
    });
    // el prerrequisito se canceló: p-values nunca llegó al backend
    assert_eq!(cancelled.unwrap(), Outcome::Cancelled);
    assert_eq!(backend.calls(ArtifactKind::PValues), 0);
    assert!(!orch.is_computing(ArtifactKind::NumbersOnly));
    assert!(!orch.is_computing(ArtifactKind::PValues));

    let again = orch.request(ArtifactKind::PValues, &d, Arc::new(NoProgress), None).await.unwrap();
    assert!(again.is_ready());
}

#[tokio::test]
async fn storage_failures_are_treated_as_misses() {
    let backend = CountingBackend::new(0);
    let orch = PipelineOrchestrator::new(ArtifactCache::new(Arc::new(BrokenStore)), backend.clone());
    let d = dataset(0.0);
    let first = orch.request(ArtifactKind::NumbersOnly, &d, Arc::new(NoProgress), None).await.unwrap();
    let second = orch.request(ArtifactKind::NumbersOnly, &d, Arc::new(NoProgress), None).await.unwrap();
    assert!(first.is_ready());
    assert_eq!(first, second);
    assert_eq!(backend.calls(ArtifactKind::NumbersOnly), 2);
}

#[tokio::test]
async fn dataset_without_numbers_cannot_be_correlated() {
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), Arc::new(InlineBackend::new()));
    let d = Dataset::from_columns(vec![(
        "name".into(),
        (0..30).map(|i| CellValue::Text(format!("person {i}"))).collect(),
    )])
    .unwrap();
    let out = orch.request(ArtifactKind::RegularCorrelations, &d, Arc::new(NoProgress), None).await.unwrap();
    assert!(matches!(out, Outcome::CannotCompute(_)));
    assert!(!orch.is_computing(ArtifactKind::RegularCorrelations));
}

#[tokio::test]
async fn one_numeric_column_cannot_be_correlated() {
    let d = Dataset::from_columns(vec![
        ("age".into(), (0..40).map(|i| CellValue::Number(20.0 + (i % 13) as f64)).collect()),
        ("name".into(), (0..40).map(|i| CellValue::Text(format!("person {i}"))).collect()),
    ])
    .unwrap();
    let backends: [Arc<dyn ComputeBackend>; 2] = [Arc::new(InlineBackend::new()), Arc::new(WorkerBackend::new())];
    for backend in backends {
        let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), backend);
        let numbers = orch.request(ArtifactKind::NumbersOnly, &d, Arc::new(NoProgress), None).await.unwrap();
        let frame = numbers.ready().unwrap();
        assert_eq!(frame.as_numeric_frame().unwrap().shape().1, 1);
        for kind in [
            ArtifactKind::RegularCorrelations,
            ArtifactKind::PartialCorrelations,
            ArtifactKind::PValues,
            ArtifactKind::PcaLoadings,
        ] {
            let out = orch.request(kind, &d, Arc::new(NoProgress), None).await.unwrap();
            assert!(matches!(out, Outcome::CannotCompute(_)), "{kind}: {out:?}");
            assert!(!orch.is_computing(kind));
        }
    }
}

#[tokio::test]
async fn correlation_bundle_splits_progress_in_thirds() {
    let orch = PipelineOrchestrator::new(ArtifactCache::in_memory(), Arc::new(InlineBackend::new()));
    let sink = Arc::new(RecordingSink::new());
    let bundle = orch.request_correlation_bundle(&dataset(0.0), sink.clone(), None).await.unwrap().ready().unwrap();
    assert_eq!(bundle.regular.columns(), bundle.partial.columns());
    assert_eq!(bundle.regular.columns(), bundle.p_values.columns());
    let values = sink.values();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(values.iter().any(|v| *v > 2.0 / 3.0));
}

#[tokio::test]
async fn worker_and_inline_backends_agree() {
    let d = dataset(0.0);
    let inline = PipelineOrchestrator::new(ArtifactCache::in_memory(), Arc::new(InlineBackend::new()));
    let worker = PipelineOrchestrator::new(ArtifactCache::in_memory(), Arc::new(WorkerBackend::new()));
    for kind in [ArtifactKind::DataTypes, ArtifactKind::PcaLoadings, ArtifactKind::PartialCorrelations] {
        let a = inline.request(kind, &d, Arc::new(NoProgress), None).await.unwrap();
        let b = worker.request(kind, &d, Arc::new(NoProgress), None).await.unwrap();
        assert_eq!(a, b, "{kind}");
    }
}
