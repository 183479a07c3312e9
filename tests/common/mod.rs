//! Mock work items with load/release bookkeeping.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracefetch::error::BoxError;
use tracefetch::{Artifact, WorkItem};

/// Counters shared by every artifact of a test.
#[derive(Debug, Default)]
pub struct Probe {
    loading: AtomicUsize,
    peak_loading: AtomicUsize,
    loads: AtomicUsize,
    releases: AtomicUsize,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Most artifact loads that were running at the same time.
    pub fn peak_loading(&self) -> usize {
        self.peak_loading.load(Ordering::SeqCst)
    }

    /// Total artifact loads that actually did work.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

#[derive(Debug)]
pub struct MockArtifact {
    pub id: usize,
    delay: Duration,
    behavior: Behavior,
    loads: AtomicUsize,
    releases: AtomicUsize,
    loaded: AtomicBool,
    probe: Arc<Probe>,
}

impl MockArtifact {
    pub fn new(id: usize, delay: Duration, behavior: Behavior, probe: &Arc<Probe>) -> Self {
        Self {
            id,
            delay,
            behavior,
            loads: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            loaded: AtomicBool::new(false),
            probe: Arc::clone(probe),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }
}

impl Artifact for MockArtifact {
    fn load(&self) -> Result<(), BoxError> {
        if self.is_loaded() {
            return Ok(());
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.probe.loads.fetch_add(1, Ordering::SeqCst);

        let now = self.probe.loading.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak_loading.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.probe.loading.fetch_sub(1, Ordering::SeqCst);

        match self.behavior {
            Behavior::Succeed => {
                self.loaded.store(true, Ordering::SeqCst);
                Ok(())
            }
            Behavior::Fail => Err(format!("corrupt extract {}", self.id).into()),
            Behavior::Panic => panic!("extract {} blew up", self.id),
        }
    }

    fn release(&self) {
        if self.loaded.swap(false, Ordering::SeqCst) {
            self.releases.fetch_add(1, Ordering::SeqCst);
            self.probe.releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
pub struct MockItem {
    pub id: usize,
    pub artifacts: Vec<MockArtifact>,
}

impl WorkItem for MockItem {
    type Artifact = MockArtifact;

    fn artifacts(&self) -> &[MockArtifact] {
        &self.artifacts
    }
}

/// One successful single-artifact item.
pub fn item(id: usize, delay: Duration, probe: &Arc<Probe>) -> MockItem {
    item_with(id, delay, Behavior::Succeed, probe)
}

pub fn item_with(id: usize, delay: Duration, behavior: Behavior, probe: &Arc<Probe>) -> MockItem {
    MockItem {
        id,
        artifacts: vec![MockArtifact::new(id, delay, behavior, probe)],
    }
}

/// `count` successful items, all with the same load delay.
pub fn items(count: usize, delay: Duration, probe: &Arc<Probe>) -> Vec<MockItem> {
    (0..count).map(|id| item(id, delay, probe)).collect()
}

pub fn accept_all(_: &MockArtifact) -> bool {
    true
}
