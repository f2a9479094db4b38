use crate::data::Feature;
use crate::error::FeatureParseError;
use crate::store::{FeatureStream, GenerationStore, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// How the features of a run are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceMode {
    Streaming,
    Batch,
}

/// Elements resident in memory, decoded one by one on demand.
pub struct BatchSource {
    elements: Arc<[Value]>,
    next: usize,
    finished: bool,
}

impl BatchSource {
    pub fn new(elements: Arc<[Value]>) -> Self {
        Self {
            elements,
            next: 0,
            finished: false,
        }
    }

    pub fn restart(&mut self) {
        self.next = 0;
        self.finished = false;
    }
}

impl Iterator for BatchSource {
    type Item = Result<Feature, FeatureParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let Some(value) = self.elements.get(self.next) else {
            self.finished = true;
            return None;
        };
        self.next += 1;
        let position = self.next;
        match Feature::from_value(value.clone()) {
            Ok(feature) => Some(Ok(feature)),
            Err(source) => {
                self.finished = true;
                Some(Err(FeatureParseError::Element { position, source }))
            }
        }
    }
}

/// Uniform access to the features of a run.
pub enum FeatureSource {
    Streaming(FeatureStream),
    Batch(BatchSource),
}

impl FeatureSource {
    pub fn mode(&self) -> SourceMode {
        match self {
            FeatureSource::Streaming(_) => SourceMode::Streaming,
            FeatureSource::Batch(_) => SourceMode::Batch,
        }
    }

    /// Rewinds a batch source. Streams cannot be rewound; open a new one.
    pub fn restart(&mut self) -> bool {
        match self {
            FeatureSource::Streaming(_) => false,
            FeatureSource::Batch(b) => {
                b.restart();
                true
            }
        }
    }
}

impl Iterator for FeatureSource {
    type Item = Result<Feature, FeatureParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FeatureSource::Streaming(s) => s.next(),
            FeatureSource::Batch(b) => b.next(),
        }
    }
}

/// Hands out a fresh [`FeatureSource`] per stage.
pub enum FeatureOrigin {
    Store(GenerationStore),
    Embedded(Arc<[Value]>),
}

impl FeatureOrigin {
    pub fn open(&self) -> Result<FeatureSource, StoreError> {
        match self {
            FeatureOrigin::Store(store) => Ok(FeatureSource::Streaming(store.feature_stream()?)),
            FeatureOrigin::Embedded(elements) => {
                Ok(FeatureSource::Batch(BatchSource::new(elements.clone())))
            }
        }
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            FeatureOrigin::Store(_) => SourceMode::Streaming,
            FeatureOrigin::Embedded(_) => SourceMode::Batch,
        }
    }

    /// Releases the underlying store, if any.
    pub fn close(self) {
        if let FeatureOrigin::Store(store) = self {
            store.close();
        }
    }
}

/// What a stage gathered from one pass over a source.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub read: usize,
    pub error: Option<FeatureParseError>,
}

/// Runs one pass, keeping the items `select` returns. A parse error stops the
/// pass; everything collected before it is kept.
pub fn collect_features<T, F>(source: FeatureSource, mut select: F) -> Collected<T>
where
    F: FnMut(Feature) -> Option<T>,
{
    let mut items = Vec::new();
    let mut read = 0;
    let mut error = None;
    for record in source {
        match record {
            Ok(feature) => {
                read += 1;
                if let Some(item) = select(feature) {
                    items.push(item);
                }
            }
            Err(e) => {
                warn!("Feature pass stopped after {} records: {}", read, e);
                error = Some(e);
                break;
            }
        }
    }
    Collected { items, read, error }
}
