//! Track type registry
//!
//! Maps a track uri to the factory the timeline uses to instantiate it.

use std::fmt;
use std::sync::Arc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::track::{Track, TrackContext, TrackError};

/// Factory building a track for a placement
pub type TrackFactory = Arc<dyn Fn(TrackContext) -> Box<dyn Track> + Send + Sync>;

/// A registered track type
#[derive(Clone)]
pub struct TrackDescriptor {
    pub uri: String,
    pub kind: String,
    pub display_name: String,
    factory: TrackFactory,
}

impl TrackDescriptor {
    pub fn new<F>(
        uri: impl Into<String>,
        kind: impl Into<String>,
        display_name: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn(TrackContext) -> Box<dyn Track> + Send + Sync + 'static,
    {
        Self {
            uri: uri.into(),
            kind: kind.into(),
            display_name: display_name.into(),
            factory: Arc::new(factory),
        }
    }

    pub fn create(&self, ctx: TrackContext) -> Box<dyn Track> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for TrackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackDescriptor")
            .field("uri", &self.uri)
            .field("kind", &self.kind)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Registered track types keyed by uri
#[derive(Default)]
pub struct TrackRegistry {
    descriptors: RwLock<IndexMap<String, TrackDescriptor>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track type. A second registration under the same uri
    /// replaces the first.
    pub fn register(&self, descriptor: TrackDescriptor) {
        let uri = descriptor.uri.clone();
        if self.descriptors.write().insert(uri.clone(), descriptor).is_some() {
            debug!("Replaced track type {}", uri);
        } else {
            debug!("Registered track type {}", uri);
        }
    }

    pub fn get(&self, uri: &str) -> Option<TrackDescriptor> {
        self.descriptors.read().get(uri).cloned()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.descriptors.read().contains_key(uri)
    }

    /// Registered uris in registration order
    pub fn uris(&self) -> Vec<String> {
        self.descriptors.read().keys().cloned().collect()
    }

    /// Instantiate the track type registered under `uri`
    pub fn create(&self, uri: &str, ctx: TrackContext) -> Result<Box<dyn Track>, TrackError> {
        self.get(uri)
            .map(|descriptor| descriptor.create(ctx))
            .ok_or_else(|| TrackError::UnknownKind(uri.to_string()))
    }
}
