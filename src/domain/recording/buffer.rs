//! Chunk buffer for one recorder

use crate::domain::media::{Artifact, ContainerType};

/// Ordered chunks flushed by one recorder during one recording cycle.
///
/// Empty chunks are dropped on the way in, so an empty buffer means the
/// recorder produced no data at all.
#[derive(Debug, Clone, Default)]
pub struct RecordingBuffer {
    chunks: Vec<Vec<u8>>,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns false if the chunk was empty and ignored.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of chunks held
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Assemble all chunks into one artifact tagged with `container`
    pub fn into_artifact(self, container: ContainerType) -> Artifact {
        Artifact::from_chunks(self.chunks, container)
    }
}
