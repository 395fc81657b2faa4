//! Produced artifact value object

use super::container::ContainerType;

/// A finished recording: the assembled bytes and the MIME type they are
/// offered under. The label is not a promise about the actual encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    data: Vec<u8>,
    container: ContainerType,
}

impl Artifact {
    pub fn new(data: Vec<u8>, container: ContainerType) -> Self {
        Self { data, container }
    }

    /// Concatenate chunks in order into one artifact
    pub fn from_chunks<I>(chunks: I, container: ContainerType) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut data = Vec::new();
        for chunk in chunks {
            data.extend_from_slice(chunk.as_ref());
        }
        Self { data, container }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn container(&self) -> &ContainerType {
        &self.container
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Keep the bytes, change only the label
    pub fn relabel(self, container: ContainerType) -> Self {
        Self {
            data: self.data,
            container,
        }
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        human_size(self.size_bytes())
    }
}

/// Format a byte count as B, KB or MB
pub fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
