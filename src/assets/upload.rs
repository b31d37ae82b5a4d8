use std::path::{Path, PathBuf};

use crate::assets::decode::{SourceImage, load_source_image};
use crate::delivery::request::RenderRequest;
use crate::foundation::error::KenBurnsResult;
use crate::foundation::fs::remove_file_quiet;

/// Source file owned by exactly one request.
///
/// Temporary uploads are deleted when the guard drops, which [`SourceFile::decode`] does right
/// after the bytes are decoded. Caller-owned inputs are never touched.
#[derive(Debug)]
pub(crate) struct SourceFile {
    path: PathBuf,
    temporary: bool,
}

impl SourceFile {
    pub(crate) fn new(path: impl Into<PathBuf>, temporary: bool) -> Self {
        Self {
            path: path.into(),
            temporary,
        }
    }

    /// Guard for the source named by `request`.
    pub(crate) fn for_request(request: &RenderRequest) -> Self {
        Self::new(&request.source_image, request.source_is_upload)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the file, then release it.
    pub(crate) fn decode(self) -> KenBurnsResult<SourceImage> {
        load_source_image(self.path())
    }
}

impl Drop for SourceFile {
    fn drop(&mut self) {
        if self.temporary && remove_file_quiet(&self.path) {
            tracing::debug!(path = %self.path.display(), "released upload");
        }
    }
}
