#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Snapshot uploader that hands buffer copies to an asynchronous presentation sink.
//!
//! Each upload copies the live buffer synchronously on the calling thread and
//! transfers the copy to the sink. Nothing is retained after submission, so
//! later writes to the live buffer can never reach an in-flight upload.

use fog_core::{
    Event, GridBuffer, GridSize, ImageHandle, PresentationSink, TextureDescriptor, UpdateRegion,
    UploadRequest,
};

/// Presentation image paired with the region refreshed on every upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadTarget {
    handle: ImageHandle,
    size: GridSize,
    region: UpdateRegion,
}

impl UploadTarget {
    /// Handle of the presentation image.
    #[must_use]
    pub const fn handle(&self) -> ImageHandle {
        self.handle
    }

    /// Dimensions of the presentation image.
    #[must_use]
    pub const fn size(&self) -> GridSize {
        self.size
    }

    /// Region replaced by each upload.
    #[must_use]
    pub const fn region(&self) -> UpdateRegion {
        self.region
    }
}

/// Copies grid buffers and submits them to a [`PresentationSink`].
pub struct SnapshotUploader {
    sink: Box<dyn PresentationSink>,
}

impl SnapshotUploader {
    /// Creates an uploader that submits through the provided sink.
    #[must_use]
    pub fn new(sink: Box<dyn PresentationSink>) -> Self {
        Self { sink }
    }

    /// Allocates a grayscale presentation image matching `size`.
    #[must_use]
    pub fn create_target(&self, size: GridSize) -> UploadTarget {
        let handle = self.sink.create_target(TextureDescriptor::grayscale(size));
        UploadTarget {
            handle,
            size,
            region: UpdateRegion::full(size),
        }
    }

    /// Releases a presentation image. No upload may target it afterwards.
    pub fn release_target(&self, target: UploadTarget) {
        self.sink.release_target(target.handle);
    }

    /// Copies `buffer` and submits the copy to `target`.
    ///
    /// Returns as soon as the sink accepted the request; the sink decides
    /// whether the image is ready to receive it.
    ///
    /// # Panics
    ///
    /// Panics when the buffer dimensions differ from the target's.
    pub fn upload(&self, buffer: &GridBuffer, target: &UploadTarget, out_events: &mut Vec<Event>) {
        assert_eq!(
            buffer.size(),
            target.size,
            "buffer does not match the dimensions of image {:?}",
            target.handle
        );

        let snapshot = buffer.snapshot();
        let bytes = snapshot.len();
        self.sink.submit(UploadRequest {
            target: target.handle,
            region: target.region,
            pitch: target.region.width(),
            snapshot,
        });
        log::trace!("submitted {bytes} bytes to image {:?}", target.handle);
        out_events.push(Event::SnapshotSubmitted {
            target: target.handle,
            bytes,
        });
    }
}

impl std::fmt::Debug for SnapshotUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotUploader").finish_non_exhaustive()
    }
}
