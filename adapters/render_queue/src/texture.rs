//! Texture resources owned by the render worker and the store applying uploads to them.

use std::collections::HashMap;

use fog_core::{ImageHandle, TextureDescriptor, UpdateRegion, UploadRequest};

use crate::RenderCommand;

/// GPU-resident image capable of receiving region updates.
pub trait TextureResource: Send {
    /// Descriptor the image was created from.
    fn descriptor(&self) -> TextureDescriptor;

    /// Index of the first mip level currently resident. The image accepts
    /// updates only while its full-resolution level is resident (index 0).
    fn first_resident_mip(&self) -> u32;

    /// Replaces `region` of the full-resolution level with rows read from `data`.
    fn update_region(&mut self, region: &UpdateRegion, pitch: u32, data: &[u8]);
}

/// Factory creating texture resources on the render thread.
pub trait TextureBackend: Send {
    /// Creates the image that `handle` will name.
    fn create_texture(
        &mut self,
        handle: ImageHandle,
        descriptor: &TextureDescriptor,
    ) -> Box<dyn TextureResource>;

    /// Called after the store dropped the image named by `handle`.
    fn release_texture(&mut self, handle: ImageHandle);
}

/// Result of applying a single upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The bytes were written into the image.
    Applied,
    /// The image was not ready; the bytes were discarded.
    NotReady,
    /// No image with the requested handle exists.
    UnknownTarget,
}

/// Counters describing the uploads processed by a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    /// Uploads written into their image.
    pub applied: u64,
    /// Uploads discarded because their image was not ready.
    pub skipped: u64,
    /// Uploads addressed to images that do not exist.
    pub unknown_target: u64,
}

/// Render-side registry of presentation images.
pub struct TextureStore<B> {
    backend: B,
    textures: HashMap<ImageHandle, Box<dyn TextureResource>>,
    stats: UploadStats,
}

impl<B: TextureBackend> TextureStore<B> {
    /// Creates an empty store backed by `backend`.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            textures: HashMap::new(),
            stats: UploadStats::default(),
        }
    }

    /// Executes one command received from the simulation thread.
    pub fn apply(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::CreateTarget { handle, descriptor } => {
                let texture = self.backend.create_texture(handle, &descriptor);
                if self.textures.insert(handle, texture).is_some() {
                    log::warn!("image {handle:?} was created twice; the old image was dropped");
                }
            }
            RenderCommand::Upload(request) => {
                let _ = self.upload(request);
            }
            RenderCommand::ReleaseTarget { handle } => {
                if self.textures.remove(&handle).is_some() {
                    self.backend.release_texture(handle);
                } else {
                    log::warn!("release requested for unknown image {handle:?}");
                }
            }
        }
    }

    /// Writes an upload into its image unless the image is not ready.
    ///
    /// The request, including its snapshot, is released when this returns.
    pub fn upload(&mut self, request: UploadRequest) -> UploadOutcome {
        let Some(texture) = self.textures.get_mut(&request.target) else {
            log::warn!("dropping upload for unknown image {:?}", request.target);
            self.stats.unknown_target += 1;
            return UploadOutcome::UnknownTarget;
        };

        if texture.first_resident_mip() > 0 {
            log::debug!(
                "image {:?} is not resident yet; skipping update",
                request.target
            );
            self.stats.skipped += 1;
            return UploadOutcome::NotReady;
        }

        texture.update_region(&request.region, request.pitch, request.snapshot.as_bytes());
        self.stats.applied += 1;
        UploadOutcome::Applied
    }

    /// Number of live images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Reports whether the store holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> UploadStats {
        self.stats
    }
}
