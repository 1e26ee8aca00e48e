//! In-memory texture backend for hosts without a GPU and for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use fog_core::{ImageHandle, TextureDescriptor, UpdateRegion};

use crate::texture::{TextureBackend, TextureResource};

#[derive(Debug)]
struct TextureState {
    descriptor: TextureDescriptor,
    first_resident_mip: u32,
    texels: Vec<u8>,
    updates: usize,
}

/// Texture storing its full-resolution texels in host memory.
///
/// Clones share the same storage, so a host can keep a handle to inspect the
/// texels while the render worker owns another.
#[derive(Clone, Debug)]
pub struct MemoryTexture {
    state: Arc<Mutex<TextureState>>,
}

impl MemoryTexture {
    /// Creates a zeroed texture.
    #[must_use]
    pub fn new(descriptor: TextureDescriptor, first_resident_mip: u32) -> Self {
        let len = descriptor.size.width() as usize
            * descriptor.size.height() as usize
            * descriptor.format.bytes_per_texel() as usize;
        Self {
            state: Arc::new(Mutex::new(TextureState {
                descriptor,
                first_resident_mip,
                texels: vec![0; len],
                updates: 0,
            })),
        }
    }

    /// Copy of the full-resolution texels.
    #[must_use]
    pub fn texels(&self) -> Vec<u8> {
        self.lock().texels.clone()
    }

    /// Number of region updates applied so far.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.lock().updates
    }

    /// Simulates mip streaming by changing the first resident level.
    pub fn set_first_resident_mip(&self, mip: u32) {
        self.lock().first_resident_mip = mip;
    }

    fn lock(&self) -> MutexGuard<'_, TextureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextureResource for MemoryTexture {
    fn descriptor(&self) -> TextureDescriptor {
        self.lock().descriptor
    }

    fn first_resident_mip(&self) -> u32 {
        self.lock().first_resident_mip
    }

    fn update_region(&mut self, region: &UpdateRegion, pitch: u32, data: &[u8]) {
        let mut state = self.lock();
        let size = state.descriptor.size;
        assert!(
            region.dest_x() + region.width() <= size.width()
                && region.dest_y() + region.height() <= size.height(),
            "update region {region:?} exceeds the {}x{} image",
            size.width(),
            size.height(),
        );

        let texel = state.descriptor.format.bytes_per_texel() as usize;
        let image_width = size.width() as usize;
        let row_bytes = region.width() as usize * texel;

        for row in 0..region.height() as usize {
            let src = (region.src_y() as usize + row) * pitch as usize
                + region.src_x() as usize * texel;
            let dst = ((region.dest_y() as usize + row) * image_width + region.dest_x() as usize)
                * texel;
            state.texels[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
        }
        state.updates += 1;
    }
}

/// Backend creating [`MemoryTexture`] resources and remembering the live ones by handle.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    textures: Arc<Mutex<HashMap<ImageHandle, MemoryTexture>>>,
    first_resident_mip: u32,
}

impl MemoryBackend {
    /// Creates a backend whose textures are immediately ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose textures start with `mip` as their first resident level.
    #[must_use]
    pub fn with_first_resident_mip(mip: u32) -> Self {
        Self {
            first_resident_mip: mip,
            ..Self::default()
        }
    }

    /// Live texture named by `handle`. Released textures are forgotten.
    #[must_use]
    pub fn texture(&self, handle: ImageHandle) -> Option<MemoryTexture> {
        self.lock().get(&handle).cloned()
    }

    /// Handles of the live textures in ascending order.
    #[must_use]
    pub fn handles(&self) -> Vec<ImageHandle> {
        let mut handles: Vec<ImageHandle> = self.lock().keys().copied().collect();
        handles.sort();
        handles
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ImageHandle, MemoryTexture>> {
        self.textures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextureBackend for MemoryBackend {
    fn create_texture(
        &mut self,
        handle: ImageHandle,
        descriptor: &TextureDescriptor,
    ) -> Box<dyn TextureResource> {
        let texture = MemoryTexture::new(*descriptor, self.first_resident_mip);
        let _ = self.lock().insert(handle, texture.clone());
        Box::new(texture)
    }

    fn release_texture(&mut self, handle: ImageHandle) {
        let _ = self.lock().remove(&handle);
    }
}
