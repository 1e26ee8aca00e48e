#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation sink that hands buffer copies to a dedicated render thread.
//!
//! [`RenderWorker::spawn`] starts a thread owning a [`TextureStore`] and
//! returns a [`ChannelSink`] that simulation code can pass to a fog layer.
//! Every sink call enqueues a [`RenderCommand`] and returns immediately; the
//! worker drains the queue in order until every sink clone has been dropped.

mod memory;
mod texture;

use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
};

use crossbeam_channel::{Receiver, Sender};
use fog_core::{ImageHandle, PresentationSink, TextureDescriptor, UploadRequest};

pub use memory::{MemoryBackend, MemoryTexture};
pub use texture::{TextureBackend, TextureResource, TextureStore, UploadOutcome, UploadStats};

/// Work item executed on the render thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderCommand {
    /// Allocate an image that later commands will address by `handle`.
    CreateTarget {
        /// Handle reserved by the sink.
        handle: ImageHandle,
        /// Image parameters.
        descriptor: TextureDescriptor,
    },
    /// Copy a snapshot into an image.
    Upload(UploadRequest),
    /// Destroy an image.
    ReleaseTarget {
        /// Image to destroy.
        handle: ImageHandle,
    },
}

/// Simulation-side end of the render queue, obtained from [`RenderWorker::spawn`].
///
/// Handles are reserved on the calling thread so `create_target` can return
/// without waiting for the render thread. Every clone draws from the same
/// counter, so handles stay unique per worker.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<RenderCommand>,
    next_handle: Arc<AtomicU32>,
}

impl ChannelSink {
    #[must_use]
    pub(crate) fn new(sender: Sender<RenderCommand>) -> Self {
        Self {
            sender,
            next_handle: Arc::new(AtomicU32::new(1)),
        }
    }

    fn send(&self, command: RenderCommand) {
        if self.sender.send(command).is_err() {
            log::error!("render queue disconnected; dropping command");
        }
    }
}

impl PresentationSink for ChannelSink {
    fn create_target(&self, descriptor: TextureDescriptor) -> ImageHandle {
        let handle = ImageHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.send(RenderCommand::CreateTarget { handle, descriptor });
        handle
    }

    fn submit(&self, request: UploadRequest) {
        self.send(RenderCommand::Upload(request));
    }

    fn release_target(&self, target: ImageHandle) {
        self.send(RenderCommand::ReleaseTarget { handle: target });
    }
}

/// Drains render commands from `receiver` into `store` until every sender is gone.
pub fn drain<B: TextureBackend>(receiver: &Receiver<RenderCommand>, store: &mut TextureStore<B>) {
    for command in receiver.iter() {
        store.apply(command);
    }
}

/// Render thread owning the presentation images.
#[derive(Debug)]
pub struct RenderWorker {
    handle: thread::JoinHandle<UploadStats>,
}

impl RenderWorker {
    /// Starts a render thread backed by `backend` and returns the sink feeding it.
    pub fn spawn<B>(backend: B) -> (ChannelSink, Self)
    where
        B: TextureBackend + 'static,
    {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let handle = thread::spawn(move || {
            log::info!("render worker started");
            let mut store = TextureStore::new(backend);
            drain(&receiver, &mut store);
            if !store.is_empty() {
                log::warn!(
                    "render worker stopped with {} images never released",
                    store.len()
                );
            }
            let stats = store.stats();
            log::info!(
                "render worker stopped: {} uploads applied, {} skipped, {} unknown",
                stats.applied,
                stats.skipped,
                stats.unknown_target
            );
            stats
        });
        (ChannelSink::new(sender), Self { handle })
    }

    /// Waits for the worker to drain its queue and returns its upload counters.
    ///
    /// The worker only stops once every [`ChannelSink`] clone has been dropped.
    ///
    /// # Panics
    ///
    /// Re-raises a panic that occurred on the render thread.
    pub fn join(self) -> UploadStats {
        match self.handle.join() {
            Ok(stats) => stats,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}
