use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use fog_core::{
    Event, GridBuffer, GridCoord, GridSize, ImageHandle, PresentationSink, TextureDescriptor,
    UpdateRegion, UploadRequest, HIDDEN, VISIBLE,
};
use fog_system_upload::SnapshotUploader;

/// Sink that records everything it receives.
#[derive(Clone, Default)]
struct RecordingSink {
    state: Rc<SinkState>,
}

#[derive(Default)]
struct SinkState {
    next_handle: Cell<u32>,
    created: RefCell<Vec<TextureDescriptor>>,
    released: RefCell<Vec<ImageHandle>>,
    requests: RefCell<Vec<UploadRequest>>,
}

impl PresentationSink for RecordingSink {
    fn create_target(&self, descriptor: TextureDescriptor) -> ImageHandle {
        self.state.created.borrow_mut().push(descriptor);
        let handle = self.state.next_handle.get();
        self.state.next_handle.set(handle + 1);
        ImageHandle::new(handle)
    }

    fn submit(&self, request: UploadRequest) {
        self.state.requests.borrow_mut().push(request);
    }

    fn release_target(&self, target: ImageHandle) {
        self.state.released.borrow_mut().push(target);
    }
}

fn uploader() -> (SnapshotUploader, RecordingSink) {
    let sink = RecordingSink::default();
    (SnapshotUploader::new(Box::new(sink.clone())), sink)
}

#[test]
fn targets_are_created_with_full_regions() {
    let (uploader, sink) = uploader();
    let size = GridSize::square(16);

    let target = uploader.create_target(size);

    assert_eq!(target.handle(), ImageHandle::new(0));
    assert_eq!(target.region(), UpdateRegion::full(size));
    assert_eq!(
        sink.state.created.borrow().as_slice(),
        &[TextureDescriptor::grayscale(size)]
    );
}

#[test]
fn upload_submits_a_copy_of_the_current_contents() {
    let (uploader, sink) = uploader();
    let size = GridSize::new(4, 2);
    let target = uploader.create_target(size);
    let mut buffer = GridBuffer::new(size).expect("allocate");
    buffer.write(GridCoord::new(3, 1), VISIBLE);

    let mut events = Vec::new();
    uploader.upload(&buffer, &target, &mut events);

    let requests = sink.state.requests.borrow();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.target, target.handle());
    assert_eq!(request.region, UpdateRegion::full(size));
    assert_eq!(request.pitch, 4);
    assert_eq!(request.snapshot.as_bytes(), buffer.as_bytes());
    assert_eq!(
        events,
        vec![Event::SnapshotSubmitted {
            target: target.handle(),
            bytes: 8,
        }]
    );
}

#[test]
fn submitted_copies_ignore_later_buffer_mutation() {
    let (uploader, sink) = uploader();
    let size = GridSize::square(4);
    let target = uploader.create_target(size);
    let mut buffer = GridBuffer::new(size).expect("allocate");
    buffer.write(GridCoord::new(1, 1), VISIBLE);

    let mut events = Vec::new();
    uploader.upload(&buffer, &target, &mut events);
    buffer.clear_all();
    buffer.write(GridCoord::new(0, 0), VISIBLE);
    uploader.upload(&buffer, &target, &mut events);

    let requests = sink.state.requests.borrow();
    assert_eq!(requests[0].snapshot.as_bytes()[5], VISIBLE);
    assert_eq!(requests[0].snapshot.as_bytes()[0], HIDDEN);
    assert_eq!(requests[1].snapshot.as_bytes()[5], HIDDEN);
    assert_eq!(requests[1].snapshot.as_bytes()[0], VISIBLE);
}

#[test]
fn releasing_a_target_notifies_the_sink() {
    let (uploader, sink) = uploader();
    let target = uploader.create_target(GridSize::square(2));

    uploader.release_target(target);

    assert_eq!(sink.state.released.borrow().as_slice(), &[target.handle()]);
}

#[test]
#[should_panic(expected = "does not match the dimensions")]
fn mismatched_buffer_is_rejected() {
    let (uploader, _sink) = uploader();
    let target = uploader.create_target(GridSize::square(4));
    let buffer = GridBuffer::new(GridSize::square(8)).expect("allocate");

    uploader.upload(&buffer, &target, &mut Vec::new());
}
