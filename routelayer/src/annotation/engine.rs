//! Geometry engine roles.
//!
//! Chunking, clipping, and anchor computation run behind the
//! [`AnnotationEngine`] interface. Two implementations exist and callers
//! must not be able to tell them apart:
//!
//! - [`InProcessEngine`] runs synchronously in-process (tests, hosts with no
//!   worker context);
//! - [`WorkerEngine`] proxies every call across an owned tokio task via
//!   message passing, keeping geometry work off the interactive context.
//!
//! Engine calls are fire-and-forget per placement pass: a round-trip that
//! fails because the worker is gone degrades to an empty result, since each
//! pass is idempotent given its inputs.

use std::sync::Mutex;

use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

use crate::annotation::geometry::{distinct_segments, place_annotations, Chunk, PlacementResult};
use crate::geo::BBox;
use crate::route::types::SegmentFeature;

/// Async interface over annotation geometry state.
pub trait AnnotationEngine: Send + Sync {
    /// Replaces the chunk set from a new route result's geometry.
    fn create_chunks(&self, segments: Vec<SegmentFeature>) -> BoxFuture<'_, ()>;

    /// Clips all chunks against `viewport` and computes one anchor candidate
    /// per surviving chunk.
    fn recalculate_positions(&self, viewport: BBox) -> BoxFuture<'_, PlacementResult>;
}

/// Synchronous in-process engine role.
#[derive(Default)]
pub struct InProcessEngine {
    chunks: Mutex<Vec<Chunk>>,
}

impl InProcessEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnotationEngine for InProcessEngine {
    fn create_chunks(&self, segments: Vec<SegmentFeature>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let chunks = distinct_segments(&segments);
            trace!(chunks = chunks.len(), "chunk set rebuilt in-process");
            *self.chunks.lock().expect("engine poisoned") = chunks;
        })
    }

    fn recalculate_positions(&self, viewport: BBox) -> BoxFuture<'_, PlacementResult> {
        Box::pin(async move {
            let chunks = self.chunks.lock().expect("engine poisoned");
            place_annotations(&chunks, &viewport)
        })
    }
}

enum EngineCommand {
    CreateChunks {
        segments: Vec<SegmentFeature>,
        done: oneshot::Sender<()>,
    },
    Recalculate {
        viewport: BBox,
        reply: oneshot::Sender<PlacementResult>,
    },
}

/// Worker engine role: owns a background task holding the chunk state and
/// talks to it by request/response message passing, no shared memory.
///
/// The task exits when the last handle is dropped, which is how worker
/// teardown cancels any still-queued calls. Construct inside a runtime
/// context.
pub struct WorkerEngine {
    tx: mpsc::Sender<EngineCommand>,
}

impl WorkerEngine {
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::channel::<EngineCommand>(16);

        tokio::spawn(async move {
            let mut chunks: Vec<Chunk> = Vec::new();
            while let Some(command) = rx.recv().await {
                match command {
                    EngineCommand::CreateChunks { segments, done } => {
                        chunks = distinct_segments(&segments);
                        trace!(chunks = chunks.len(), "chunk set rebuilt in worker");
                        let _ = done.send(());
                    }
                    EngineCommand::Recalculate { viewport, reply } => {
                        let _ = reply.send(place_annotations(&chunks, &viewport));
                    }
                }
            }
            trace!("annotation worker stopped");
        });

        Self { tx }
    }
}

impl AnnotationEngine for WorkerEngine {
    fn create_chunks(&self, segments: Vec<SegmentFeature>) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let (done, done_rx) = oneshot::channel();
            if self
                .tx
                .send(EngineCommand::CreateChunks { segments, done })
                .await
                .is_err()
            {
                return;
            }
            let _ = done_rx.await;
        })
    }

    fn recalculate_positions(&self, viewport: BBox) -> BoxFuture<'_, PlacementResult> {
        Box::pin(async move {
            let (reply, reply_rx) = oneshot::channel();
            if self
                .tx
                .send(EngineCommand::Recalculate { viewport, reply })
                .await
                .is_err()
            {
                return PlacementResult::default();
            }
            reply_rx.await.unwrap_or_default()
        })
    }
}
