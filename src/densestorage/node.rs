//! # Queue Node
//!
//! Linked-list element shared between one [`DenseStorageWriter`] and any
//! number of [`DenseStorageReader`]s.
//!
//! All fields are immutable except `next` and `observed`, which live behind a
//! per-node mutex. `next` transitions from unset to set at most once; once
//! set it never changes. `observed` records whether any reader has seen the
//! transition, which drives the writer's flow-control release: only the
//! first observer returns a permit, so the slowest reader paces the writer.
//!
//! A node owns snapshots of the block data it publishes (`Arc` handles), so
//! it is freed automatically once the writer's tail and every reader have
//! moved past it.
//!
//! [`DenseStorageWriter`]: super::DenseStorageWriter
//! [`DenseStorageReader`]: super::DenseStorageReader

use super::flow::FlowSemaphore;
use eyre::{ensure, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

struct Link {
    next: Option<Arc<QueueNode>>,
    observed: bool,
}

pub(crate) struct QueueNode {
    /// Control words and small-cell payloads, in arrival order.
    pub packed: Arc<[u8]>,
    /// Handles to independently-owned large-cell buffers.
    pub large: Arc<[Arc<[u8]>]>,
    link: Mutex<Link>,
    published: Condvar,
}

impl QueueNode {
    pub fn new(packed: Arc<[u8]>, large: Arc<[Arc<[u8]>]>) -> Arc<Self> {
        Arc::new(Self {
            packed,
            large,
            link: Mutex::new(Link {
                next: None,
                observed: false,
            }),
            published: Condvar::new(),
        })
    }

    /// The initial shared head: an empty node both sides start from.
    pub fn sentinel() -> Arc<Self> {
        Self::new(Arc::from(&[][..]), Arc::from(&[][..]))
    }

    /// One-shot `next` assignment, then wake every waiting reader.
    pub fn publish_next(&self, node: Arc<QueueNode>) -> Result<()> {
        let mut link = self.link.lock();
        ensure!(link.next.is_none(), "queue node published twice");
        link.next = Some(node);
        drop(link);
        self.published.notify_all();
        Ok(())
    }

    /// Block until `next` is set, mark the transition observed, and return
    /// the successor. The first observer across all readers releases one
    /// writer permit.
    pub fn wait_next(&self, flow: &FlowSemaphore) -> Arc<QueueNode> {
        let mut link = self.link.lock();
        loop {
            if let Some(next) = link.next.clone() {
                let first_observer = !link.observed;
                link.observed = true;
                drop(link);
                if first_observer {
                    flow.release();
                }
                return next;
            }
            self.published.wait(&mut link);
        }
    }
}
