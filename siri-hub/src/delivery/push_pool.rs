/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Bounded worker pool executing push jobs off the ingestion path.

use crate::observability::{events, fields};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "push_pool";

/// One logical unit of delivery work, typically every chunk for one subscription.
pub type PushJob = BoxFuture<'static, ()>;

/// Fixed number of workers draining one bounded queue.
///
/// Submission never waits: when the queue is full the job is dropped and logged, and the
/// next change batch supersedes it.
pub struct PushWorkerPool {
    sender: Mutex<Option<mpsc::Sender<PushJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PushWorkerPool {
    pub fn new(handle: &Handle, worker_count: usize, queue_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_size.max(1));
        let receiver = Arc::new(AsyncMutex::new(receiver));
        let workers = (0..worker_count.max(1))
            .map(|_| {
                let worker_id = Uuid::new_v4().to_string();
                handle.spawn(Self::worker_loop(worker_id, receiver.clone()))
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Queues a job, returning `false` when it was dropped.
    pub fn submit(&self, subscription_id: &str, job: PushJob) -> bool {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            warn!(
                event = events::PUSH_POOL_CLOSED,
                component = COMPONENT,
                subscription_id,
                "push pool closed; dropping job"
            );
            return false;
        };

        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    event = events::PUSH_QUEUE_FULL,
                    component = COMPONENT,
                    subscription_id,
                    "push queue full; dropping job"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    event = events::PUSH_POOL_CLOSED,
                    component = COMPONENT,
                    subscription_id,
                    reason = fields::REASON_QUEUE_CLOSED,
                    "push queue closed; dropping job"
                );
                false
            }
        }
    }

    /// Stops accepting jobs, lets queued jobs finish and waits for every worker.
    pub async fn close(&self) {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if let Err(err) = worker.await {
                warn!(
                    event = events::PUSH_WORKER_JOIN_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "push worker ended abnormally"
                );
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub(crate) async fn worker_loop(worker_id: String, receiver: Arc<AsyncMutex<mpsc::Receiver<PushJob>>>) {
        loop {
            let next = {
                let mut receiver = receiver.lock().await;
                receiver.recv().await
            };
            let Some(job) = next else {
                info!(
                    event = events::PUSH_WORKER_STOPPED,
                    component = COMPONENT,
                    worker_id = worker_id.as_str(),
                    reason = fields::REASON_QUEUE_CLOSED,
                    "push queue closed; stopping worker"
                );
                break;
            };

            if AssertUnwindSafe(job).catch_unwind().await.is_err() {
                error!(
                    event = events::PUSH_JOB_PANICKED,
                    component = COMPONENT,
                    worker_id = worker_id.as_str(),
                    "push job panicked; worker continues"
                );
            }
        }
    }
}
