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

//! Background loops driven by a fixed interval.

use crate::observability::{events, fields};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

const COMPONENT: &str = "periodic_task";
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs `tick` every `period` until `shutdown` turns `true` or its sender is dropped.
///
/// The first run happens one period after spawning. A panicking tick is logged and the
/// loop carries on with the next one. Slow ticks delay the schedule instead of bursting.
pub fn spawn_periodic<F>(
    handle: &Handle,
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    handle.spawn(async move {
        let period = period.max(MIN_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval.tick().await;

        debug!(
            event = events::PERIODIC_TASK_START,
            component = COMPONENT,
            task = name,
            period_ms = fields::duration_ms(period),
            "periodic task started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if catch_unwind(AssertUnwindSafe(&mut tick)).is_err() {
                        error!(
                            event = events::PERIODIC_TICK_PANICKED,
                            component = COMPONENT,
                            task = name,
                            "periodic tick panicked; continuing with the next tick"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(
            event = events::PERIODIC_TASK_STOPPED,
            component = COMPONENT,
            task = name,
            reason = fields::REASON_SHUTDOWN,
            "periodic task stopped"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::spawn_periodic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio::sync::watch;

    #[tokio::test(start_paused = true)]
    async fn ticks_until_shutdown() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counted = ticks.clone();

        let task = spawn_periodic(
            &Handle::current(),
            "counter",
            Duration::from_millis(100),
            shutdown_rx,
            move || {
                counted.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 3);

        shutdown_tx.send(true).expect("task is listening");
        task.await.expect("task should stop cleanly");
        let stopped_at = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), stopped_at);
    }

    #[tokio::test(start_paused = true)]
    async fn a_panicking_tick_does_not_kill_the_loop() {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticks = Arc::new(AtomicUsize::new(0));
        let counted = ticks.clone();

        let _task = spawn_periodic(
            &Handle::current(),
            "flaky",
            Duration::from_millis(100),
            shutdown_rx,
            move || {
                if counted.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first tick fails");
                }
            },
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(ticks.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn dropping_the_sender_stops_the_loop() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = spawn_periodic(
            &Handle::current(),
            "orphan",
            Duration::from_secs(60),
            shutdown_rx,
            || {},
        );

        drop(shutdown_tx);

        task.await.expect("task should stop cleanly");
    }
}
