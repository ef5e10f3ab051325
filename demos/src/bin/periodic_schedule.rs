//! Example demonstrating the scheduler on its own
//!
//! This example shows how to:
//! 1. Run a one-shot task after a delay
//! 2. Run a periodic heartbeat limited to a number of firings
//! 3. Drive a task from a closure-based schedule
//! 4. Cancel a task before it fires

use resequencer_rs::prelude::{OnceSchedule, PeriodicSchedule, Scheduler, SchedulerTask};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let scheduler = match Scheduler::with_name("demo-timer") {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Failed to start scheduler: {}", e);
            return;
        }
    };

    let once = SchedulerTask::new(|| info!("One-shot task fired"));
    if let Err(e) = scheduler.schedule(&once, OnceSchedule::after(Duration::from_millis(150))) {
        error!("Failed to schedule one-shot task: {}", e);
    }

    let beats = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&beats);
    let heartbeat = SchedulerTask::new(move || {
        let beat = counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Heartbeat {}", beat);
    });
    let schedule = PeriodicSchedule::every(Duration::from_millis(50))
        .with_delay(Duration::from_millis(20))
        .with_limit(5);
    if let Err(e) = scheduler.schedule(&heartbeat, schedule) {
        error!("Failed to schedule heartbeat: {}", e);
    }

    // back-off: 10ms, 20ms, 40ms, 80ms
    let mut backoff = Duration::from_millis(10);
    let backoff_schedule = move || {
        if backoff > Duration::from_millis(80) {
            return None;
        }
        let at = Instant::now() + backoff;
        backoff *= 2;
        Some(at)
    };
    let retry = SchedulerTask::new(|| info!("Retry attempt"));
    if let Err(e) = scheduler.schedule(&retry, backoff_schedule) {
        error!("Failed to schedule retry: {}", e);
    }

    let never = SchedulerTask::new(|| error!("This task should never run"));
    if let Err(e) = scheduler.schedule(&never, OnceSchedule::after(Duration::from_millis(100))) {
        error!("Failed to schedule task: {}", e);
    }
    info!("Cancelling task {} (was scheduled: {})", never.id(), never.cancel());

    thread::sleep(Duration::from_millis(500));
    info!(
        "Heartbeat fired {} times; task states: once={}, heartbeat={}, retry={}, never={}",
        beats.load(Ordering::SeqCst),
        once.state(),
        heartbeat.state(),
        retry.state(),
        never.state()
    );
    scheduler.cancel();
}
