use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use parking_lot::Mutex;
use crate::error::Error;
use crate::renderer::HeadlessDevice;
use super::*;
use super::super::render_task::TaskKind;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn bound_queue() -> Arc<RenderTaskQueue> {
    let binding = Arc::new(RenderThreadBinding::new());
    binding.bind_current();
    Arc::new(RenderTaskQueue::new(binding))
}

fn drain(queue: &RenderTaskQueue) -> DrainReport {
    let mut device = HeadlessDevice::new();
    let mut context = TaskContext { device: &mut device, frame: 0 };
    queue.drain(&mut context).unwrap()
}

fn recording_task(log: &Arc<Mutex<Vec<usize>>>, value: usize) -> RenderTask {
    let log = Arc::clone(log);
    RenderTask::new(TaskKind::Custom, move |_| {
        log.lock().push(value);
        Ok(())
    })
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_fifo_order() {
    let queue = bound_queue();
    let log = Arc::new(Mutex::new(Vec::new()));
    for i in 0..5 {
        queue.submit(recording_task(&log, i));
    }

    let report = drain(&queue);
    assert_eq!(report, DrainReport { executed: 5, failed: 0 });
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    assert!(queue.is_empty());
}

#[test]
fn test_task_submitted_during_drain_runs_next_drain() {
    let queue = bound_queue();
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner_queue = Arc::clone(&queue);
    let inner_log = Arc::clone(&log);
    queue.submit(RenderTask::new(TaskKind::Custom, move |_| {
        inner_queue.submit(recording_task(&inner_log, 2));
        inner_log.lock().push(1);
        Ok(())
    }));

    assert_eq!(drain(&queue).executed, 1);
    assert_eq!(*log.lock(), vec![1]);
    assert_eq!(queue.len(), 1);

    assert_eq!(drain(&queue).executed, 1);
    assert_eq!(*log.lock(), vec![1, 2]);
}

#[test]
fn test_per_producer_order_with_many_producers() {
    let queue = bound_queue();
    let log = Arc::new(Mutex::new(Vec::new()));
    let barrier = Arc::new(Barrier::new(4));

    let producers: Vec<_> = (0..4)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..100 {
                    queue.submit(recording_task(&log, producer * 1000 + i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(drain(&queue).executed, 400);
    let log = log.lock();
    for producer in 0..4 {
        let own: Vec<_> = log.iter().filter(|v| **v / 1000 == producer).collect();
        assert_eq!(own.len(), 100);
        assert!(own.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_failing_and_panicking_tasks_do_not_stop_drain() {
    let queue = bound_queue();
    let counter = Arc::new(AtomicUsize::new(0));

    queue.submit(RenderTask::new(TaskKind::Custom, |_| Err(Error::Timeout)));
    queue.submit(RenderTask::new(TaskKind::Custom, |_| panic!("bad task")));
    let seen = Arc::clone(&counter);
    queue.submit(RenderTask::new(TaskKind::Custom, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    assert_eq!(drain(&queue), DrainReport { executed: 3, failed: 2 });
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_awaitable_submission() {
    let queue = bound_queue();
    let handle = queue.submit_awaitable(RenderTask::new(TaskKind::Custom, |_| panic!("oops")));
    drain(&queue);
    assert!(matches!(handle.wait(), Err(Error::TaskPanicked(_))));
}

// ============================================================================
// Thread contract
// ============================================================================

#[test]
fn test_drain_off_render_thread_rejected() {
    let queue = Arc::new(RenderTaskQueue::new(Arc::new(RenderThreadBinding::new())));
    queue.submit(RenderTask::new(TaskKind::Custom, |_| Ok(())));

    let mut device = HeadlessDevice::new();
    let mut context = TaskContext { device: &mut device, frame: 0 };
    assert!(matches!(queue.drain(&mut context), Err(Error::NotRenderThread(_))));
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_discard_all_fails_waiters() {
    let queue = bound_queue();
    let handle = queue.submit_awaitable(RenderTask::new(TaskKind::Custom, |_| Ok(())));
    queue.submit(RenderTask::new(TaskKind::Custom, |_| Ok(())));

    assert_eq!(queue.discard_all(), 2);
    assert!(queue.is_empty());
    assert_eq!(handle.wait(), Err(Error::TaskDiscarded));
}

#[test]
fn test_closed_queue_discards_new_submissions() {
    let queue = bound_queue();
    let pending = queue.submit_awaitable(RenderTask::new(TaskKind::Custom, |_| Ok(())));

    assert_eq!(queue.close(), 1);
    assert!(queue.is_closed());
    assert_eq!(pending.wait(), Err(Error::TaskDiscarded));

    let late = queue.submit_awaitable(RenderTask::new(TaskKind::Custom, |_| Ok(())));
    queue.submit(RenderTask::new(TaskKind::Custom, |_| Ok(())));
    assert!(queue.is_empty());
    assert_eq!(late.wait_timeout(Duration::from_millis(200)), Err(Error::TaskDiscarded));
}
