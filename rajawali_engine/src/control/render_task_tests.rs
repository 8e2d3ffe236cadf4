use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use crate::error::Error;
use crate::renderer::HeadlessDevice;
use super::*;

// ============================================================================
// TEST HELPERS
// ============================================================================

fn run_task(task: RenderTask) -> Result<()> {
    let mut device = HeadlessDevice::new();
    let mut context = TaskContext { device: &mut device, frame: 0 };
    task.run(&mut context)
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_body_runs_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&counter);
    let task = RenderTask::new(TaskKind::Custom, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    run_task(task).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failure_is_wrapped_with_kind_and_target() {
    let task = RenderTask::new(TaskKind::AddMaterial, |_| Err(Error::BackendError("boom".to_string())))
        .with_target("brick");

    match run_task(task) {
        Err(Error::TaskFailed(message)) => {
            assert!(message.contains("add-material"));
            assert!(message.contains("brick"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_panic_is_caught() {
    let task = RenderTask::new(TaskKind::Custom, |_| panic!("task exploded"));
    match run_task(task) {
        Err(Error::TaskPanicked(message)) => assert!(message.contains("task exploded")),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_body_sees_frame_index() {
    let mut device = HeadlessDevice::new();
    let mut context = TaskContext { device: &mut device, frame: 7 };
    let task = RenderTask::new(TaskKind::Custom, |ctx| {
        assert_eq!(ctx.frame, 7);
        Ok(())
    });
    task.run(&mut context).unwrap();
}

// ============================================================================
// Completion handles
// ============================================================================

#[test]
fn test_handle_receives_outcome() {
    let mut task = RenderTask::new(TaskKind::Custom, |_| Ok(()));
    let handle = task.completion_handle(None);
    assert!(handle.try_result().is_none());

    run_task(task).unwrap();
    assert_eq!(handle.try_result(), Some(Ok(())));
    assert_eq!(handle.wait(), Ok(()));
}

#[test]
fn test_handle_receives_failure() {
    let mut task = RenderTask::new(TaskKind::RemoveTexture, |_| Err(Error::Timeout));
    let handle = task.completion_handle(None);
    let _ = run_task(task);
    assert!(matches!(handle.wait(), Err(Error::TaskFailed(_))));
}

#[test]
fn test_dropped_task_reports_discarded() {
    let mut task = RenderTask::new(TaskKind::Custom, |_| Ok(()));
    let handle = task.completion_handle(None);
    drop(task);
    assert_eq!(handle.wait(), Err(Error::TaskDiscarded));
}

#[test]
fn test_wait_timeout_expires() {
    let mut task = RenderTask::new(TaskKind::Custom, |_| Ok(()));
    let handle = task.completion_handle(None);
    assert_eq!(handle.wait_timeout(Duration::from_millis(10)), Err(Error::Timeout));
    drop(task);
}

#[test]
fn test_wait_from_other_thread() {
    let mut task = RenderTask::new(TaskKind::Custom, |_| Ok(()));
    let handle = task.completion_handle(None);
    let waiter = thread::spawn(move || handle.wait_timeout(Duration::from_secs(5)));

    run_task(task).unwrap();
    assert_eq!(waiter.join().unwrap(), Ok(()));
}

#[test]
fn test_wait_on_render_thread_is_rejected() {
    let binding = Arc::new(RenderThreadBinding::new());
    binding.bind_current();
    let mut task = RenderTask::new(TaskKind::Custom, |_| Ok(()));
    let handle = task.completion_handle(Some(binding));

    assert!(matches!(handle.wait(), Err(Error::InvalidState(_))));
    run_task(task).unwrap();
    assert_eq!(handle.wait(), Ok(()));
}
