//! Unit tests for error.rs
//!
//! Tests Error variants, Display output and the engine_err!/engine_bail! macros.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("node already attached".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Invalid state"));
    assert!(display.contains("node already attached"));
}

#[test]
fn test_interrupted_display() {
    assert_eq!(format!("{}", Error::Interrupted), "Interrupted while waiting for lock");
}

#[test]
fn test_unsupported_render_type_display() {
    let err = Error::UnsupportedRenderType("Depth".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Unsupported render type"));
    assert!(display.contains("Depth"));
}

#[test]
fn test_task_errors_display() {
    assert!(format!("{}", Error::TaskFailed("AddMaterial".to_string())).contains("AddMaterial"));
    assert!(format!("{}", Error::TaskPanicked("boom".to_string())).contains("boom"));
    assert_eq!(format!("{}", Error::TaskDiscarded), "Render task discarded before execution");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::Interrupted;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Error::LockReentry("write while reading".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Error::Interrupted);
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
fn test_engine_err_builds_invalid_state() {
    let err = crate::engine_err!("rajawali::test", "bad node {}", 7);
    assert_eq!(err, Error::InvalidState("bad node 7".to_string()));
}

#[test]
fn test_engine_bail_returns_early() {
    fn check(value: i32) -> Result<i32> {
        if value < 0 {
            crate::engine_bail!("rajawali::test", "negative value {}", value);
        }
        Ok(value * 2)
    }

    assert_eq!(check(4), Ok(8));
    assert_eq!(check(-1), Err(Error::InvalidState("negative value -1".to_string())));
}

// ============================================================================
// ERROR PROPAGATION TESTS
// ============================================================================

#[test]
fn test_error_propagation_with_question_mark() {
    fn inner() -> Result<i32> {
        Err(Error::Interrupted)
    }

    fn outer() -> Result<i32> {
        inner()?;
        Ok(42)
    }

    assert_eq!(outer(), Err(Error::Interrupted));
}
