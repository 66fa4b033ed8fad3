//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use trellis_core::log_op_start;
/// log_op_start!("create_entity");
/// log_op_start!("create_entity", path = "/t;acme");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use trellis_core::log_op_end;
/// log_op_end!("create_entity", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// # Example
///
/// ```ignore
/// # use trellis_core::{log_op_error, errors::TrellisError};
/// let err = TrellisError::EntityNotFound { path: "/t;acme".to_string() };
/// log_op_error!("read_entity", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::TrError;
        let tr_err: TrError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?tr_err.kind(),
            err_code = tr_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::TrError;
        let tr_err: TrError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = trellis_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?tr_err.kind(),
            err_code = tr_err.code(),
            $($field)*
        );
    }};
}
