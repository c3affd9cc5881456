//! Canonical logging macros
//!
//! These macros provide a structured, consistent way to log operations.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use gold_logging::log_op_start;
/// log_op_start!("search");
/// log_op_start!("search", corpus = "gm");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use gold_logging::log_op_end;
/// log_op_end!("search", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_END,
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
/// # use gold_logging::log_op_error;
/// # use gold_errors::GoldError;
/// let err = GoldError::not_found("no such changelist");
/// log_op_error!("search", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let gold_err: &gold_errors::GoldError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?gold_err.kind(),
            err_code = gold_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let gold_err: &gold_errors::GoldError = &$err;
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = gold_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?gold_err.kind(),
            err_code = gold_err.code(),
            $($field)*
        );
    }};
}
