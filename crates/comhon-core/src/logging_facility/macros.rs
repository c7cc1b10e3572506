//! Operation logging macros
//!
//! Every logged operation names the model it works on. An operation emits
//! one `start` event and then either an `end` or an `end_error` event, both
//! carrying the elapsed time in milliseconds.

#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:ident, $op:expr, $model:expr, $event:expr, $($field:tt)*) => {
        $crate::tracing::$level!(
            component = module_path!(),
            op = $op,
            model = %$model,
            event = $event,
            $($field)*
        )
    };
}

/// Log the start of an operation on `model`
///
/// ```
/// # use comhon_core::log_op_start;
/// log_op_start!("import", "Shop\\Item", format = "json");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr, $model:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info, $op, $model, $crate::comhon_core_types::schema::EVENT_START, $($($field)*)?
        )
    };
}

/// Log the successful end of an operation on `model`
///
/// ```
/// # use comhon_core::log_op_end;
/// log_op_end!("export", "Shop\\Item", 3u64);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, $model:expr, $duration_ms:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            info, $op, $model, $crate::comhon_core_types::schema::EVENT_END,
            duration_ms = $duration_ms, $($($field)*)?
        )
    };
}

/// Log the failure of an operation on `model` with the kind and code of
/// its error
///
/// ```
/// # use comhon_core::{log_op_error, ComhonError};
/// let err = ComhonError::ModelNotFound { model: "Shop\\Item".to_string() };
/// log_op_error!("load_model", "Shop\\Item", &err, 10u64);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $model:expr, $err:expr, $duration_ms:expr $(, $($field:tt)*)?) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        $crate::__log_op_event!(
            error, $op, $model, $crate::comhon_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration_ms,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            $($($field)*)?
        )
    }};
}
