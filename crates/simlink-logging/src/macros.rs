//! ---
//! sl_section: "03-logging"
//! sl_subsection: "module"
//! sl_type: "source"
//! sl_scope: "code"
//! sl_description: "Structured logging context and event helpers."
//! sl_version: "v0.0.0-prealpha"
//! sl_owner: "tbd"
//! ---
/// Emit an informational log enriched with device context.
#[macro_export]
macro_rules! sl_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::INFO,
            robot = ctx.robot.unwrap_or(""),
            device = ctx.device.unwrap_or(""),
            topic = ctx.topic.unwrap_or(""),
            step = ctx.step.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::sl_info!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a debug log enriched with device context.
#[macro_export]
macro_rules! sl_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::DEBUG,
            robot = ctx.robot.unwrap_or(""),
            device = ctx.device.unwrap_or(""),
            topic = ctx.topic.unwrap_or(""),
            step = ctx.step.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::sl_debug!(context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit a warning enriched with device context.
#[macro_export]
macro_rules! sl_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $crate::tracing::Level::WARN,
            robot = ctx.robot.unwrap_or(""),
            device = ctx.device.unwrap_or(""),
            topic = ctx.topic.unwrap_or(""),
            step = ctx.step.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        $crate::sl_warn!(context = $crate::LogContext::default(), $($arg)+)
    }};
}
