//! Feature-gated tracing macros.
//!
//! With the `tracing` feature the macros forward to `tracing`; without it
//! they compile away. Event fields are still evaluated in the disabled build
//! so call sites do not trigger unused-variable warnings.

/// Opens an info-level span. Use as `let _g = trace_span!(..).entered();`.
#[cfg(feature = "tracing")]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        tracing::info_span!($name $(, $($field)*)?)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_span {
    ($name:expr $(, $($field:tt)*)?) => {
        $crate::trace::NoopSpan
    };
}

/// Emits an info-level event with `key = value` fields.
#[cfg(feature = "tracing")]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        tracing::info!(name: $name, $($key = $value),+)
    };
    ($name:expr) => {
        tracing::info!(name: $name)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_event {
    ($name:expr, $($key:ident = $value:expr),+ $(,)?) => {
        let _ = ($($value,)+);
    };
    ($name:expr) => {};
}

/// Emits a warn-level event for rejected input, with a display-formatted reason.
#[cfg(feature = "tracing")]
macro_rules! trace_reject {
    ($name:expr, $reason:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::warn!(name: $name, $($key = $value,)* reason = %$reason)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_reject {
    ($name:expr, $reason:expr, $($key:ident = $value:expr),* $(,)?) => {
        let _ = (&$reason, $($value,)*);
    };
}

pub(crate) use trace_event;
pub(crate) use trace_reject;
pub(crate) use trace_span;

/// Stand-in span guard for builds without the `tracing` feature.
#[cfg(not(feature = "tracing"))]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Mirrors `Span::entered()`.
    #[inline]
    pub fn entered(self) -> Self {
        self
    }
}
