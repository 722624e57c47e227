use crate::util::prelude::*;
use std::fmt;
use std::time::Duration;

#[must_use]
pub fn tracing_err<'a, E: std::error::Error + 'static>(err: &'a E) -> impl tracing::Value + 'a {
    err as &dyn std::error::Error
}

pub(crate) fn tracing_duration(duration: Duration) -> impl tracing::Value {
    tracing::field::display(Formatted(move |f: &mut fmt::Formatter<'_>| {
        write!(f, "{duration:.2?}")
    }))
}

/// Size of a file or a payload, rendered with binary units
pub(crate) fn tracing_size(bytes: u64) -> impl tracing::Value {
    tracing::field::display(Formatted(move |f: &mut fmt::Formatter<'_>| {
        f.write_str(&human_size(bytes))
    }))
}

struct Formatted<F>(F);

impl<F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result> fmt::Display for Formatted<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.0)(f)
    }
}
