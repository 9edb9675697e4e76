//! Observability setup for kbuilder: tracing subscriber and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
