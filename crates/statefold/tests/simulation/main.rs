//! In-memory simulation scenarios exercising the full component lifecycle:
//! replay, effect interpretation, workflow transitions, and service routing.

mod service;
mod support;
