//! Asynchronous render jobs: registry, retention cleanup and the submit/poll/fetch service.

pub(crate) mod reaper;
pub(crate) mod registry;
pub(crate) mod service;
