//! Group Archiver Core Library
//!
//! Archives the content of a hosted group service (messages, files, photos,
//! links, databases, polls, members, calendar, about pages) through its
//! undocumented, cookie-authenticated JSON API.
//!
//! # Architecture
//!
//! - [`api`] - resilient client: transport, error classifier, retry/backoff,
//!   endpoint table, JSON envelope
//! - [`archive`] - traversal engine: one walk per resource family, writing
//!   through an [`archive::ArtifactStore`]

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod archive;
mod user_agent;

// Re-export commonly used types
pub use api::{
    ApiError, BackoffPolicy, DownloadOutcome, Endpoint, FailureType, GroupsClient, RetryDecision,
    Session, SessionCookie, classify_error,
};
pub use archive::{
    ArchiveError, ArchiveOptions, ArchiveReport, ArchiveStats, Archiver, FamilyOutcome, FsStore,
    MemoryStore, MessageRange, ResourceFamily,
};
