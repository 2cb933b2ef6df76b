//! # Quizcore
//!
//! This library is the core engine of a live, multi-participant quiz
//! system. An administrator runs a timed session of a quiz game; polling
//! participants see each question while its answer window is open, submit
//! option indices, and receive log-decay scores on a final leaderboard
//! once the session ends. The engine is transport-agnostic: it exposes
//! synchronous operations and role-specific snapshots, and a boundary
//! layer maps those onto whatever protocol it serves.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]

pub mod constants;

pub mod engine;
pub mod error;
pub mod game;
pub mod participant;
pub mod quiz;
pub mod registry;
pub mod scoring;
pub mod session;
pub mod session_id;
pub mod view;

pub use engine::{Engine, SessionCommand};
pub use error::{Error, ErrorKind, Result};
pub use game::{Game, GameId, GameRepository, InMemoryGameRepository};
pub use participant::ParticipantId;
pub use session_id::SessionId;
pub use view::{ResultsView, StatusView};
