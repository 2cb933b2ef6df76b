//! Question definitions and attached media
//!
//! The types in this module are authored by the external CRUD layer and
//! consumed read-only by the session engine. They are validated once, at
//! authoring/start time, and treated as immutable while a session
//! referencing them is active.

pub mod media;
pub mod question;
