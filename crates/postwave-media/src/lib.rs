//! `postwave-media` — the image collaborators.
//!
//! Two narrow seams: [`Compose`] turns a base image + overlay + title
//! into a publicly retrievable cover URL, and [`ObjectStore`] hosts raw
//! image bytes when the compositing service hands bytes back instead of
//! a hosted URL. This crate decides nothing about *which* images a post
//! uses — that is the payload assembler's job.

pub mod compose;
pub mod error;
pub mod storage;

pub use compose::{Compose, ComposeRequest, SwitchboardCompositor};
pub use error::{MediaError, Result};
pub use storage::{HttpObjectStore, ObjectStore, StoredObject};
