#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the kratos download engine
//!
//! This crate provides the types shared by every layer of the engine,
//! most importantly the [`DownloadTarget`] handed to each download.

pub mod target;

pub use target::{DownloadTarget, DownloadTargetBuilder};
pub use url::Url;
