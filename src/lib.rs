//! Feed Digest - a daily research report built from RSS feeds
//!
//! This crate fetches articles from a list of RSS/Atom feeds, ranks and trims
//! them, asks a chat-completion model to write a Markdown report from a prompt
//! template, and saves the result as a dated file.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod prompt;
pub mod report;

pub use error::{DigestError, Result};
