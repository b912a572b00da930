//! The library behind the `colophon` static site generator. A build is a
//! single pass over three stages:
//!
//! 1. Extraction ([`parser`]): markdown files with front-matter become an
//!    ordered collection of [`models::Post`] records.
//! 2. Rendering ([`render`]): a [`theme::Theme`] and [`config::Config`]
//!    bind into a template environment that produces each output view
//!    (index, post, archive, tag pages), including per-post content
//!    encryption ([`crypto`]).
//! 3. Generation ([`build`]): the orchestrator writes every page and
//!    auxiliary artifact (search index, RSS, sitemap) under the output
//!    directory, with every URL prefixed by the normalized base path
//!    ([`urls`]).

pub mod build;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frontmatter;
pub mod models;
pub mod parser;
pub mod render;
pub mod rss;
pub mod sitemap;
pub mod theme;
pub mod urls;

pub use error::{Error, Result};
