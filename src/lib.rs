//! Folio - a static site generator for XML-authored blogs.
//!
//! Sources are described as lazy [`fileset::FileSet`]s, transformed into
//! in-memory [`collection`]s and written through staged
//! [`generator::Generator`]s. [`build::build_site`] wires these together
//! into the blog pipeline.

#[macro_use]
pub mod logger;

pub mod build;
pub mod cli;
pub mod collection;
pub mod config;
pub mod data;
pub mod error;
pub mod fileset;
pub mod generator;
pub mod node;
pub mod session;
pub mod utils;
pub mod xml;
