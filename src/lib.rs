//! VBScript/Classic ASP Language Server Library
//!
//! Provides:
//! - ASP script-block extraction from mixed HTML/VBScript pages
//! - A tolerant, line-oriented VBScript symbol parser
//! - Workspace-wide symbol indexing and reference tracking
//! - `#include` directive resolution and an include graph
//! - LSP protocol implementation

pub mod asp;
pub mod casefold;
pub mod config;
pub mod encoding;
pub mod graph;
pub mod include;
pub mod index;
pub mod parser;
pub mod position;
pub mod refs;
pub mod scanner;
pub mod server;
pub mod workspace;
