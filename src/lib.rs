//! # Feed Summarizer
//!
//! Fetches RSS/Atom feeds, downloads every linked page under a bounded
//! concurrency limit and a global deadline, and asks a generative AI model to
//! summarize the result. The free-form reply can then be reshaped into JSON
//! records through an output template.
//!
//! ## Architecture
//!
//! 1. **Feed**: [`fetcher::feed`] parses RSS 2.0, RSS 1.0 (RDF), and Atom
//! 2. **Pages**: [`fetcher::fetch_all`] fetches all links in parallel; each
//!    link either succeeds or is reported in an aggregated error
//! 3. **Prompt**: [`prompt::PromptBuilder`] renders one block per item
//! 4. **Generate**: [`api::GenAiClient`] returns the model's reply
//! 5. **Format**: [`jsonify::extract_and_format`] pulls JSON out of the reply
//!    and reshapes each value through a template

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod jsonify;
pub mod models;
pub mod outputs;
pub mod prompt;
pub mod summarize;
pub mod utils;
