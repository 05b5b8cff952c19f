//! curl2req turns a cURL command line into a structured request description.
//!
//! The [`command`] module owns the interesting part: a winnow-based shell
//! tokenizer plus a flag mapper that produce a
//! [`command::ParsedRequest`]. The [`server`] module is the thin axum
//! boundary exposing it as `POST /parse-curl`.

pub mod command;
pub mod server;
