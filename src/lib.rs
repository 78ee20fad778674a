//! # vocab-context
//!
//! A local-first tool for learning vocabulary in context.
//!
//! Add your own reading material (articles, magazines, notes) to a local
//! library, search for a word, and get back real example passages from
//! your documents, each annotated by a language model with a translation
//! and the word's meaning in that particular context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Library    │──▶│   Extract    │──▶│   Annotate   │
//! │ SQLite docs  │   │ sentences +  │   │ Gemini/OpenAI│
//! └──────────────┘   │ windows      │   └──────┬───────┘
//!                    └──────────────┘          │
//!                                              ▼
//!                                   ┌────────────────────┐
//!                                   │ text / report / csv│
//!                                   └────────────────────┘
//! ```
//!
//! Extraction is pure and synchronous and never touches the network;
//! annotation is an injected [`annotate::Annotator`] handle.
//!
//! ## Quick Start
//!
//! ```bash
//! vctx init                          # create database
//! vctx add ./magazines               # upload .md / .txt files
//! vctx search mitigate               # find and annotate examples
//! vctx search mitigate --format csv --output ./exports
//! vctx history list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`sentence`] | Punctuation-based sentence splitting |
//! | [`extract`] | Keyword-in-context snippet extraction |
//! | [`annotate`] | Annotation service trait and providers |
//! | [`library`] | Document upload, listing, and removal |
//! | [`history`] | Recent search terms |
//! | [`search`] | Search orchestration |
//! | [`export`] | Report and CSV rendering |
//! | [`status`] | Readiness check |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod annotate;
pub mod config;
pub mod db;
pub mod export;
pub mod extract;
pub mod history;
pub mod library;
pub mod migrate;
pub mod models;
pub mod search;
pub mod sentence;
pub mod status;
