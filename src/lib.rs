//! # ClaudeSync
//!
//! Keep a local directory in sync with the documents of a Claude.ai project.
//!
//! A push scans the local sync root, fetches the remote document list, and
//! reconciles the two: new and changed files are uploaded, then remote
//! documents with no local counterpart are deleted. The same client also
//! manages organizations, projects, and chat conversations, including
//! streamed completions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Scanner    │──▶│ Sync Engine  │──▶│   Provider   │──▶ claude.ai
//! │ (local map)  │   │ plan + apply │   │  HTTP + SSE  │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!         ▲                                     │
//!         │          ┌──────────────┐           │
//!         └──────────│ ConfigStore  │◀──────────┘
//!                    │ global+local │
//!                    └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! claudesync auth login              # store a session key
//! claudesync organization set        # pick an organization
//! claudesync project create          # create and select a project here
//! claudesync push                    # mirror this directory remotely
//! claudesync chat message "hello"    # stream a reply
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Global and local configuration layers |
//! | [`error`] | Library error type |
//! | [`models`] | Remote entities and stream events |
//! | [`scanner`] | Local file map with content fingerprints |
//! | [`provider`] | Provider trait and the Claude.ai HTTP client |
//! | [`sse`] | Event-stream decoding and the message stream |
//! | [`sync`] | Push reconciliation |
//! | [`progress`] | Push progress reporting |
//! | [`auth`], [`config_cmd`], [`organization`], [`project`], [`chat`], [`push`] | CLI commands |

pub mod auth;
pub mod chat;
pub mod config;
pub mod config_cmd;
pub mod error;
pub mod models;
pub mod organization;
pub mod progress;
pub mod project;
pub mod prompt;
pub mod provider;
pub mod push;
pub mod scanner;
pub mod sse;
pub mod sync;
