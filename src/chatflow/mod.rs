// SPDX-License-Identifier: MIT

//! Chat workflows built on the `adk` layer
//!
//! - `workflow` - Hospital Booking and OKR Chat graphs, the catalog and sessions
//! - `tools` - tools offered to the OKR chat agent
//! - `server` - HTTP front end
//! - `config` - environment configuration

pub mod config;
pub mod server;
pub mod tools;
pub mod workflow;
