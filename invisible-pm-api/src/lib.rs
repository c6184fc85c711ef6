//! # Invisible PM API Server Library
//!
//! HTTP surface of Invisible PM: workspaces, projects, kanban tasks, time
//! tracking, budgets and the Outlook calendar integration.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: environment configuration
//! - `error`: error type and HTTP response mapping
//! - `middleware`: security headers
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
