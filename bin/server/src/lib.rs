//! taskhook web server.
//!
//! This crate provides the REST API for managing webhook tasks and the
//! PostgreSQL-backed task store the scheduler runs against.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
