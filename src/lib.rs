//! Blogdesk - A small multi-author blog platform
//!
//! This library provides articles, tags, comments, users and roles behind
//! an axum HTTP API with policy-based authorization.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
