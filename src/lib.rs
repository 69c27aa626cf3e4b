//! sattl - REST backend for a bikepacking and travel blog
//!
//! This library provides adventures, tags, equipment, images and profiles
//! behind a JSON API with bearer token authentication.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
