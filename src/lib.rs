//! StudyVault - study materials, blog posts and timed quizzes
//!
//! This library provides the storage, services and HTTP layer for the
//! StudyVault site. The binary in `main.rs` wires them together.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod views;
