//! # Language School Bot
//!
//! A Telegram bot for a language school: students register, buy lesson
//! credits, book and cancel teacher time slots, and receive timed reminders.
//!
//! ## Features
//! - Atomic slot booking coupled to the lesson-credit balance
//! - Durable multi-step registration that survives restarts
//! - Automatic reminders (24 hours and 2 hours before a lesson)
//! - Pending/completed payment tracking with two confirmation paths
//! - Admin panel: slots, students, bookings, teachers, statistics
//! - Persistent storage with SQLite

/// Bot command handlers and message processing
pub mod bot;
/// Configuration management and environment variables
pub mod config;
/// Database connection, ledger engine and entity models
pub mod database;
/// Background services: reminders, payments, statistics, health
pub mod services;
/// Utility functions for datetime parsing and validation
pub mod utils;
