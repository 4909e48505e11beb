// src/lib.rs

//! Form Relay Library
//!
//! Polls a spreadsheet of form responses and announces new rows on Discord.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
