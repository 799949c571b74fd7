//! PromoTrack - Behavioral analytics backend for a promo-code directory
//!
//! This library provides the event-tracking and popularity-ranking core
//! of the directory: high-frequency ingestion with session deduplication,
//! hourly aggregation into durable daily rollups, retention cleanup,
//! auto-hot flagging, and the composite popularity ordering used by
//! listing endpoints.
//!
//! # Architecture
//! - `analytics`: ingestion, aggregation, retention, auto-hot, ranking
//! - `cache`: dedup cache backends (Redis / in-process / null)
//! - `storage`: SeaORM storage facade and data access
//! - `api`: HTTP services and routing
//! - `cli`: command-line entry points (serve / aggregate / cleanup / ...)
//! - `config`: configuration management

pub mod analytics;
pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod storage;
pub mod utils;
