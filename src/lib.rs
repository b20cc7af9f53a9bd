pub mod app;
pub mod cascade;
pub mod classify;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod geo;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod pubmed;
pub mod section;
pub mod soft;
pub mod store;
pub mod units;
