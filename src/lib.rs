pub mod analysis;
pub mod charts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod features;
pub mod forest;
pub mod http_client;
pub mod logistic;
pub mod metrics;
pub mod model;
pub mod monitoring;
pub mod outcome;
pub mod pipeline;
pub mod preprocess;
pub mod preprocessor;
pub mod report;
pub mod training;
