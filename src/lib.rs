pub mod aggregation;
pub use aggregation::*;

pub mod batch;
pub mod configuration;
pub mod control;
pub mod controller;
pub mod error_handling;
pub mod feed;

pub mod record;
pub use record::*;

pub mod view;
pub mod web_interface;
