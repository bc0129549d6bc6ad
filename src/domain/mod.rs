pub mod distance;
pub mod error;
pub mod models;
pub mod scan;
pub mod settings;
