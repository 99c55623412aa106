pub mod backup;
pub mod catalog;
pub mod core;
pub mod import;
pub mod objections;
pub mod results;
pub mod settings;
pub mod stats;
pub mod students;
