pub mod assignment;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod optimizer;
pub mod pipeline;
pub mod scorer;
pub mod selector;
pub mod solver;
// cmd and reports belong to the binary (main.rs).
