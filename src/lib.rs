#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod geom;
pub mod graph;
pub mod route;

#[cfg(feature = "cli")]
pub use cli::run;
pub use route::route_graph;
