// Domain module: planning inputs, results, and the generic solver contract

pub mod config;
pub mod errors;
pub mod input;
pub mod layout;
pub mod models;
pub mod results;
pub mod scenario;
pub mod solver_service;
pub mod teams;
pub mod value_objects;

pub use config::*;
pub use errors::*;
pub use input::*;
pub use layout::*;
pub use models::*;
pub use results::*;
pub use scenario::*;
pub use solver_service::*;
pub use teams::*;
pub use value_objects::*;
