// Re-export all model types from submodules
mod auth;
mod common;
mod games;
mod generation;
mod payments;

// Items from common are only used by the serde attributes of sibling modules
pub use auth::*;
pub use games::*;
pub use generation::*;
pub use payments::*;
