//! Infrastructure layer - Concrete collaborators of the experiment domain

pub mod analytics;
pub mod events;
pub mod logging;
pub mod profile;
pub mod slot;
pub mod storage;
