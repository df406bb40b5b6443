//! Repository modules for database operations

pub mod sessions;
pub mod turns;

pub use sessions::SessionsRepo;
pub use turns::TurnsRepo;
