pub mod level;
pub mod profile;
pub mod slot;
