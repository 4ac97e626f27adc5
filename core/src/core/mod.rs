pub mod git;
pub mod repo;
pub mod settings;
pub mod state;
