pub mod archive;
pub mod config;
pub mod download;
pub mod install;
pub mod locate;
