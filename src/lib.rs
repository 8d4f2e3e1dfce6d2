//! Drupal installer library
//!
//! Downloads the latest Drupal release, unpacks it and installs it into a
//! local web server document root. Used by the `drupal-install` CLI.

pub mod commands;
pub mod core;
pub mod error;
pub mod utils;
