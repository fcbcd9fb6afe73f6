pub mod config;
pub mod main_lib;
pub mod render;
