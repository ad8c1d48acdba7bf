pub mod data;
pub mod defaults;
pub mod io;
pub mod keys;

pub use data::{path_display, Config};
pub use defaults::Settings;
pub use io::ConfigError;

#[cfg(test)]
mod tests;
