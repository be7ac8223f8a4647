//! Fragment (schematic) clipboards and loading.
#![forbid(unsafe_code)]

mod clipboard;
mod error;
mod loader;
mod locate;

pub use clipboard::Clipboard;
pub use error::SchematicError;
pub use loader::{FragmentSource, McSchemLoader};
pub use locate::{FragmentKind, fragment_path, fragment_root};
