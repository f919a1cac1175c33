//! Declaration of traits reused across the code.

use crate::filesystem::fat_error::FATError;

/// Implementation of the LayoutDisplay trait.
/// It is used to display the layout of a given structure such as a volume.
pub trait LayoutDisplay {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error>;
}

/// Renders the directory tree of a structure.
///
/// Listing directories reads sectors, hence the mutable receiver.
pub trait TreeDisplay {
    fn display_tree(&mut self) -> Result<String, FATError>;
}
