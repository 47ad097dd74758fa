pub mod format;
pub mod hash;
pub mod importer;

pub use format::*;
pub use hash::*;
pub use importer::*;
