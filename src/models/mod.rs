pub mod checklist;
pub mod client;
pub mod document;
pub mod enums;
pub mod intake;

pub use checklist::*;
pub use client::*;
pub use document::*;
pub use enums::*;
pub use intake::*;
