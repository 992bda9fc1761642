//! Leaf streams that can be layered.

mod media;
mod memory;

pub use media::SymphoniaStream;
pub use memory::MemoryStream;
