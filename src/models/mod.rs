mod chat;
pub mod image;

pub use chat::*;
pub use image::{Attachment, InlineImage};
