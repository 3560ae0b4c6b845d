mod export;
mod load;
pub(crate) mod message;

pub use load::load_export;
pub use message::{ChatExport, Message, MessageKind, Reaction, build_index};
