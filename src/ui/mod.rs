pub mod clipboard;
pub mod qr;

pub use clipboard::{ClipboardSink, LinkSink};
pub use qr::generate_qr;
