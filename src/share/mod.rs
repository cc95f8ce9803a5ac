pub mod archive;
pub mod handlers;
pub mod link;
mod state;

pub use archive::{prepare_source, Archiver, SharedSource};
pub use link::generate_link_name;
pub use state::{ActiveTransfer, ShareAppState};
