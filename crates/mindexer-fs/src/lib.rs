pub mod async_walker;
pub mod io;

pub use async_walker::{Filtering, WalkConfig, WalkEntry, walk, walk_filtered};
pub use io::atomic_write_str;
