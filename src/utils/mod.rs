mod encoding;
mod hash;

pub use encoding::{decode_content, encode_content};
pub use hash::compute_hash;

/// Branch used when the caller does not name one
pub const DEFAULT_BRANCH: &str = "main";

/// Current forgesync version
pub const FORGESYNC_VERSION: &str = env!("CARGO_PKG_VERSION");

