pub mod swap_path;
pub mod swap_path_hash;

pub use swap_path::{SwapPath, generate_swap_path_hash};
pub use swap_path_hash::SwapPathHash;
