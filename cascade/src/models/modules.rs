mod fusion_block;
mod primitives;
mod res_block;

pub use fusion_block::*;
pub use primitives::*;
pub use res_block::*;
