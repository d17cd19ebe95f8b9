mod acquisition;
mod mask;
mod primitives;

pub use acquisition::*;
pub use mask::*;
pub use primitives::*;
