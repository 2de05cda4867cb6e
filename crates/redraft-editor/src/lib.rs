// redraft-editor: headless document buffers for applying and reviewing patches.

pub mod buffer;
pub mod workspace;

pub use buffer::Buffer;
pub use workspace::Workspace;
