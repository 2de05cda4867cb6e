// redraft-diff: Myers line diff and hunk segmentation.

pub mod hunks;
pub mod myers;

pub use hunks::{segment, segment_blocks, HunkBlock};
pub use myers::{
    diff_lines, diff_slices, reconstruct_new, reconstruct_old, split_lines, stats, DiffStats,
};
