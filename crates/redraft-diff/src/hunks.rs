// Hunk segmentation: group an edit script into independently resolvable blocks.

use redraft_core::{DiffLine, Hunk, LineKind};

/// A hunk together with the text needed to accept or reject it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkBlock {
    pub hunk: Hunk,
    /// Lines the patch removed from the document, in order.
    pub removed: Vec<String>,
    /// Lines the patch inserted into the document, in order.
    pub added: Vec<String>,
}

impl HunkBlock {
    fn open(start_line: usize) -> Self {
        Self {
            hunk: Hunk::new(start_line, 0, 0),
            removed: Vec::new(),
            added: Vec::new(),
        }
    }
}

/// Hunk positions for a script streamed into a document starting at `start_line`.
pub fn segment(lines: &[DiffLine], start_line: usize) -> Vec<Hunk> {
    segment_blocks(lines, start_line)
        .into_iter()
        .map(|block| block.hunk)
        .collect()
}

/// Like [`segment`], keeping each hunk's removed and added text.
///
/// `start_line` of each hunk is the document line where its added lines begin
/// once the script has been applied. Removed lines leave the document, so they
/// never advance the cursor.
pub fn segment_blocks(lines: &[DiffLine], start_line: usize) -> Vec<HunkBlock> {
    let mut blocks = Vec::new();
    let mut cursor = start_line;
    let mut current: Option<HunkBlock> = None;

    for line in lines {
        match line.kind {
            LineKind::Unchanged => {
                if let Some(block) = current.take() {
                    cursor = block.hunk.end_line();
                    blocks.push(block);
                }
                cursor += 1;
            }
            LineKind::Added => {
                let block = current.get_or_insert_with(|| HunkBlock::open(cursor));
                block.hunk.added_count += 1;
                block.added.push(line.text.clone());
            }
            LineKind::Removed => {
                let block = current.get_or_insert_with(|| HunkBlock::open(cursor));
                block.hunk.removed_count += 1;
                block.removed.push(line.text.clone());
            }
        }
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff_lines;

    #[test]
    fn single_replacement_hunk() {
        let hunks = segment(&diff_lines("a\nb\nc", "a\nx\nc"), 0);
        assert_eq!(hunks, vec![Hunk::new(1, 1, 1)]);
    }

    #[test]
    fn new_file_is_one_hunk() {
        let hunks = segment(&diff_lines("", "hello\nworld"), 0);
        assert_eq!(hunks, vec![Hunk::new(0, 2, 0)]);
    }

    #[test]
    fn no_changes_no_hunks() {
        assert!(segment(&diff_lines("a\nb", "a\nb"), 0).is_empty());
        assert!(segment(&[], 0).is_empty());
    }

    #[test]
    fn positions_follow_the_patched_document() {
        // old: a b c d e f   new: a X c d Y Z f
        let script = diff_lines("a\nb\nc\nd\ne\nf", "a\nX\nc\nd\nY\nZ\nf");
        let hunks = segment(&script, 0);
        assert_eq!(hunks, vec![Hunk::new(1, 1, 1), Hunk::new(4, 2, 1)]);
    }

    #[test]
    fn pure_deletion_anchors_at_following_line() {
        let script = diff_lines("a\nb\nc\nd", "a\nd");
        let blocks = segment_blocks(&script, 0);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].hunk, Hunk::new(1, 0, 2));
        assert_eq!(blocks[0].removed, vec!["b".to_string(), "c".to_string()]);
        assert!(blocks[0].added.is_empty());
    }

    #[test]
    fn start_line_offsets_every_hunk() {
        let hunks = segment(&diff_lines("a\nb", "a\nc"), 10);
        assert_eq!(hunks, vec![Hunk::new(11, 1, 1)]);
    }

    #[test]
    fn hunks_are_sorted_and_disjoint() {
        let script = diff_lines(
            "1\n2\n3\n4\n5\n6\n7\n8",
            "0\n1\n2b\n3\n5\n6\n6b\n7\n8\n9",
        );
        let hunks = segment(&script, 0);
        for pair in hunks.windows(2) {
            assert!(pair[0].end_line() <= pair[1].start_line);
        }
    }
}
