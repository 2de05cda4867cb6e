// Line-level diff using Myers' O(N·D) shortest edit script.

use redraft_core::{DiffLine, LineKind};

/// Split text into lines on `\n`.
/// A trailing newline does not produce a final empty line, and `""` has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Compute the edit script turning `old_text` into `new_text`.
pub fn diff_lines(old_text: &str, new_text: &str) -> Vec<DiffLine> {
    let old = split_lines(old_text);
    let new = split_lines(new_text);
    diff_slices(&old, &new)
}

/// Myers diff over pre-split line sequences.
///
/// Snakes are followed greedily before any edit step. On each diagonal the
/// insert step is taken only when it reaches strictly further than the delete
/// step, so within a change run removals come before additions and the same
/// input always yields the same script.
pub fn diff_slices(old: &[&str], new: &[&str]) -> Vec<DiffLine> {
    let trace = shortest_edit(old, new);
    backtrack(&trace, old, new)
}

/// Forward pass. `trace[d]` is the frontier (furthest x per diagonal) before round `d`.
fn shortest_edit(old: &[&str], new: &[&str]) -> Vec<Vec<isize>> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    let offset = max + 1;
    let mut v = vec![0isize; (2 * max + 3) as usize];
    let mut trace = Vec::new();

    for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                return trace;
            }
            k += 2;
        }
    }
    trace
}

fn backtrack(trace: &[Vec<isize>], old: &[&str], new: &[&str]) -> Vec<DiffLine> {
    let max = (old.len() + new.len()) as isize;
    let offset = max + 1;
    let mut x = old.len() as isize;
    let mut y = new.len() as isize;
    let mut script = Vec::with_capacity(old.len() + new.len());

    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            script.push(DiffLine::unchanged(old[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                script.push(DiffLine::added(new[prev_y as usize]));
            } else {
                script.push(DiffLine::removed(old[prev_x as usize]));
            }
        }
        x = prev_x;
        y = prev_y;
    }

    script.reverse();
    script
}

/// Rebuild the old text from a script (`Removed` and `Unchanged` lines).
pub fn reconstruct_old(lines: &[DiffLine]) -> String {
    join_kinds(lines, LineKind::Removed)
}

/// Rebuild the new text from a script (`Added` and `Unchanged` lines).
pub fn reconstruct_new(lines: &[DiffLine]) -> String {
    join_kinds(lines, LineKind::Added)
}

fn join_kinds(lines: &[DiffLine], side: LineKind) -> String {
    lines
        .iter()
        .filter(|l| l.kind == side || l.kind == LineKind::Unchanged)
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl DiffStats {
    pub fn has_changes(&self) -> bool {
        self.added + self.removed > 0
    }
}

pub fn stats(lines: &[DiffLine]) -> DiffStats {
    let mut stats = DiffStats::default();
    for line in lines {
        match line.kind {
            LineKind::Added => stats.added += 1,
            LineKind::Removed => stats.removed += 1,
            LineKind::Unchanged => stats.unchanged += 1,
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(lines: &[DiffLine]) -> Vec<(LineKind, &str)> {
        lines.iter().map(|l| (l.kind, l.text.as_str())).collect()
    }

    #[test]
    fn split_drops_trailing_newline_only() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert_eq!(split_lines("a\r\nb"), vec!["a\r", "b"]);
    }

    #[test]
    fn replaced_middle_line() {
        let script = diff_lines("a\nb\nc", "a\nx\nc");
        assert_eq!(
            kinds(&script),
            vec![
                (LineKind::Unchanged, "a"),
                (LineKind::Removed, "b"),
                (LineKind::Added, "x"),
                (LineKind::Unchanged, "c"),
            ]
        );
    }

    #[test]
    fn new_file_is_all_added() {
        let script = diff_lines("", "hello\nworld");
        assert_eq!(
            kinds(&script),
            vec![(LineKind::Added, "hello"), (LineKind::Added, "world")]
        );
    }

    #[test]
    fn deleted_file_is_all_removed() {
        let script = diff_lines("a\nb", "");
        assert!(script.iter().all(|l| l.kind == LineKind::Removed));
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn both_empty() {
        assert!(diff_lines("", "").is_empty());
    }

    #[test]
    fn removals_precede_additions_in_a_run() {
        let script = diff_lines("a\nb\nc\nd", "a\nx\ny\nd");
        assert_eq!(
            kinds(&script),
            vec![
                (LineKind::Unchanged, "a"),
                (LineKind::Removed, "b"),
                (LineKind::Removed, "c"),
                (LineKind::Added, "x"),
                (LineKind::Added, "y"),
                (LineKind::Unchanged, "d"),
            ]
        );
    }

    #[test]
    fn script_is_minimal() {
        // One insertion in the middle: anything longer than 1 edit is not minimal.
        let script = diff_lines("1\n2\n3\n4\n5", "1\n2\nnew\n3\n4\n5");
        let s = stats(&script);
        assert_eq!(s.added, 1);
        assert_eq!(s.removed, 0);
        assert_eq!(s.unchanged, 5);
    }

    #[test]
    fn deterministic_on_repeated_runs() {
        let old = "x\na\nb\nx\na\nb";
        let new = "a\nx\nb\nb\na\nx";
        let first = diff_lines(old, new);
        for _ in 0..5 {
            assert_eq!(diff_lines(old, new), first);
        }
    }

    #[test]
    fn stats_count_each_kind() {
        let s = stats(&diff_lines("a\nb\nc", "a\nx\nc"));
        assert_eq!(s, DiffStats { added: 1, removed: 1, unchanged: 2 });
        assert!(s.has_changes());
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c", "", "fn x() {}"]), 0..12)
            .prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn round_trips_both_sides(old in text_strategy(), new in text_strategy()) {
            let script = diff_lines(&old, &new);
            prop_assert_eq!(reconstruct_old(&script), split_lines(&old).join("\n"));
            prop_assert_eq!(reconstruct_new(&script), split_lines(&new).join("\n"));
        }

        #[test]
        fn self_diff_is_unchanged(text in text_strategy()) {
            let script = diff_lines(&text, &text);
            prop_assert!(script.iter().all(|l| l.kind == LineKind::Unchanged));
            prop_assert_eq!(script.len(), split_lines(&text).len());
        }
    }
}
