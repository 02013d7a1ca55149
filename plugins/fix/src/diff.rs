//! Line-based unified diffs for dry-run output.

const CONTEXT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Keep,
    Delete,
    Insert,
}

/// Unified diff of `old` against `new`; empty when both are equal.
pub fn unified_diff(label: &str, old: &str, new: &str, is_new_file: bool) -> String {
    if old == new {
        return String::new();
    }

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let script = edit_script(&old_lines, &new_lines);

    let mut out = String::new();
    if is_new_file {
        out.push_str("--- /dev/null\n");
    } else {
        out.push_str(&format!("--- a/{}\n", label));
    }
    out.push_str(&format!("+++ b/{}\n", label));

    for hunk in hunks(&script) {
        let (mut old_at, mut new_at) = position(&script, hunk.start);
        let old_len = script[hunk.clone()].iter().filter(|(op, _, _)| *op != Op::Insert).count();
        let new_len = script[hunk.clone()].iter().filter(|(op, _, _)| *op != Op::Delete).count();
        if old_len > 0 {
            old_at += 1;
        }
        if new_len > 0 {
            new_at += 1;
        }
        out.push_str(&format!("@@ -{},{} +{},{} @@\n", old_at, old_len, new_at, new_len));

        for (op, old_index, new_index) in &script[hunk] {
            match op {
                Op::Keep => out.push_str(&format!(" {}\n", old_lines[*old_index])),
                Op::Delete => out.push_str(&format!("-{}\n", old_lines[*old_index])),
                Op::Insert => out.push_str(&format!("+{}\n", new_lines[*new_index])),
            }
        }
    }

    out
}

/// Longest-common-subsequence edit script over lines. Each entry carries the
/// old and new line index it refers to.
fn edit_script(old: &[&str], new: &[&str]) -> Vec<(Op, usize, usize)> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    // lengths[i][j] = LCS of a[i..] and b[j..]
    let mut lengths = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lengths[i][j] = if a[i] == b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut script: Vec<(Op, usize, usize)> = (0..prefix).map(|i| (Op::Keep, i, i)).collect();
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        if i < a.len() && j < b.len() && a[i] == b[j] {
            script.push((Op::Keep, prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if i < a.len() && (j == b.len() || lengths[i + 1][j] >= lengths[i][j + 1]) {
            script.push((Op::Delete, prefix + i, prefix + j));
            i += 1;
        } else {
            script.push((Op::Insert, prefix + i, prefix + j));
            j += 1;
        }
    }
    for k in 0..suffix {
        script.push((Op::Keep, prefix + a.len() + k, prefix + b.len() + k));
    }

    script
}

/// Ranges of the script covering each change plus its context lines.
fn hunks(script: &[(Op, usize, usize)]) -> Vec<std::ops::Range<usize>> {
    let mut ranges: Vec<std::ops::Range<usize>> = Vec::new();

    for (index, (op, _, _)) in script.iter().enumerate() {
        if *op == Op::Keep {
            continue;
        }
        let start = index.saturating_sub(CONTEXT);
        let end = (index + CONTEXT + 1).min(script.len());
        match ranges.last_mut() {
            Some(last) if start <= last.end => last.end = last.end.max(end),
            _ => ranges.push(start..end),
        }
    }

    ranges
}

/// Old and new line counts consumed before `index`.
fn position(script: &[(Op, usize, usize)], index: usize) -> (usize, usize) {
    script[..index].iter().fold((0, 0), |(old, new), (op, _, _)| match op {
        Op::Keep => (old + 1, new + 1),
        Op::Delete => (old + 1, new),
        Op::Insert => (old, new + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_content_has_no_diff() {
        assert_eq!(unified_diff("pom.xml", "a\nb\n", "a\nb\n", false), "");
    }

    #[test]
    fn test_insertion_hunk() {
        let old = "<modules>\n  <module>foo-api</module>\n</modules>\n";
        let new = "<modules>\n  <module>foo-api</module>\n  <module>foo-core</module>\n</modules>\n";
        let diff = unified_diff("pom.xml", old, new, false);
        assert_eq!(
            diff,
            "--- a/pom.xml\n+++ b/pom.xml\n@@ -1,3 +1,4 @@\n <modules>\n   <module>foo-api</module>\n+  <module>foo-core</module>\n </modules>\n"
        );
    }

    #[test]
    fn test_new_file() {
        let diff = unified_diff("foo-core/pom.xml", "", "<project/>\n", true);
        assert_eq!(diff, "--- /dev/null\n+++ b/foo-core/pom.xml\n@@ -0,0 +1,1 @@\n+<project/>\n");
    }

    #[test]
    fn test_distant_changes_get_separate_hunks() {
        let old: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
        let new = old.replace("line 2\n", "line two\n").replace("line 19\n", "line nineteen\n");
        let diff = unified_diff("f", &old, &new, false);
        assert_eq!(diff.matches("@@ -").count(), 2);
        assert!(diff.contains("-line 2\n+line two\n"));
    }
}
