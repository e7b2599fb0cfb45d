use colored::Colorize;

/// One line of the rendered diff. Unchanged lines are not shown; the
/// confirmation prompt only needs to surface what the regeneration changed.
#[derive(Debug, PartialEq, Eq)]
pub enum DiffLine {
    Removed(String),
    Added(String),
}

/// Line-oriented diff of `previous` against `new`, via a longest-common-
/// subsequence walk. Removals come before additions at each divergence.
pub fn diff_lines(previous: &str, new: &str) -> Vec<DiffLine> {
    let old: Vec<&str> = previous.lines().collect();
    let cur: Vec<&str> = new.lines().collect();

    // lcs[i][j] = LCS length of old[i..] and cur[j..]
    let mut lcs = vec![vec![0usize; cur.len() + 1]; old.len() + 1];
    for i in (0..old.len()).rev() {
        for j in (0..cur.len()).rev() {
            lcs[i][j] = if old[i] == cur[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut lines = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < cur.len() {
        if old[i] == cur[j] {
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            lines.push(DiffLine::Removed(old[i].to_string()));
            i += 1;
        } else {
            lines.push(DiffLine::Added(cur[j].to_string()));
            j += 1;
        }
    }
    for line in &old[i..] {
        lines.push(DiffLine::Removed(line.to_string()));
    }
    for line in &cur[j..] {
        lines.push(DiffLine::Added(line.to_string()));
    }

    lines
}

pub fn render(previous: &str, new: &str) -> String {
    diff_lines(previous, new)
        .iter()
        .map(|line| match line {
            DiffLine::Removed(text) => format!("- {}", text).red().to_string(),
            DiffLine::Added(text) => format!("+ {}", text).green().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
