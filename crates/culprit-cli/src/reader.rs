//! Segments a source file into units.
//!
//! Segmentation is purely textual: the unit language is never parsed.

use culprit_core::Unit;
use culprit_core::config::SplitMode;

/// Split `text` into units, skipping blank and comment-only content.
///
/// Indices are assigned in order; each unit records its 1-based start line.
pub fn read_units(text: &str, mode: SplitMode, comment_prefix: &str) -> Vec<Unit> {
    let is_comment = |line: &str| {
        !comment_prefix.is_empty() && line.trim_start().starts_with(comment_prefix)
    };

    let mut chunks: Vec<(usize, String)> = Vec::new();
    match mode {
        SplitMode::Lines => {
            for (i, line) in text.lines().enumerate() {
                if line.trim().is_empty() || is_comment(line) {
                    continue;
                }
                chunks.push((i + 1, line.to_string()));
            }
        }
        SplitMode::Blocks => {
            let mut current: Option<(usize, Vec<&str>)> = None;
            for (i, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    chunks.extend(finish_block(current.take(), &is_comment));
                } else {
                    current.get_or_insert_with(|| (i + 1, Vec::new())).1.push(line);
                }
            }
            chunks.extend(finish_block(current, &is_comment));
        }
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, (line, code))| Unit::new(index, line, code))
        .collect()
}

fn finish_block(
    block: Option<(usize, Vec<&str>)>,
    is_comment: &impl Fn(&str) -> bool,
) -> Option<(usize, String)> {
    let (start, lines) = block?;
    if lines.iter().all(|line| is_comment(line)) {
        return None;
    }
    Some((start, lines.join("\n")))
}
