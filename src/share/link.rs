//! Secret URL path generation.

use rand::seq::SliceRandom;
use std::path::Path;

pub const FIRST_WORDS_FILE: &str = "first_words.txt";
pub const SECOND_WORDS_FILE: &str = "second_words.txt";

/// Produces the path segment guarding the share.
///
/// A `first-second` word pair when both word lists in `words_dir` are
/// present and non-empty, otherwise a `YYYYMMDD-HHMMSS` timestamp.
pub fn generate_link_name(words_dir: Option<&Path>) -> String {
    match words_dir.and_then(word_pair) {
        Some(name) => name,
        None => {
            tracing::debug!("Word lists unavailable, using timestamp link name");
            timestamp_link_name()
        }
    }
}

fn word_pair(dir: &Path) -> Option<String> {
    let first = random_line(&dir.join(FIRST_WORDS_FILE))?;
    let second = random_line(&dir.join(SECOND_WORDS_FILE))?;
    Some(format!("{}-{}", first, second))
}

/// Uniform pick over the non-blank lines of `path`.
fn random_line(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .choose(&mut rand::thread_rng())
        .map(|line| line.to_string())
}

fn timestamp_link_name() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}
