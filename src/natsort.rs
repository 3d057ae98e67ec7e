//! Natural ordering for file and folder names.
//!
//! Downloaded chapters are usually numbered without padding (`img2`,
//! `img10`), so a plain lexicographic sort would put page 10 before page 2.
//! Digit runs are compared by value, everything else case-insensitively.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Compares two strings in natural order.
///
/// The order is total: strings that compare equal after numeric and
/// case folding fall back to a byte-wise comparison.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_chunks(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Compares two paths in natural order using their lossy string form.
pub fn natural_cmp_path(a: &Path, b: &Path) -> Ordering {
    natural_cmp(&a.to_string_lossy(), &b.to_string_lossy())
}

/// Sorts paths in place in natural order.
pub fn sort_paths(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_cmp_path(a, b));
}

/// Sorts names in place in natural order.
pub fn sort_names(names: &mut [String]) {
    names.sort_by(|a, b| natural_cmp(a, b));
}

#[derive(Clone, Copy, Debug)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != is_digit)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());

        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;

        Some(if is_digit {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

fn compare_chunks(a: Chunk<'_>, b: Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Digits(x), Chunk::Digits(y)) => compare_digit_runs(x, y),
        (Chunk::Text(x), Chunk::Text(y)) => compare_text(x, y),
        // Numbers sort before text, as in most file managers.
        (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
    }
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');

    // Compare by magnitude without parsing, so arbitrarily long runs work.
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let a_lower = a.chars().flat_map(char::to_lowercase);
    let b_lower = b.chars().flat_map(char::to_lowercase);
    a_lower.cmp(b_lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(input: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = input.iter().map(|s| s.to_string()).collect();
        sort_names(&mut names);
        names
    }

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(
            sorted(&["img10.png", "img2.png", "img1.png"]),
            vec!["img1.png", "img2.png", "img10.png"]
        );
    }

    #[test]
    fn leading_zeros_do_not_change_magnitude() {
        assert_eq!(natural_cmp("page007", "page7"), Ordering::Greater);
        assert_eq!(natural_cmp("page007", "page8"), Ordering::Less);
    }

    #[test]
    fn text_is_case_insensitive() {
        assert_eq!(
            sorted(&["Chapter 2", "chapter 1", "CHAPTER 10"]),
            vec!["chapter 1", "Chapter 2", "CHAPTER 10"]
        );
    }

    #[test]
    fn order_is_total_for_case_variants() {
        assert_ne!(natural_cmp("a.png", "A.png"), Ordering::Equal);
        assert_eq!(natural_cmp("a.png", "a.png"), Ordering::Equal);
    }

    #[test]
    fn huge_digit_runs_do_not_overflow() {
        let a = "x123456789012345678901234567890";
        let b = "x123456789012345678901234567891";
        assert_eq!(natural_cmp(a, b), Ordering::Less);
    }

    #[test]
    fn nested_paths_sort_by_folder_then_file() {
        let mut paths = vec![
            PathBuf::from("ch10/1.jpg"),
            PathBuf::from("ch2/10.jpg"),
            PathBuf::from("ch2/9.jpg"),
        ];
        sort_paths(&mut paths);
        assert_eq!(
            paths,
            vec![
                PathBuf::from("ch2/9.jpg"),
                PathBuf::from("ch2/10.jpg"),
                PathBuf::from("ch10/1.jpg"),
            ]
        );
    }
}
