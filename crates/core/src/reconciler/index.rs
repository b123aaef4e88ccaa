//! Fuzzy search index over Seedr folder names.
//!
//! Seedr rewrites characters it does not accept in folder names, so
//! `Show.Name.S01` may come back as `Show Name S01` or `Show_Name_S01`.
//! Names are normalized to lowercase alphanumeric tokens and scored with a
//! mix of token overlap (exact, substring and small edit distance) and whole
//! string edit distance.

use std::collections::HashSet;

use crate::seedr::SeedrFolder;

/// A folder and how well it matched a query (0.0-1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct FolderMatch<'a> {
    pub folder: &'a SeedrFolder,
    pub score: f32,
}

struct IndexedFolder<'a> {
    folder: &'a SeedrFolder,
    normalized: String,
    tokens: Vec<String>,
}

/// In-memory fuzzy index over a folder listing.
pub struct FolderIndex<'a> {
    entries: Vec<IndexedFolder<'a>>,
    min_score: f32,
}

impl<'a> FolderIndex<'a> {
    /// Build an index. Matches scoring below `min_score` are discarded.
    pub fn new(folders: &'a [SeedrFolder], min_score: f32) -> Self {
        let entries = folders
            .iter()
            .map(|folder| {
                let tokens = tokenize(&folder.name);
                IndexedFolder {
                    folder,
                    normalized: tokens.join(" "),
                    tokens,
                }
            })
            .collect();

        Self { entries, min_score }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best matching folder for `query`.
    pub fn search(&self, query: &str) -> Option<FolderMatch<'a>> {
        self.search_excluding(query, &HashSet::new())
    }

    /// Best matching folder for `query`, ignoring folders whose id is in
    /// `excluded`. On equal scores the folder listed first wins.
    pub fn search_excluding(
        &self,
        query: &str,
        excluded: &HashSet<i64>,
    ) -> Option<FolderMatch<'a>> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return None;
        }
        let query_normalized = query_tokens.join(" ");

        let mut best: Option<FolderMatch<'a>> = None;
        for entry in &self.entries {
            if excluded.contains(&entry.folder.id) {
                continue;
            }
            let score = score(&query_normalized, &query_tokens, entry);
            if score < self.min_score {
                continue;
            }
            if best.as_ref().is_none_or(|b| score > b.score) {
                best = Some(FolderMatch {
                    folder: entry.folder,
                    score,
                });
            }
        }
        best
    }
}

/// Split into lowercase alphanumeric tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn score(query_normalized: &str, query_tokens: &[String], entry: &IndexedFolder) -> f32 {
    if query_normalized == entry.normalized {
        return 1.0;
    }
    if entry.tokens.is_empty() {
        return 0.0;
    }
    // Episode markers, years and resolutions must appear verbatim
    if !numbered_tokens_present(query_tokens, &entry.tokens) {
        return 0.0;
    }

    // Symmetric token overlap so extra words on either side cost score
    let forward = coverage(query_tokens, &entry.tokens);
    let backward = coverage(&entry.tokens, query_tokens);
    let token_score = (forward + backward) / 2.0;

    token_score.max(string_similarity(query_normalized, &entry.normalized))
}

fn numbered_tokens_present(query_tokens: &[String], folder_tokens: &[String]) -> bool {
    query_tokens
        .iter()
        .filter(|token| token.chars().any(|c| c.is_ascii_digit()))
        .all(|token| folder_tokens.contains(token))
}

/// Fraction of `from` tokens found in `to`, with partial credit.
fn coverage(from: &[String], to: &[String]) -> f32 {
    let total: f32 = from
        .iter()
        .map(|token| {
            to.iter()
                .map(|other| token_similarity(token, other))
                .fold(0.0, f32::max)
        })
        .sum();
    total / from.len() as f32
}

fn token_similarity(a: &str, b: &str) -> f32 {
    if a == b {
        1.0
    } else if is_fuzzy_match(a, b) {
        0.8
    } else if a.len() >= 3 && b.len() >= 3 && (a.contains(b) || b.contains(a)) {
        0.5
    } else {
        0.0
    }
}

/// Small edit distance between words of similar length.
fn is_fuzzy_match(a: &str, b: &str) -> bool {
    let len_diff = (a.len() as i32 - b.len() as i32).abs();
    if len_diff > 2 {
        return false;
    }

    // Short words like episode markers must match exactly
    if a.len() < 4 || b.len() < 4 {
        return false;
    }

    let threshold = if a.len() >= 8 { 2 } else { 1 };
    levenshtein_distance(a, b) <= threshold
}

/// 1.0 - normalized edit distance.
fn string_similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f32 / max_len as f32
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
