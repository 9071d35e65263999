//! String similarity scores on a 0–100 scale.
//!
//! `ratio` is `2·M / (len₁ + len₂)` where `M` is the longest common
//! subsequence length. `partial_ratio` aligns the shorter string against
//! every same-length window of the longer one. `token_set_ratio` compares
//! the shared token set against each side's remainder, so word order and
//! extra words do not lower the score.

use std::collections::BTreeSet;

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let score = 200.0 * lcs_len(a, b) as f64 / total as f64;
    score.round() as u8
}

/// Overall similarity of two strings.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best similarity of the shorter string against any window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return 0;
    }

    let mut best = 0;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(&short, window));
        if best == 100 {
            break;
        }
    }
    best
}

/// Lowercase, replace non-alphanumerics with spaces, and split into tokens.
fn tokens(s: &str) -> BTreeSet<String> {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn join_tokens<'a>(parts: impl Iterator<Item = &'a String>) -> String {
    parts.map(String::as_str).collect::<Vec<_>>().join(" ")
}

/// Similarity of two token sets, insensitive to order and duplicates.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let ta = tokens(a);
    let tb = tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0;
    }

    let sect = join_tokens(ta.intersection(&tb));
    let diff_ab = join_tokens(ta.difference(&tb));
    let diff_ba = join_tokens(tb.difference(&ta));

    let combine = |diff: &str| {
        if sect.is_empty() {
            diff.to_string()
        } else if diff.is_empty() {
            sect.clone()
        } else {
            format!("{} {}", sect, diff)
        }
    };
    let combined_ab = combine(&diff_ab);
    let combined_ba = combine(&diff_ba);

    ratio(&sect, &combined_ab)
        .max(ratio(&sect, &combined_ba))
        .max(ratio(&combined_ab, &combined_ba))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_bounds() {
        assert_eq!(ratio("renegade", "renegade"), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(ratio("", "abc"), 0);
    }

    #[test]
    fn test_ratio_value() {
        // LCS("abcd", "abed") = 3 → 2·3/8
        assert_eq!(ratio("abcd", "abed"), 75);
    }

    #[test]
    fn test_partial_ratio_substring_is_perfect() {
        assert_eq!(
            partial_ratio("renegade es 300i", "problems with my renegade es 300i today"),
            100
        );
        assert_eq!(partial_ratio("warrior edge", "warrior edges"), 100);
    }

    #[test]
    fn test_partial_ratio_typo() {
        let score = partial_ratio("renegade", "is the renegad good");
        assert!(score > 70, "score {}", score);
    }

    #[test]
    fn test_token_set_ignores_order_and_extras() {
        assert_eq!(token_set_ratio("warrior edge", "edge of the warrior"), 100);
    }

    #[test]
    fn test_unrelated_scores_low() {
        let query = "how do i change the gas bottle";
        assert!(partial_ratio("aristo 500ix", query) <= 70);
        assert!(token_set_ratio("aristo 500ix", query) <= 70);
    }

    #[test]
    fn test_unicode_is_char_based() {
        assert_eq!(ratio("größe", "größe"), 100);
    }
}
