// SPDX-License-Identifier: MIT

//! Server-side adjective-noun slug generator for session names.

use crate::id::IdGen;

const ADJECTIVES: &[&str] = &[
    "quiet", "amber", "brisk", "calm", "eager", "fuzzy", "gentle", "hidden", "lively", "misty",
    "nimble", "plucky", "rapid", "sturdy", "tidy", "vivid", "witty", "zesty", "bold", "crisp",
];

const NOUNS: &[&str] = &[
    "otter", "falcon", "harbor", "meadow", "canyon", "comet", "ember", "glacier", "heron",
    "lagoon", "maple", "nebula", "orchid", "prairie", "quartz", "ridge", "summit", "tundra",
    "willow", "zephyr",
];

/// Generate a `{adjective}-{noun}-{suffix}` slug. The suffix comes from the
/// id generator so uniqueness under concurrent creation is delegated to it.
pub fn generate_slug(ids: &dyn IdGen) -> String {
    let suffix = ids.next();
    let short_suffix: String = suffix.chars().rev().take(4).collect::<String>().chars().rev().collect();
    let adjective = pick(ADJECTIVES, &suffix, 0);
    let noun = pick(NOUNS, &suffix, 1);
    format!("{adjective}-{noun}-{short_suffix}")
}

fn pick<'a>(words: &'a [&'a str], seed: &str, salt: usize) -> &'a str {
    let hash = seed
        .bytes()
        .enumerate()
        .fold(salt as u64, |acc, (i, b)| acc.wrapping_add((b as u64) * (i as u64 + 1)));
    words[(hash as usize) % words.len()]
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
