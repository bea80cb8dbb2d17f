//! Random identifiers and comment text.
//!
//! Every function takes the caller's random source, so the output is fully
//! determined by the transformer's seed.

use rand::Rng;
use serde::{Deserialize, Serialize};

const KEYWORDS: &[&str] = &[
    "from", "is", "to", "get", "set", "equals", "swap", "generate", "compare", "delete", "write",
];

const ADJECTIVES: &[&str] = &[
    "aged", "biased", "complex", "destructive", "efficient", "frugal", "great", "honorable",
    "iterative", "joking", "lazy", "mighty", "naughty", "obsolete", "perfect", "quick", "rural",
    "simple", "touching", "urban", "verbose", "wonderful", "yummy", "zoomed",
];

const ANIMALS: &[&str] = &[
    "alpaca", "beaver", "cockroach", "dragon", "eagle", "fish", "gopher", "hippo", "ibex",
    "jellyfish", "kraken", "lynx", "mink", "narwhal", "okapi", "python", "quetzal", "raccoon",
    "starfish", "tapir", "unicorn", "vulture", "whale", "yak", "zebra",
];

const JOBS: &[&str] = &[
    "attorney", "builder", "curator", "dean", "engineer", "firefighter", "gourmet", "hitchhiker",
    "influencer", "judge", "landlord", "musician", "nurse", "operator", "professor",
    "quartermaster", "redactor", "sergeant", "tailor", "urologist", "veterinarian", "waiter",
    "youtuber", "zookeeper",
];

/// How generated identifiers and comment words look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    /// `lazyOkapiJudge`, `anotherWord`: readable, from fixed dictionaries.
    #[default]
    Animal,
    /// Lowercase alphabetic gibberish, 3 to 9 characters per word.
    Random,
}

impl NameStyle {
    /// An identifier; with `keyword` a method-like prefix such as `get` is added.
    pub fn identifier<R: Rng + ?Sized>(self, keyword: bool, rng: &mut R) -> String {
        match self {
            NameStyle::Animal => camel_cased_animal(keyword, rng),
            NameStyle::Random => random_string(rng),
        }
    }

    /// One to four words separated by blanks.
    pub fn comment<R: Rng + ?Sized>(self, rng: &mut R) -> String {
        let words = rng.random_range(1..=4);
        match self {
            NameStyle::Animal => animal_comment(words, rng),
            NameStyle::Random => random_comment(words, rng),
        }
    }
}

fn pick<'a, R: Rng + ?Sized>(words: &[&'a str], rng: &mut R) -> &'a str {
    words[rng.random_range(0..words.len())]
}

fn uppercase_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Lowercase alphabetic string of length 3 to 9.
pub fn random_string<R: Rng + ?Sized>(rng: &mut R) -> String {
    let len = rng.random_range(3..10);
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}

/// `words` random strings separated by blanks.
pub fn random_comment<R: Rng + ?Sized>(words: usize, rng: &mut R) -> String {
    (0..words)
        .map(|_| random_string(rng))
        .collect::<Vec<_>>()
        .join(" ")
}

/// e.g. `honorableKrakenJudge`, or `getHonorableKrakenJudge` with a keyword.
pub fn camel_cased_animal<R: Rng + ?Sized>(keyword: bool, rng: &mut R) -> String {
    let prefix = if keyword { pick(KEYWORDS, rng) } else { "" };
    let adjective = pick(ADJECTIVES, rng);
    let adjective = if keyword {
        uppercase_first(adjective)
    } else {
        adjective.to_string()
    };
    let animal = uppercase_first(pick(ANIMALS, rng));
    let job = uppercase_first(pick(JOBS, rng));
    format!("{prefix}{adjective}{animal}{job}")
}

/// e.g. `honorable_kraken_judge`.
pub fn snake_cased_animal<R: Rng + ?Sized>(keyword: bool, rng: &mut R) -> String {
    let prefix = if keyword {
        format!("{}_", pick(KEYWORDS, rng))
    } else {
        String::new()
    };
    let adjective = pick(ADJECTIVES, rng);
    let animal = pick(ANIMALS, rng);
    let job = pick(JOBS, rng);
    format!("{prefix}{adjective}_{animal}_{job}")
}

/// Dictionary words separated by blanks.
pub fn animal_comment<R: Rng + ?Sized>(words: usize, rng: &mut R) -> String {
    let pools = [ADJECTIVES, ANIMALS, JOBS];
    (0..words)
        .map(|i| pick(pools[i % pools.len()], rng))
        .collect::<Vec<_>>()
        .join(" ")
}
