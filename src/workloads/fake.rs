//! Deterministic fake-data generation for the built-in workloads.
//!
//! Everything here draws from the RNG it is handed, so documents and query
//! terms are reproducible from the run seed.

use rand::Rng;
use rand::rngs::SmallRng;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Barbara", "Claude", "Dennis", "Donald", "Edsger", "Frances", "Grace",
    "Hedy", "John", "Katherine", "Ken", "Leslie", "Margaret", "Niklaus", "Radia", "Robert",
    "Shafi", "Tim", "Tony", "Vint", "Whitfield", "Yukihiro",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Liskov", "Shannon", "Ritchie", "Knuth", "Dijkstra", "Allen",
    "Hopper", "Lamarr", "Backus", "Johnson", "Thompson", "Lamport", "Hamilton", "Wirth",
    "Perlman", "Floyd", "Goldwasser", "Berners-Lee", "Hoare", "Cerf", "Diffie", "Matsumoto",
];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.test"];

const WORDS: &[&str] = &[
    "alpine", "amber", "basalt", "breeze", "cedar", "cobalt", "coral", "crater", "delta",
    "drift", "ember", "fjord", "garnet", "glacier", "harbor", "indigo", "juniper", "lagoon",
    "marble", "meadow", "nebula", "obsidian", "onyx", "prairie", "quartz", "ridge", "saffron",
    "sierra", "summit", "thicket", "timber", "tundra", "umber", "vapor", "willow", "zephyr",
];

pub fn letter(rng: &mut SmallRng) -> char {
    char::from(b'a' + rng.gen_range(0..26u8))
}

/// A random lowercase string of `len` letters.
pub fn lexify(rng: &mut SmallRng, len: usize) -> String {
    (0..len).map(|_| letter(rng)).collect()
}

pub fn word(rng: &mut SmallRng) -> &'static str {
    WORDS[rng.gen_range(0..WORDS.len())]
}

pub fn full_name(rng: &mut SmallRng) -> String {
    let first = FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())];
    let last = LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())];
    format!("{first} {last}")
}

/// An address derived from the name, so profiles look coherent.
pub fn email(rng: &mut SmallRng, name: &str) -> String {
    let user = name.to_lowercase().replace(' ', ".");
    let domain = DOMAINS[rng.gen_range(0..DOMAINS.len())];
    format!("{user}@{domain}")
}

/// A calendar date between 1970 and 2025 as `YYYY-MM-DD`.
pub fn date(rng: &mut SmallRng) -> String {
    let year = rng.gen_range(1970..2025);
    let month = rng.gen_range(1..=12u32);
    let day = rng.gen_range(1..=28u32);
    format!("{year:04}-{month:02}-{day:02}")
}

/// A short status paragraph of `1..=max_words` words.
pub fn status_text(rng: &mut SmallRng, max_words: usize) -> String {
    let count = rng.gen_range(1..=max_words.max(1));
    (0..count).map(|_| word(rng)).collect::<Vec<_>>().join(" ")
}
