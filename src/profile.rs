// Random author profiles for anonymous submissions.

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::ledger::Author;

pub const DISPLAY_NAMES: [&str; 9] = [
    "Tech Enthusiast",
    "Code Ninja",
    "Digital Explorer",
    "Cyber Wizard",
    "Data Detective",
    "Innovation Guru",
    "Tech Maverick",
    "Pixel Pioneer",
    "Coding Champion",
];

/// A random display name and a muted `rgb(r,g,b)` colour. No avatar.
pub fn random_author() -> Author {
    author_with_rng(&mut rand::rng())
}

pub fn author_with_rng<R: Rng>(rng: &mut R) -> Author {
    let name = DISPLAY_NAMES.choose(rng).copied().unwrap_or(DISPLAY_NAMES[0]);
    Author {
        display_name: name.to_string(),
        color: random_color(rng),
        avatar: String::new(),
    }
}

/// `rgb(r,g,b)` with each channel in 100..=200.
pub fn random_color<R: Rng>(rng: &mut R) -> String {
    let r = rng.random_range(100..=200);
    let g = rng.random_range(100..=200);
    let b = rng.random_range(100..=200);
    format!("rgb({r},{g},{b})")
}
