//! Lexical retrieval over the corpus snapshot.

mod engine;

pub use engine::{Candidate, SearchEngine};
