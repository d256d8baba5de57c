//! Full-text retrieval: tokenizer, stemmer, and the inverted index.

mod inverted;
pub mod stemmer;
pub mod tokenizer;

pub use inverted::{
    DocumentFields, IndexStats, InvertedIndex, SearchHit, CONTENT_WEIGHT, TAG_WEIGHT, TITLE_WEIGHT,
};
