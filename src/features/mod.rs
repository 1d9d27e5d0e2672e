// Feature extraction: raw comment text to fixed-dimension sparse vectors.
//
// The vectorizer is fitted once per training run and then only ever read.

pub mod tfidf;
pub mod tokenize;
pub mod vector;
