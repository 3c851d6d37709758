mod splitter;

pub use splitter::{segment, split_sentences};
