pub mod segmentation;

pub use segmentation::{segment, split_sentences};
