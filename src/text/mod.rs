//! Free-text routing: department classification and urgency detection.

mod bayes;
mod classifier;
mod priority;
mod tokenize;

pub use bayes::{NaiveBayes, Vocabulary};
pub use classifier::{Classification, LabeledText, TextClassifier, TextReport};
pub use priority::PriorityDetector;
pub use tokenize::{terms, words};
