//! Feature engineering shared by the transition model and the regressors.

mod encoder;

pub use encoder::{FeatureEncoder, FeatureVector, FittedEncoder, NumericScale, UNKNOWN_CODE};
