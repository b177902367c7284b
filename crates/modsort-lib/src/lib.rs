pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod normalize;

pub mod manifest;
pub use manifest::PackageIdentity;

pub mod classification;
pub use classification::Classification;

pub mod cache;
pub use cache::EnvironmentCache;
pub use cache::LocalCache;
pub use cache::RunBatch;

pub mod registry;
pub mod wiki;

pub mod classifier;
pub use classifier::Classifier;
pub use classifier::Resolution;

pub mod sync;
pub mod run;
