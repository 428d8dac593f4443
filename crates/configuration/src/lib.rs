// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{AnalysisSettings, SegmentationWeights, Settings, TierThresholds};

/// Loads the application settings from the `radar.toml` file.
///
/// The file is optional: every section has a `Default` implementation holding
/// the canonical analysis constants, so a missing or partial file still
/// produces a fully usable `Settings`.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        // Tells the builder to look for a file named `radar.toml`, if present.
        .add_source(config::File::with_name("radar").required(false))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Settings` struct
    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;

    Ok(settings)
}
