//! Settings of the prioritization algorithm.

use serde::{Deserialize, Serialize};

use crate::err::AppError;

/// Score a model must exceed for its gene to become a propagation seed.
pub const DEFAULT_SEED_THRESHOLD: f64 = 0.6;
/// Walker scores at or below this value are treated as "no interaction".
pub const DEFAULT_WALKER_FLOOR: f64 = 1e-5;
/// Upper bound of the scale that walker-only genes are ranked onto.
pub const DEFAULT_RANK_CEILING: f64 = 0.6;

/// Tunable settings of one prioritization call.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PrioritizationSettings {
    /// Models scoring strictly above this value nominate their gene as seed.
    pub seed_threshold: f64,
    /// Walker scores `<=` this value are floored to zero.
    pub walker_floor: f64,
    /// Score given to the top-ranked gene with walker evidence.
    pub rank_ceiling: f64,
    /// Whether to run PPI propagation at all.
    pub use_ppi: bool,
}

impl Default for PrioritizationSettings {
    fn default() -> Self {
        Self {
            seed_threshold: DEFAULT_SEED_THRESHOLD,
            walker_floor: DEFAULT_WALKER_FLOOR,
            rank_ceiling: DEFAULT_RANK_CEILING,
            use_ppi: true,
        }
    }
}

impl PrioritizationSettings {
    /// Check that all thresholds are within `[0, 1]`.
    pub fn validate(&self) -> Result<(), AppError> {
        for (name, value) in [
            ("seed_threshold", self.seed_threshold),
            ("walker_floor", self.walker_floor),
            ("rank_ceiling", self.rank_ceiling),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::InvalidSettings(format!(
                    "{} must be in [0, 1] but is {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Load settings from a JSON file, missing keys take their default.
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, anyhow::Error> {
        let reader = crate::common::io::open_read_maybe_gz(path.as_ref())?;
        let settings: Self = serde_json::from_reader(reader).map_err(|e| {
            anyhow::anyhow!("error loading settings {:?}: {}", path.as_ref(), e)
        })?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::PrioritizationSettings;

    #[test]
    fn default_is_valid() {
        assert!(PrioritizationSettings::default().validate().is_ok());
    }

    #[rstest]
    #[case(-0.1, 1e-5, 0.6)]
    #[case(0.6, 1.5, 0.6)]
    #[case(0.6, 1e-5, f64::NAN)]
    fn validate_rejects(#[case] seed: f64, #[case] floor: f64, #[case] ceiling: f64) {
        let settings = PrioritizationSettings {
            seed_threshold: seed,
            walker_floor: floor,
            rank_ceiling: ceiling,
            use_ppi: true,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn load_json_partial() -> Result<(), anyhow::Error> {
        let settings = PrioritizationSettings::load_json("tests/pheno/settings.json")?;

        assert_eq!(
            settings,
            PrioritizationSettings {
                seed_threshold: 0.5,
                use_ppi: false,
                ..Default::default()
            }
        );

        Ok(())
    }
}
