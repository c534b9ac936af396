//! Condensation settings.
//!
//! Settings arrive either programmatically or as a TOML document:
//!
//! ```toml
//! fail_fast = true
//! default_effort = 10.0
//! default_velocity = 3.0
//!
//! [link_name_overrides]
//! base_plate_chassis = "base"
//!
//! [joint_values.mv_shoulder]
//! angle = 0.52
//! invert_direction = true
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CondenseError, Result};

/// Live value overrides for one mate's degree of freedom, sampled from
/// the source assembly's current configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JointValueOverride {
    /// Rotation about the mate Z axis, in radians.
    pub angle: Option<f64>,
    /// Translation along the mate Z axis, in meters.
    pub offset: Option<f64>,
    /// Negate the joint's published sign convention. The resulting
    /// link pose is unchanged; the exported axis and limits flip sign.
    pub invert_direction: bool,
}

/// Condensation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CondenseSettings {
    /// Abort on an unresolved transform instead of carrying the parent
    /// frame forward with a warning.
    pub fail_fast: bool,
    /// Link name replacements, keyed by the link's derived canonical
    /// name. Applied before collision suffixing.
    pub link_name_overrides: BTreeMap<String, String>,
    /// Live joint values, keyed by mate id.
    pub joint_values: BTreeMap<String, JointValueOverride>,
    /// Effort limit filled into movable joints that carry none (N·m or N).
    pub default_effort: Option<f64>,
    /// Velocity limit filled into movable joints that carry none (rad/s or m/s).
    pub default_velocity: Option<f64>,
}

impl Default for CondenseSettings {
    fn default() -> Self {
        Self {
            fail_fast: false,
            link_name_overrides: BTreeMap::new(),
            joint_values: BTreeMap::new(),
            default_effort: None,
            default_velocity: None,
        }
    }
}

impl CondenseSettings {
    /// Validate settings.
    ///
    /// Two overrides mapping different derived names to the same final
    /// name are a configuration conflict, reported with both sources.
    pub fn validate(&self) -> Result<()> {
        if let Some(effort) = self.default_effort {
            if effort <= 0.0 {
                return Err(CondenseError::InvalidSettings(
                    "default_effort must be positive".into(),
                ));
            }
        }
        if let Some(velocity) = self.default_velocity {
            if velocity <= 0.0 {
                return Err(CondenseError::InvalidSettings(
                    "default_velocity must be positive".into(),
                ));
            }
        }
        let mut targets: BTreeMap<&String, &String> = BTreeMap::new();
        for (source, target) in &self.link_name_overrides {
            if target.is_empty() {
                return Err(CondenseError::InvalidSettings(format!(
                    "link name override for {source:?} is empty"
                )));
            }
            if let Some(first) = targets.insert(target, source) {
                return Err(CondenseError::OverrideCollision {
                    name: target.clone(),
                    first: first.clone(),
                    second: source.clone(),
                });
            }
        }
        Ok(())
    }

    /// Parse and validate settings from a TOML document.
    pub fn from_toml_str(doc: &str) -> Result<Self> {
        let settings: Self = toml::from_str(doc)?;
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let settings = CondenseSettings::default();
        assert!(!settings.fail_fast);
        assert!(settings.link_name_overrides.is_empty());
        assert!(settings.joint_values.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parses_full_toml() {
        let doc = r#"
            fail_fast = true
            default_effort = 12.5

            [link_name_overrides]
            base_plate_chassis = "base"

            [joint_values.mv_1]
            angle = 0.52
            invert_direction = true

            [joint_values.mv_2]
            offset = 0.01
        "#;
        let settings = CondenseSettings::from_toml_str(doc).unwrap();
        assert!(settings.fail_fast);
        assert_eq!(settings.default_effort, Some(12.5));
        assert_eq!(settings.default_velocity, None);
        assert_eq!(
            settings.link_name_overrides.get("base_plate_chassis"),
            Some(&"base".to_string())
        );
        let mv1 = &settings.joint_values["mv_1"];
        assert_eq!(mv1.angle, Some(0.52));
        assert!(mv1.invert_direction);
        let mv2 = &settings.joint_values["mv_2"];
        assert_eq!(mv2.offset, Some(0.01));
        assert!(!mv2.invert_direction);
    }

    #[test]
    fn empty_toml_is_default() {
        let settings = CondenseSettings::from_toml_str("").unwrap();
        assert_eq!(settings, CondenseSettings::default());
    }

    #[test]
    fn rejects_nonpositive_defaults() {
        let settings = CondenseSettings {
            default_effort: Some(0.0),
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CondenseError::InvalidSettings(_))
        ));
    }

    #[test]
    fn rejects_colliding_override_targets() {
        let mut settings = CondenseSettings::default();
        settings
            .link_name_overrides
            .insert("left_arm".to_string(), "arm".to_string());
        settings
            .link_name_overrides
            .insert("right_arm".to_string(), "arm".to_string());
        match settings.validate() {
            Err(CondenseError::OverrideCollision { name, first, second }) => {
                assert_eq!(name, "arm");
                assert_eq!(first, "left_arm");
                assert_eq!(second, "right_arm");
            }
            other => panic!("expected override collision, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            CondenseSettings::from_toml_str("fail_fast = maybe"),
            Err(CondenseError::Config(_))
        ));
    }
}
