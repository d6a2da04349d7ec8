//! Workout templates used to seed a session with planned exercises

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use super::model::MAX_REST_DURATION;
use crate::error::{Error, Result};

/// A planned exercise inside a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub name: String,
    #[serde(default = "default_sets")]
    pub target_sets: u32,
    #[serde(default = "default_reps")]
    pub target_reps: String,
    #[serde(default = "default_rest_secs")]
    pub rest_secs: u64,
}

fn default_sets() -> u32 {
    3
}

fn default_reps() -> String {
    "8-12".to_string()
}

fn default_rest_secs() -> u64 {
    90
}

impl PlannedExercise {
    pub fn new(name: impl Into<String>, target_sets: u32, target_reps: impl Into<String>, rest_secs: u64) -> Self {
        Self {
            name: name.into(),
            target_sets,
            target_reps: target_reps.into(),
            rest_secs,
        }
    }

    pub fn rest_duration(&self) -> Duration {
        Duration::from_secs(self.rest_secs)
    }
}

/// A reusable workout plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTemplate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<PlannedExercise>,
}

impl WorkoutTemplate {
    pub fn new(name: impl Into<String>, exercises: Vec<PlannedExercise>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            exercises,
        }
    }

    /// Parse a template from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let template: Self = toml::from_str(contents)?;
        template.validate()?;
        Ok(template)
    }

    /// Load a template from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidTemplate("template name is empty".to_string()));
        }
        if let Some(position) = self.exercises.iter().position(|e| e.name.trim().is_empty()) {
            return Err(Error::InvalidTemplate(format!(
                "exercise #{} has no name",
                position + 1
            )));
        }
        let max_rest = MAX_REST_DURATION.as_secs();
        if let Some(position) = self.exercises.iter().position(|e| e.rest_secs > max_rest) {
            return Err(Error::InvalidTemplate(format!(
                "exercise #{} rests longer than {} seconds",
                position + 1,
                max_rest
            )));
        }
        Ok(())
    }
}
