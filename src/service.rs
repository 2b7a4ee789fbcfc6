//! Collaborators the player talks to but does not implement: chorale
//! generation and chorale export.
//!
//! Both are traits so the session can be driven by anything from a remote
//! model server to a recorded response on disk. Request and response types
//! mirror the JSON the generation server speaks.

use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::chorale::{Chorale, SeedMatrix};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with an error of its own
    #[error("{0}")]
    Rejected(String),
    #[error("malformed service response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where the seed for a generation request comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedType {
    #[default]
    Manual,
    Csv,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub seed_type: SeedType,
    /// Total chords wanted, seed included
    pub length: usize,
    /// Sampling seed for the model, for reproducible output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Seed chords for `manual` and `csv` requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_chords: Option<SeedMatrix>,
    /// RNG seed for the service-drawn seed of `random` requests, sent as
    /// `null` when unset
    #[serde(default)]
    pub seed_random: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_probability: Option<f64>,
}

impl GenerationRequest {
    pub fn with_seed(seed_type: SeedType, seed: SeedMatrix, length: usize) -> Self {
        Self {
            seed_type,
            length,
            random_seed: None,
            seed_chords: Some(seed),
            seed_random: None,
            rest_probability: None,
        }
    }

    pub fn random(length: usize, seed_random: Option<u64>, rest_probability: f64) -> Self {
        Self {
            seed_type: SeedType::Random,
            length,
            random_seed: None,
            seed_chords: None,
            seed_random,
            rest_probability: Some(rest_probability),
        }
    }

    pub fn random_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub chorale: Chorale,
    /// Index of the first generated chord; everything before it is seed
    #[serde(default, deserialize_with = "null_as_zero")]
    pub generated_start: usize,
    /// The seed as the service normalized it
    #[serde(default)]
    pub seed_chords: Option<SeedMatrix>,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or(0))
}

/// Produces chorales from seeds
pub trait GenerationService {
    fn generate(&mut self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError>;

    /// Whether the model behind the service is ready to generate
    fn model_loaded(&mut self) -> Result<bool, ServiceError> {
        Err(ServiceError::Unavailable("model status not reported".into()))
    }
}

/// Turns a chorale into a downloadable payload
pub trait ExportService {
    fn export(&mut self, chorale: &Chorale) -> Result<Vec<u8>, ServiceError>;
}

/// The `{"error": "..."}` body a generation server sends on failure
#[derive(Debug, Deserialize)]
struct Failure {
    error: String,
}

/// Parse a generation server reply body
///
/// A body that is neither a result nor an error reply keeps the decode
/// error of the result form, which is the more useful of the two.
pub fn parse_reply(body: &str) -> Result<GenerationResponse, ServiceError> {
    match serde_json::from_str::<GenerationResponse>(body) {
        Ok(response) => Ok(response),
        Err(err) => match serde_json::from_str::<Failure>(body) {
            Ok(Failure { error }) => Err(ServiceError::Rejected(error)),
            Err(_) => Err(err.into()),
        },
    }
}

/// Answers every request with a recorded server reply
#[derive(Debug, Clone)]
pub struct ReplayGenerationService {
    body: String,
}

impl ReplayGenerationService {
    pub fn from_json(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        Ok(Self::from_json(fs::read_to_string(path)?))
    }
}

impl GenerationService for ReplayGenerationService {
    fn generate(&mut self, request: &GenerationRequest) -> Result<GenerationResponse, ServiceError> {
        info!(
            "replaying recorded chorale for {:?} request of {} chords",
            request.seed_type, request.length
        );
        parse_reply(&self.body)
    }

    fn model_loaded(&mut self) -> Result<bool, ServiceError> {
        match parse_reply(&self.body) {
            Ok(_) => Ok(true),
            Err(ServiceError::Rejected(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Stand-in when no generation backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableService;

impl GenerationService for UnavailableService {
    fn generate(&mut self, _: &GenerationRequest) -> Result<GenerationResponse, ServiceError> {
        Err(ServiceError::Unavailable("no generation service configured".into()))
    }
}

/// Exports the chorale as its JSON wire form
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExport;

impl ExportService for JsonExport {
    fn export(&mut self, chorale: &Chorale) -> Result<Vec<u8>, ServiceError> {
        Ok(serde_json::to_vec(chorale)?)
    }
}
