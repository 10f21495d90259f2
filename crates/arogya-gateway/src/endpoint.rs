//! Endpoint descriptors for the remote call gateway.
//!
//! The set of valid endpoint names is fixed at compile time; URLs, methods,
//! and timeouts come from configuration and are validated once at startup.

use std::fmt;
use std::time::Duration;

use arogya_core::config::{EndpointConfig, EndpointsConfig};
use arogya_core::error::{ArogyaError, Result};

/// The closed set of remote endpoints the gateway may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointId {
    Translate,
    MapSymptoms,
    FindHospitals,
}

impl EndpointId {
    /// Stable wire name, used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointId::Translate => "translate",
            EndpointId::MapSymptoms => "map_symptoms",
            EndpointId::FindHospitals => "find_hospitals",
        }
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated endpoint descriptor. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub id: EndpointId,
    pub url: reqwest::Url,
    pub method: reqwest::Method,
    pub timeout: Duration,
}

/// The full descriptor set, built once at startup from configuration.
///
/// Construction fails fast with a `Config` error on any missing or invalid
/// entry, so configuration defects never surface mid-conversation.
#[derive(Debug, Clone)]
pub struct EndpointSet {
    translate: Endpoint,
    map_symptoms: Endpoint,
    find_hospitals: Endpoint,
}

impl EndpointSet {
    /// Validate and build the endpoint set from configuration.
    pub fn from_config(config: &EndpointsConfig) -> Result<Self> {
        Ok(Self {
            translate: build_endpoint(EndpointId::Translate, &config.translate)?,
            map_symptoms: build_endpoint(EndpointId::MapSymptoms, &config.map_symptoms)?,
            find_hospitals: build_endpoint(EndpointId::FindHospitals, &config.find_hospitals)?,
        })
    }

    /// Resolve an endpoint descriptor by ID.
    pub fn get(&self, id: EndpointId) -> &Endpoint {
        match id {
            EndpointId::Translate => &self.translate,
            EndpointId::MapSymptoms => &self.map_symptoms,
            EndpointId::FindHospitals => &self.find_hospitals,
        }
    }
}

fn build_endpoint(id: EndpointId, config: &EndpointConfig) -> Result<Endpoint> {
    if config.url.is_empty() {
        return Err(ArogyaError::Config(format!(
            "endpoint {} has no URL configured",
            id
        )));
    }
    let url = reqwest::Url::parse(&config.url)
        .map_err(|e| ArogyaError::Config(format!("endpoint {} has invalid URL: {}", id, e)))?;
    let method = config
        .method
        .parse::<reqwest::Method>()
        .map_err(|_| ArogyaError::Config(format!("endpoint {} has invalid method", id)))?;
    if config.timeout_secs == 0 {
        return Err(ArogyaError::Config(format!(
            "endpoint {} has a zero timeout",
            id
        )));
    }
    Ok(Endpoint {
        id,
        url,
        method,
        timeout: Duration::from_secs(config.timeout_secs),
    })
}
