use std::collections::HashMap;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::entities::{
    keyed_map, phid_keyed_values, CreateTaskRequest, ManiphestTask, PhidLookupResult, Project,
    ProjectQueryResponse, TaskQuery, User,
};

#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("an api token is required to run the phab command")]
    MissingToken,
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("{method} request failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} returned HTTP {status}: {body}")]
    Http {
        method: String,
        status: u16,
        body: String,
    },
    #[error("{code}: {info}")]
    Api { code: String, info: String },
    #[error("failed to decode {method} response: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The remote procedures the rest of the crate relies on.
pub trait Conduit {
    /// `phid.lookup`: resolve object names (`T123`, `#project`, `@user`) in one call.
    fn phid_lookup(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, PhidLookupResult>, ConduitError>;

    /// `project.query` by exact project name.
    fn project_query(&self, names: &[String]) -> Result<Vec<Project>, ConduitError>;

    /// `maniphest.query` with the full constraint set.
    fn maniphest_query(&self, query: &TaskQuery) -> Result<Vec<ManiphestTask>, ConduitError>;

    /// `user.query` by username.
    fn user_query(&self, usernames: &[String]) -> Result<Vec<User>, ConduitError>;

    /// `maniphest.createtask`.
    fn create_task(&self, request: &CreateTaskRequest) -> Result<ManiphestTask, ConduitError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_info: Option<String>,
}

/// Unwrap a conduit response body into its `result`, surfacing `error_code` as an error.
pub fn decode_envelope(method: &str, body: &str) -> Result<Value, ConduitError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|source| ConduitError::Decode {
        method: method.to_string(),
        source,
    })?;
    if let Some(code) = envelope.error_code.filter(|code| !code.is_empty()) {
        return Err(ConduitError::Api {
            code,
            info: envelope.error_info.unwrap_or_default(),
        });
    }
    Ok(envelope.result)
}

/// Attach the API token the way conduit expects it: inside the JSON params.
pub fn authenticated_params<P: Serialize>(
    method: &str,
    params: &P,
    token: &str,
) -> Result<Value, ConduitError> {
    let mut value = serde_json::to_value(params).map_err(|source| ConduitError::Decode {
        method: method.to_string(),
        source,
    })?;
    if value.is_null() {
        value = json!({});
    }
    if let Value::Object(map) = &mut value {
        map.insert("__conduit__".to_string(), json!({ "token": token }));
    }
    Ok(value)
}

/// Blocking HTTP conduit client holding one authenticated session for the process.
#[derive(Debug, Clone)]
pub struct ConduitClient {
    base_uri: String,
    api_token: String,
    http: Client,
}

impl ConduitClient {
    pub fn new(base_uri: &str, api_token: &str) -> Result<Self, ConduitError> {
        if api_token.trim().is_empty() {
            return Err(ConduitError::MissingToken);
        }
        let http = Client::builder().build().map_err(ConduitError::Client)?;
        Ok(Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            api_token: api_token.trim().to_string(),
            http,
        })
    }

    /// Build a client and probe `conduit.getcapabilities` so a bad URI fails up front.
    pub fn dial(base_uri: &str, api_token: &str) -> Result<Self, ConduitError> {
        let client = Self::new(base_uri, api_token)?;
        let capabilities: Value = client.call("conduit.getcapabilities", &json!({}))?;
        debug!(uri = %client.base_uri, capabilities = %capabilities, "connected to conduit");
        Ok(client)
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn call<P, R>(&self, method: &str, params: &P) -> Result<R, ConduitError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let result = self.call_raw(method, params)?;
        serde_json::from_value(result).map_err(|source| ConduitError::Decode {
            method: method.to_string(),
            source,
        })
    }

    fn call_raw<P: Serialize>(&self, method: &str, params: &P) -> Result<Value, ConduitError> {
        let params = authenticated_params(method, params, &self.api_token)?;
        let params = params.to_string();
        let url = format!("{}/api/{}", self.base_uri, method);
        debug!(method, url = %url, "conduit call");

        let resp = self
            .http
            .post(&url)
            .form(&[
                ("params", params.as_str()),
                ("output", "json"),
                ("__conduit__", "1"),
            ])
            .send()
            .map_err(|source| ConduitError::Transport {
                method: method.to_string(),
                source,
            })?;

        let status = resp.status();
        let body = resp.text().map_err(|source| ConduitError::Transport {
            method: method.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(ConduitError::Http {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        decode_envelope(method, &body)
    }

    fn decode<T>(
        method: &str,
        value: Value,
        f: fn(Value) -> Result<T, serde_json::Error>,
    ) -> Result<T, ConduitError> {
        f(value).map_err(|source| ConduitError::Decode {
            method: method.to_string(),
            source,
        })
    }
}

impl Conduit for ConduitClient {
    fn phid_lookup(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, PhidLookupResult>, ConduitError> {
        let method = "phid.lookup";
        let result = self.call_raw(method, &json!({ "names": names }))?;
        Self::decode(method, result, keyed_map)
    }

    fn project_query(&self, names: &[String]) -> Result<Vec<Project>, ConduitError> {
        let resp: ProjectQueryResponse = self.call("project.query", &json!({ "names": names }))?;
        Ok(resp.data.into_values().collect())
    }

    fn maniphest_query(&self, query: &TaskQuery) -> Result<Vec<ManiphestTask>, ConduitError> {
        let method = "maniphest.query";
        let result = self.call_raw(method, query)?;
        Self::decode(method, result, phid_keyed_values)
    }

    fn user_query(&self, usernames: &[String]) -> Result<Vec<User>, ConduitError> {
        self.call("user.query", &json!({ "usernames": usernames }))
    }

    fn create_task(&self, request: &CreateTaskRequest) -> Result<ManiphestTask, ConduitError> {
        self.call("maniphest.createtask", request)
    }
}
