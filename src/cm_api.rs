// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! cm_api.rs
//!
//! A ClusterGateway backed by the Cloudera Manager REST API.

use std::time::Duration;

use {
    log::debug,
    reqwest::{
        blocking::{Client, ClientBuilder, RequestBuilder, Response},
        Certificate, StatusCode, Url,
    },
    serde::{Deserialize, Serialize},
};

use crate::{
    cluster::{CLUSTER_NAME_KEY, CLUSTER_SECTION},
    config::{Config, ConfigError, Settings},
    gateway::{ClusterGateway, GatewayError, RoleConfigGroup},
    service::{RoleInstance, ServiceKind},
};

pub const CM_SECTION: &str = "CM";
pub const DEFAULT_PORT: u16 = 7180;
pub const DEFAULT_TLS_PORT: u16 = 7183;
pub const DEFAULT_API_VERSION: &str = "v10";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection parameters for the management server, read from the `[CM]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
    /// PEM file with an extra root certificate to trust.
    pub ca_cert: Option<String>,
    pub api_version: String,
    pub timeout: Duration,
    /// The cluster that non-management services are created in.
    pub cluster_name: String,
}

impl ApiSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let use_tls = config
            .optional_parsed(CM_SECTION, "cm_use_tls", "boolean")?
            .unwrap_or(false);
        let default_port = if use_tls {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        };

        Ok(ApiSettings {
            host: config.scalar(CM_SECTION, "cm_public_hostname")?,
            port: config
                .optional_parsed(CM_SECTION, "cm_port", "port number")?
                .unwrap_or(default_port),
            username: config.scalar(CM_SECTION, "cm_user")?,
            password: config.scalar(CM_SECTION, "cm_password")?,
            use_tls,
            ca_cert: config.optional_scalar(CM_SECTION, "cm_ca_cert")?,
            api_version: config
                .optional_scalar(CM_SECTION, "cm_api_version")?
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(
                config
                    .optional_parsed(CM_SECTION, "cm_timeout_secs", "number of seconds")?
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            cluster_name: config.scalar(CLUSTER_SECTION, CLUSTER_NAME_KEY)?,
        })
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}/api/{}",
            self.host, self.port, self.api_version
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ApiConfigList {
    pub items: Vec<ApiConfig>,
}

impl From<&Settings> for ApiConfigList {
    fn from(settings: &Settings) -> Self {
        ApiConfigList {
            items: settings
                .iter()
                .map(|(name, value)| ApiConfig {
                    name: name.clone(),
                    value: Some(value.clone()),
                })
                .collect(),
        }
    }
}

impl ApiConfigList {
    /// The update that makes a group's configuration exactly `declared`, given its `current`
    /// configuration. Updates only touch the keys they list, so every set key that is not
    /// declared is listed with a null value, which resets it to its default.
    pub fn replacing(declared: &Settings, current: &ApiConfigList) -> Self {
        let mut list = ApiConfigList::from(declared);
        for item in current.items.iter() {
            let is_declared = declared.iter().any(|(name, _)| *name == item.name);
            if item.value.is_some() && !is_declared {
                list.items.push(ApiConfig {
                    name: item.name.clone(),
                    value: None,
                });
            }
        }
        list
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiHostRef {
    pub host_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub role_type: String,
    pub host_ref: ApiHostRef,
}

impl From<&RoleInstance> for ApiRole {
    fn from(role: &RoleInstance) -> Self {
        ApiRole {
            name: role.name.clone(),
            role_type: role.role_type.clone(),
            host_ref: ApiHostRef {
                host_id: role.host.clone(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiService {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub config: ApiConfigList,
    pub roles: Vec<ApiRole>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiServiceList {
    pub items: Vec<ApiService>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoleConfigGroup {
    pub name: String,
    pub role_type: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiRoleConfigGroupList {
    pub items: Vec<ApiRoleConfigGroup>,
}

/// Body of a role config group update. Only the configuration is sent.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiRoleConfigGroupUpdate {
    pub config: ApiConfigList,
}

/// A blocking client for the management API.
pub struct CmClient {
    client: Client,
    settings: ApiSettings,
}

impl CmClient {
    pub fn new(settings: ApiSettings) -> Result<Self, GatewayError> {
        let mut builder = ClientBuilder::new().timeout(settings.timeout);

        if let Some(path) = &settings.ca_cert {
            let pem = std::fs::read(path).map_err(|source| GatewayError::CaCert {
                path: path.clone(),
                source,
            })?;
            builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
        }

        Ok(CmClient {
            client: builder.build()?,
            settings,
        })
    }

    /// Path segments of the resource for a service. The management service lives outside any
    /// cluster.
    fn service_segments(&self, kind: &ServiceKind, name: &str) -> Vec<String> {
        if kind.is_management() {
            vec!["cm".into(), "service".into()]
        } else {
            vec![
                "clusters".into(),
                self.settings.cluster_name.clone(),
                "services".into(),
                name.to_string(),
            ]
        }
    }

    /// Build a URL under the API base, percent-encoding each path segment.
    fn url(&self, segments: &[String]) -> Result<Url, GatewayError> {
        let base = self.settings.base_url();
        let mut url = Url::parse(&base).map_err(|e| GatewayError::Url(format!("{base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayError::Url(base.clone()))?
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request
            .basic_auth(&self.settings.username, Some(&self.settings.password))
            .send()?;
        check_status(response)
    }
}

/// Turn a non-success response into `GatewayError::Rejected`, keeping the server's message.
fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .unwrap_or_else(|e| format!("<could not read response body: {e}>"));
    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl ClusterGateway for CmClient {
    fn service_exists(&self, kind: &ServiceKind, name: &str) -> Result<bool, GatewayError> {
        let url = self.url(&self.service_segments(kind, name))?;
        debug!("GET {url}");
        match self.send(self.client.get(url)) {
            Ok(_) => Ok(true),
            Err(GatewayError::Rejected { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn create_service(
        &self,
        kind: &ServiceKind,
        name: &str,
        config: &Settings,
        roles: &[RoleInstance],
    ) -> Result<(), GatewayError> {
        let service = ApiService {
            name: name.to_string(),
            kind: kind.tag().to_string(),
            config: config.into(),
            roles: roles.iter().map(ApiRole::from).collect(),
        };

        let request = if kind.is_management() {
            let url = self.url(&self.service_segments(kind, name))?;
            debug!("PUT {url}");
            self.client.put(url).json(&service)
        } else {
            let url = self.url(&[
                "clusters".to_string(),
                self.settings.cluster_name.clone(),
                "services".to_string(),
            ])?;
            debug!("POST {url}");
            self.client.post(url).json(&ApiServiceList {
                items: vec![service],
            })
        };

        self.send(request).map(|_| ())
    }

    fn list_role_config_groups(
        &self,
        kind: &ServiceKind,
        name: &str,
    ) -> Result<Vec<RoleConfigGroup>, GatewayError> {
        let mut segments = self.service_segments(kind, name);
        segments.push("roleConfigGroups".into());
        let url = self.url(&segments)?;
        debug!("GET {url}");

        let groups: ApiRoleConfigGroupList = self.send(self.client.get(url))?.json()?;
        Ok(groups
            .items
            .into_iter()
            .map(|g| RoleConfigGroup {
                name: g.name,
                role_type: g.role_type,
            })
            .collect())
    }

    fn update_role_config_group(
        &self,
        kind: &ServiceKind,
        name: &str,
        group: &str,
        config: &Settings,
    ) -> Result<(), GatewayError> {
        let mut segments = self.service_segments(kind, name);
        segments.push("roleConfigGroups".into());
        segments.push(group.to_string());

        let mut config_segments = segments.clone();
        config_segments.push("config".into());
        let config_url = self.url(&config_segments)?;
        debug!("GET {config_url}");
        let current: ApiConfigList = self.send(self.client.get(config_url))?.json()?;

        let url = self.url(&segments)?;
        debug!("PUT {url}");

        let body = ApiRoleConfigGroupUpdate {
            config: ApiConfigList::replacing(config, &current),
        };
        let message = format!("Updating role config for {group}");
        self.send(
            self.client
                .put(url)
                .query(&[("message", message.as_str())])
                .json(&body),
        )
        .map(|_| ())
    }
}
