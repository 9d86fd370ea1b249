// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

//! service.rs
//!
//! The kinds of service that can be deployed, and how each one maps configuration sections onto
//! service config and role layouts. Every built-in kind is described by a static `Layout` table;
//! there is no per-kind code. Any other service is described by its own config section.

use std::fmt;

use log::debug;

use crate::config::{Config, ConfigError, Settings};

/// The role type shared by many service kinds. Its configuration is namespaced by service kind.
pub const GATEWAY_ROLE_TYPE: &str = "GATEWAY";

/// Desired state of one service, derived from the config file. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    pub name: String,
    pub kind: ServiceKind,
    pub service_config: Settings,
    pub roles: Vec<RoleSpec>,
    /// Role types that were requested but are not valid for this kind of service. These are
    /// never deployed, and are reported when the service is reconciled.
    pub invalid_role_types: Vec<String>,
}

impl ServiceSpec {
    /// Every remote role instance this service should have, in declaration order.
    pub fn role_instances(&self) -> Vec<RoleInstance> {
        self.roles.iter().flat_map(RoleSpec::expand).collect()
    }
}

/// A logical role group: one role type bound to one or more hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSpec {
    pub role_type: String,
    pub name: Option<String>,
    pub hosts: Vec<String>,
}

impl RoleSpec {
    /// Expand into one remote role instance per host.
    ///
    /// When an explicit name is given, every instance carries that same name. The remote side
    /// decides whether that is acceptable.
    pub fn expand(&self) -> impl Iterator<Item = RoleInstance> + '_ {
        self.hosts.iter().map(|host| RoleInstance {
            role_type: self.role_type.clone(),
            name: self.name.clone(),
            host: host.clone(),
        })
    }
}

/// A single role placed on a single host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInstance {
    pub role_type: String,
    pub name: Option<String>,
    pub host: String,
}

impl fmt::Display for RoleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}({})@{}", self.role_type, name, self.host),
            None => write!(f, "{}@{}", self.role_type, self.host),
        }
    }
}

/// One role group of a service whose hosts come from a single config key.
#[derive(Debug)]
pub struct RoleGroup {
    pub role_type: &'static str,
    pub hosts_key: &'static str,
    /// Key holding an optional explicit role name.
    pub name_key: Option<&'static str>,
    /// Required groups fail with `MissingKey` when their hosts key is absent; optional groups
    /// are skipped.
    pub required: bool,
}

#[derive(Debug)]
pub enum RoleSource {
    /// Fixed role groups, each expanded against its own host list.
    Groups(&'static [RoleGroup]),

    /// Role types are themselves listed in the config and placed together on one host. Each
    /// listed type must be one of `allowed`.
    Listed {
        types_key: &'static str,
        host_section: &'static str,
        host_key: &'static str,
        allowed: &'static [&'static str],
    },
}

/// The mapping from configuration sections and keys to the desired state of one kind of service.
#[derive(Debug)]
pub struct Layout {
    /// Remote service type, and namespace prefix for shared role types.
    pub tag: &'static str,
    /// Section holding the service name and role host assignments.
    pub section: &'static str,
    pub service_config_section: &'static str,
    pub name_key: &'static str,
    pub roles: RoleSource,
    /// Role types whose configuration lives in a section other than the role type itself.
    pub role_sections: &'static [(&'static str, &'static str)],
}

const fn required(role_type: &'static str, hosts_key: &'static str) -> RoleGroup {
    RoleGroup {
        role_type,
        hosts_key,
        name_key: None,
        required: true,
    }
}

const fn optional(role_type: &'static str, hosts_key: &'static str) -> RoleGroup {
    RoleGroup {
        role_type,
        hosts_key,
        name_key: None,
        required: false,
    }
}

static MGMT: Layout = Layout {
    tag: "MGMT",
    section: "MGMT_SERVICE",
    service_config_section: "MGMT_SERVICE_CONFIG",
    name_key: "mgmt_service_name",
    roles: RoleSource::Listed {
        types_key: "cm_management_roletypes",
        host_section: "CM",
        host_key: "cm_private_hostname",
        allowed: &[
            "HOSTMONITOR",
            "SERVICEMONITOR",
            "ACTIVITYMONITOR",
            "REPORTSMANAGER",
            "EVENTSERVER",
            "ALERTPUBLISHER",
            "NAVIGATOR",
        ],
    },
    role_sections: &[],
};

const ZOOKEEPER_ROLES: &[RoleGroup] = &[required("SERVER", "zk_hosts")];

static ZOOKEEPER: Layout = Layout {
    tag: "ZOOKEEPER",
    section: "ZOOKEEPER",
    service_config_section: "ZOOKEEPER_SERVICE_CONFIG",
    name_key: "zk_name",
    roles: RoleSource::Groups(ZOOKEEPER_ROLES),
    role_sections: &[("SERVER", "ZOOKEEPER_ROLE_CONFIG")],
};

const HDFS_ROLES: &[RoleGroup] = &[
    RoleGroup {
        role_type: "NAMENODE",
        hosts_key: "hdfs_namenode_host",
        name_key: Some("hdfs_namenode_name"),
        required: true,
    },
    optional("SECONDARYNAMENODE", "hdfs_secondary_namenode_host"),
    required("DATANODE", "hdfs_datanode_hosts"),
    optional(GATEWAY_ROLE_TYPE, "hdfs_gateway_hosts"),
];

static HDFS: Layout = Layout {
    tag: "HDFS",
    section: "HDFS",
    service_config_section: "HDFS_SERVICE_CONFIG",
    name_key: "hdfs_name",
    roles: RoleSource::Groups(HDFS_ROLES),
    role_sections: &[],
};

const YARN_ROLES: &[RoleGroup] = &[
    required("RESOURCEMANAGER", "yarn_resourcemanager_host"),
    required("JOBHISTORY", "yarn_jobhistory_server_host"),
    required("NODEMANAGER", "yarn_nodemanager_hosts"),
    optional(GATEWAY_ROLE_TYPE, "yarn_gateway_hosts"),
];

static YARN: Layout = Layout {
    tag: "YARN",
    section: "YARN",
    service_config_section: "YARN_SERVICE_CONFIG",
    name_key: "yarn_name",
    roles: RoleSource::Groups(YARN_ROLES),
    role_sections: &[],
};

const HIVE_ROLES: &[RoleGroup] = &[
    required("HIVEMETASTORE", "hive_metastore_host"),
    required("HIVESERVER2", "hive_hs2_hosts"),
    optional(GATEWAY_ROLE_TYPE, "hive_gateway_hosts"),
];

static HIVE: Layout = Layout {
    tag: "HIVE",
    section: "HIVE",
    service_config_section: "HIVE_SERVICE_CONFIG",
    name_key: "hive_name",
    roles: RoleSource::Groups(HIVE_ROLES),
    role_sections: &[],
};

const IMPALA_ROLES: &[RoleGroup] = &[
    required("STATESTORE", "impala_statestore_host"),
    required("CATALOGSERVER", "impala_catalogserver_host"),
    required("IMPALAD", "impala_impalad_hosts"),
];

static IMPALA: Layout = Layout {
    tag: "IMPALA",
    section: "IMPALA",
    service_config_section: "IMPALA_SERVICE_CONFIG",
    name_key: "impala_name",
    roles: RoleSource::Groups(IMPALA_ROLES),
    role_sections: &[],
};

const OOZIE_ROLES: &[RoleGroup] = &[required("OOZIE_SERVER", "oozie_server_host")];

static OOZIE: Layout = Layout {
    tag: "OOZIE",
    section: "OOZIE",
    service_config_section: "OOZIE_SERVICE_CONFIG",
    name_key: "oozie_name",
    roles: RoleSource::Groups(OOZIE_ROLES),
    role_sections: &[],
};

const SPARK_ON_YARN_ROLES: &[RoleGroup] = &[
    required("SPARK_YARN_HISTORY_SERVER", "spark_yarn_historyserver_host"),
    optional(GATEWAY_ROLE_TYPE, "spark_gateway_hosts"),
];

static SPARK_ON_YARN: Layout = Layout {
    tag: "SPARK_ON_YARN",
    section: "SPARK_ON_YARN",
    service_config_section: "SPARK_SERVICE_CONFIG",
    name_key: "spark_name",
    roles: RoleSource::Groups(SPARK_ON_YARN_ROLES),
    role_sections: &[],
};

const KAFKA_ROLES: &[RoleGroup] = &[
    required("KAFKA_BROKER", "kafka_broker_hosts"),
    optional("KAFKA_MIRROR_MAKER", "kafka_mirrormaker_host"),
];

static KAFKA: Layout = Layout {
    tag: "KAFKA",
    section: "KAFKA",
    service_config_section: "KAFKA_SERVICE_CONFIG",
    name_key: "kafka_name",
    roles: RoleSource::Groups(KAFKA_ROLES),
    role_sections: &[],
};

const HUE_ROLES: &[RoleGroup] = &[required("HUE_SERVER", "hue_server_host")];

static HUE: Layout = Layout {
    tag: "HUE",
    section: "HUE",
    service_config_section: "HUE_SERVICE_CONFIG",
    name_key: "hue_name",
    roles: RoleSource::Groups(HUE_ROLES),
    role_sections: &[],
};

const SQOOP2_ROLES: &[RoleGroup] = &[required("SQOOP_SERVER", "sqoop2_server_host")];

static SQOOP2: Layout = Layout {
    tag: "SQOOP",
    section: "SQOOP2",
    service_config_section: "SQOOP2_SERVICE_CONFIG",
    name_key: "sqoop2_name",
    roles: RoleSource::Groups(SQOOP2_ROLES),
    role_sections: &[],
};

const FLUME_ROLES: &[RoleGroup] = &[required("AGENT", "flume_agent_hosts")];

static FLUME: Layout = Layout {
    tag: "FLUME",
    section: "FLUME",
    service_config_section: "FLUME_SERVICE_CONFIG",
    name_key: "flume_name",
    roles: RoleSource::Groups(FLUME_ROLES),
    role_sections: &[],
};

/// Key of a generic service section naming the remote service type. Defaults to the section name.
pub const GENERIC_TYPE_KEY: &str = "type";
/// Key of a generic service section naming the service.
pub const GENERIC_NAME_KEY: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Mgmt,
    Zookeeper,
    Hdfs,
    Yarn,
    Hive,
    Impala,
    Oozie,
    SparkOnYarn,
    Kafka,
    Hue,
    Sqoop2,
    Flume,
    /// A service described entirely by its own config section: an optional `type`, the service
    /// name, and one `<role>_hosts` key per role group. Also used to declare a second service of
    /// a built-in type.
    Generic { tag: String, section: String },
}

impl ServiceKind {
    /// Every kind with a built-in layout.
    pub const BUILTIN: [ServiceKind; 12] = [
        ServiceKind::Mgmt,
        ServiceKind::Zookeeper,
        ServiceKind::Hdfs,
        ServiceKind::Yarn,
        ServiceKind::Hive,
        ServiceKind::Impala,
        ServiceKind::Oozie,
        ServiceKind::SparkOnYarn,
        ServiceKind::Kafka,
        ServiceKind::Hue,
        ServiceKind::Sqoop2,
        ServiceKind::Flume,
    ];

    /// The built-in layout of this kind. Generic services have none.
    pub fn layout(&self) -> Option<&'static Layout> {
        let layout = match self {
            ServiceKind::Mgmt => &MGMT,
            ServiceKind::Zookeeper => &ZOOKEEPER,
            ServiceKind::Hdfs => &HDFS,
            ServiceKind::Yarn => &YARN,
            ServiceKind::Hive => &HIVE,
            ServiceKind::Impala => &IMPALA,
            ServiceKind::Oozie => &OOZIE,
            ServiceKind::SparkOnYarn => &SPARK_ON_YARN,
            ServiceKind::Kafka => &KAFKA,
            ServiceKind::Hue => &HUE,
            ServiceKind::Sqoop2 => &SQOOP2,
            ServiceKind::Flume => &FLUME,
            ServiceKind::Generic { .. } => return None,
        };
        Some(layout)
    }

    /// The remote service type, e.g. "HDFS".
    pub fn tag(&self) -> &str {
        if let ServiceKind::Generic { tag, .. } = self {
            return tag;
        }
        self.layout().map_or("", |layout| layout.tag)
    }

    /// Section holding the service name and role host assignments.
    pub fn section(&self) -> &str {
        if let ServiceKind::Generic { section, .. } = self {
            return section;
        }
        self.layout().map_or("", |layout| layout.section)
    }

    pub fn service_config_section(&self) -> String {
        match self.layout() {
            Some(layout) => layout.service_config_section.to_string(),
            None => format!("{}_SERVICE_CONFIG", self.section()),
        }
    }

    /// Role types whose configuration lives in a section other than the role type itself.
    /// Generic services borrow the aliases of the built-in kind with the same type.
    fn role_sections(&self) -> &'static [(&'static str, &'static str)] {
        let layout = match self.layout() {
            Some(layout) => Some(layout),
            None => Self::BUILTIN
                .iter()
                .filter_map(ServiceKind::layout)
                .find(|layout| layout.tag == self.tag()),
        };
        layout.map(|layout| layout.role_sections).unwrap_or(&[])
    }

    /// Look up a built-in kind by the name used in the cluster `services` list. Both the config
    /// section name ("SQOOP2") and the remote service type ("SQOOP") are accepted,
    /// case-insensitively.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        let upper = name.trim().to_ascii_uppercase();
        Self::BUILTIN
            .into_iter()
            .find(|kind| kind.section() == upper || kind.tag() == upper)
            .ok_or_else(|| ConfigError::UnknownServiceKind(name.to_string()))
    }

    /// Resolve an entry of the cluster `services` list. Built-in kinds take precedence; any other
    /// entry must name a section of `config`, which then describes a generic service.
    pub fn from_entry(config: &Config, entry: &str) -> Result<Self, ConfigError> {
        let entry = entry.trim();
        match Self::from_name(entry) {
            Ok(kind) => Ok(kind),
            Err(_) if config.has_section(entry) => {
                let tag = config
                    .optional_scalar(entry, GENERIC_TYPE_KEY)?
                    .map(|tag| tag.trim().to_ascii_uppercase())
                    .filter(|tag| !tag.is_empty())
                    .unwrap_or_else(|| entry.to_ascii_uppercase());
                Ok(ServiceKind::Generic {
                    tag,
                    section: entry.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Whether this kind is the management service, which lives outside any cluster.
    pub fn is_management(&self) -> bool {
        self.tag() == MGMT.tag
    }

    /// Generic services are named by `name`, or by `<section>_name` in lower case.
    pub fn service_name(&self, config: &Config) -> Result<String, ConfigError> {
        match self.layout() {
            Some(layout) => config.scalar(layout.section, layout.name_key),
            None => {
                let section = self.section();
                let prefixed = format!("{}_name", section.to_ascii_lowercase());
                match config.optional_scalar(section, GENERIC_NAME_KEY)? {
                    Some(name) => Ok(name),
                    None => config.scalar(section, &prefixed),
                }
            }
        }
    }

    pub fn desired_service_config(&self, config: &Config) -> Settings {
        config.section_values(&self.service_config_section())
    }

    /// Build the role layout for this kind from `config`.
    pub fn desired_roles(&self, config: &Config) -> Result<DesiredRoles, ConfigError> {
        let mut desired = DesiredRoles::default();

        match self.layout().map(|layout| (layout.section, &layout.roles)) {
            None => desired.roles = generic_roles(config, self.section(), self.tag())?,
            Some((section, RoleSource::Groups(groups))) => {
                for group in groups.iter() {
                    let hosts = if group.required {
                        Some(config.list(section, group.hosts_key)?)
                    } else {
                        config.optional_list(section, group.hosts_key)?
                    };
                    let Some(hosts) = hosts else {
                        debug!("No hosts configured for optional {} role", group.role_type);
                        continue;
                    };
                    let name = match group.name_key {
                        Some(key) => config
                            .optional_scalar(section, key)?
                            .filter(|n| !n.is_empty()),
                        None => None,
                    };
                    desired.roles.push(RoleSpec {
                        role_type: group.role_type.to_string(),
                        name,
                        hosts: non_empty_hosts(hosts, section, group.hosts_key)?,
                    });
                }
            }
            Some((
                section,
                RoleSource::Listed {
                    types_key,
                    host_section,
                    host_key,
                    allowed,
                },
            )) => {
                let host = config.scalar(host_section, host_key)?;
                let hosts = non_empty_hosts(vec![host], host_section, host_key)?;
                for role_type in config.list(section, types_key)? {
                    if !allowed.iter().any(|allowed| *allowed == role_type) {
                        desired.invalid_role_types.push(role_type);
                        continue;
                    }
                    desired.roles.push(RoleSpec {
                        name: Some(format!("{role_type}-1")),
                        role_type,
                        hosts: hosts.clone(),
                    });
                }
            }
        }

        for role in desired.roles.iter() {
            debug!("{} role {} on hosts {:?}", self, role.role_type, role.hosts);
        }

        Ok(desired)
    }

    pub fn to_spec(&self, config: &Config) -> Result<ServiceSpec, ConfigError> {
        let DesiredRoles {
            roles,
            invalid_role_types,
        } = self.desired_roles(config)?;

        Ok(ServiceSpec {
            name: self.service_name(config)?,
            kind: self.clone(),
            service_config: self.desired_service_config(config),
            roles,
            invalid_role_types,
        })
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct DesiredRoles {
    pub roles: Vec<RoleSpec>,
    pub invalid_role_types: Vec<String>,
}

/// Role groups of a generic service: one per `<role>_hosts` (or `<role>_host`) key, in file
/// order. A `<section>_` or `<type>_` prefix on the key is not part of the role type, so
/// `hbase_master_hosts` in `[HBASE]` declares MASTER roles. `<role>_name` optionally names the
/// roles.
fn generic_roles(
    config: &Config,
    section: &str,
    tag: &str,
) -> Result<Vec<RoleSpec>, ConfigError> {
    let prefixes = [
        format!("{}_", section.to_ascii_lowercase()),
        format!("{}_", tag.to_ascii_lowercase()),
    ];
    let mut roles = Vec::new();

    for (key, _) in config.section_values(section) {
        let Some(base) = key
            .strip_suffix("_hosts")
            .or_else(|| key.strip_suffix("_host"))
        else {
            continue;
        };
        let role_type = prefixes
            .iter()
            .find_map(|prefix| base.strip_prefix(prefix.as_str()))
            .unwrap_or(base)
            .to_ascii_uppercase();
        if role_type.is_empty() {
            continue;
        }
        let name = config
            .optional_scalar(section, &format!("{base}_name"))?
            .filter(|n| !n.is_empty());
        let hosts = non_empty_hosts(config.list(section, &key)?, section, &key)?;
        roles.push(RoleSpec {
            role_type,
            name,
            hosts,
        });
    }

    Ok(roles)
}

/// Deduplicate a host list, keeping first occurrences, and require it to be non-empty.
fn non_empty_hosts(hosts: Vec<String>, section: &str, key: &str) -> Result<Vec<String>, ConfigError> {
    let mut unique: Vec<String> = Vec::with_capacity(hosts.len());
    for host in hosts {
        if !host.is_empty() && !unique.contains(&host) {
            unique.push(host);
        }
    }
    if unique.is_empty() {
        return Err(ConfigError::EmptyHostList {
            section: section.to_string(),
            key: key.to_string(),
        });
    }
    Ok(unique)
}

/// The config section holding role-level configuration for `role_type` in a service of `kind`.
///
/// This is the single place where shared role types are disambiguated: a GATEWAY role of an HDFS
/// service reads `[HDFS_GATEWAY]`, never `[GATEWAY]`.
pub fn role_config_key(kind: &ServiceKind, role_type: &str) -> String {
    if let Some((_, section)) = kind.role_sections().iter().find(|(rt, _)| *rt == role_type) {
        return section.to_string();
    }
    if role_type == GATEWAY_ROLE_TYPE {
        return format!("{}_{}", kind.tag(), GATEWAY_ROLE_TYPE);
    }
    role_type.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_is_namespaced_by_kind() {
        assert_eq!(role_config_key(&ServiceKind::Hdfs, "GATEWAY"), "HDFS_GATEWAY");
        assert_eq!(role_config_key(&ServiceKind::Hive, "GATEWAY"), "HIVE_GATEWAY");
        assert_eq!(role_config_key(&ServiceKind::Hdfs, "NAMENODE"), "NAMENODE");
        assert_eq!(
            role_config_key(&ServiceKind::Zookeeper, "SERVER"),
            "ZOOKEEPER_ROLE_CONFIG"
        );
        // Only an exact match is a shared gateway role.
        assert_eq!(
            role_config_key(&ServiceKind::Hdfs, "NFSGATEWAY"),
            "NFSGATEWAY"
        );
    }

    #[test]
    fn kinds_by_name() {
        assert_eq!(ServiceKind::from_name("hdfs").unwrap(), ServiceKind::Hdfs);
        assert_eq!(ServiceKind::from_name("SQOOP2").unwrap(), ServiceKind::Sqoop2);
        assert_eq!(ServiceKind::from_name("SQOOP").unwrap(), ServiceKind::Sqoop2);
        assert_eq!(ServiceKind::from_name("mgmt").unwrap(), ServiceKind::Mgmt);
        assert!(matches!(
            ServiceKind::from_name("HBASE"),
            Err(ConfigError::UnknownServiceKind(_))
        ));
    }

    #[test]
    fn generic_gateway_and_aliases_follow_the_service_type() {
        let hbase = ServiceKind::Generic {
            tag: "HBASE".to_string(),
            section: "HBASE".to_string(),
        };
        assert_eq!(role_config_key(&hbase, "GATEWAY"), "HBASE_GATEWAY");
        assert_eq!(role_config_key(&hbase, "REGIONSERVER"), "REGIONSERVER");

        let zk2 = ServiceKind::Generic {
            tag: "ZOOKEEPER".to_string(),
            section: "ZK2".to_string(),
        };
        assert_eq!(role_config_key(&zk2, "SERVER"), "ZOOKEEPER_ROLE_CONFIG");
        assert!(!zk2.is_management());
    }

    #[test]
    fn generic_service_from_its_own_section() {
        let config: Config = r#"
            [HBASE]
            hbase_name = "hbase1"
            hbase_master_hosts = "m1"
            hbase_master_name = "master"
            REGIONSERVER_hosts = ["r1", "r2", "r1"]
            hbase_thriftserver_host = "t1"

            [HBASE_SERVICE_CONFIG]
            zookeeper_service = "zookeeper1"
        "#
        .parse()
        .unwrap();

        let kind = ServiceKind::from_entry(&config, "HBASE").unwrap();
        assert_eq!(
            kind,
            ServiceKind::Generic {
                tag: "HBASE".to_string(),
                section: "HBASE".to_string()
            }
        );
        assert_eq!(kind.to_string(), "HBASE");

        let spec = kind.to_spec(&config).unwrap();
        assert_eq!(spec.name, "hbase1");
        assert_eq!(
            spec.service_config,
            vec![("zookeeper_service".to_string(), "zookeeper1".to_string())]
        );
        let types: Vec<_> = spec.roles.iter().map(|r| r.role_type.as_str()).collect();
        assert_eq!(types, vec!["MASTER", "REGIONSERVER", "THRIFTSERVER"]);
        assert_eq!(spec.roles[0].name.as_deref(), Some("master"));
        assert_eq!(spec.roles[1].hosts, vec!["r1", "r2"]);
        assert!(spec.invalid_role_types.is_empty());
    }

    #[test]
    fn generic_section_can_declare_a_second_builtin_service() {
        let config: Config = r#"
            [HDFS_ARCHIVE]
            type = "hdfs"
            name = "hdfs2"
            hdfs_namenode_host = "an1"
            datanode_hosts = "ad1,ad2"
        "#
        .parse()
        .unwrap();

        let kind = ServiceKind::from_entry(&config, "HDFS_ARCHIVE").unwrap();
        assert_eq!(kind.tag(), "HDFS");
        assert_eq!(kind.service_config_section(), "HDFS_ARCHIVE_SERVICE_CONFIG");

        let spec = kind.to_spec(&config).unwrap();
        assert_eq!(spec.name, "hdfs2");
        let types: Vec<_> = spec.roles.iter().map(|r| r.role_type.as_str()).collect();
        assert_eq!(types, vec!["NAMENODE", "DATANODE"]);
        assert_eq!(role_config_key(&kind, "GATEWAY"), "HDFS_GATEWAY");
    }

    #[test]
    fn generic_service_errors() {
        let config: Config = r#"
            [SOLR]
            solr_server_hosts = "s1"

            [KUDU]
            name = "kudu1"
            kudu_master_hosts = " , "
        "#
        .parse()
        .unwrap();

        // Builtins win, and an entry with no section is still unknown.
        assert_eq!(
            ServiceKind::from_entry(&config, "hdfs").unwrap(),
            ServiceKind::Hdfs
        );
        assert!(matches!(
            ServiceKind::from_entry(&config, "HBASE"),
            Err(ConfigError::UnknownServiceKind(_))
        ));

        let solr = ServiceKind::from_entry(&config, "SOLR").unwrap();
        match solr.to_spec(&config) {
            Err(ConfigError::MissingKey { section, key }) => {
                assert_eq!(section, "SOLR");
                assert_eq!(key, "solr_name");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }

        let kudu = ServiceKind::from_entry(&config, "KUDU").unwrap();
        assert!(matches!(
            kudu.to_spec(&config),
            Err(ConfigError::EmptyHostList { .. })
        ));
    }

    #[test]
    fn hosts_expand_one_instance_each() {
        let role = RoleSpec {
            role_type: "DATANODE".to_string(),
            name: None,
            hosts: vec!["h1".into(), "h2".into(), "h3".into()],
        };
        let instances: Vec<_> = role.expand().collect();
        assert_eq!(instances.len(), 3);
        assert!(instances.iter().all(|i| i.role_type == "DATANODE"));
        assert!(instances.iter().all(|i| i.name.is_none()));
        assert_eq!(
            instances.iter().map(|i| i.host.as_str()).collect::<Vec<_>>(),
            vec!["h1", "h2", "h3"]
        );
    }

    #[test]
    fn explicit_name_is_shared_by_every_instance() {
        // Ambiguous: the remote side will likely reject duplicate names, but expansion itself
        // does not invent unique names.
        let role = RoleSpec {
            role_type: "NAMENODE".to_string(),
            name: Some("nn".to_string()),
            hosts: vec!["h1".into(), "h2".into(), "h3".into()],
        };
        let instances: Vec<_> = role.expand().collect();
        assert_eq!(instances.len(), 3);
        assert!(instances.iter().all(|i| i.name.as_deref() == Some("nn")));
    }

    #[test]
    fn hdfs_layout_from_config() {
        let config: Config = r#"
            [HDFS]
            hdfs_name = "hdfs1"
            hdfs_namenode_host = "n1"
            hdfs_namenode_name = "nn1"
            hdfs_secondary_namenode_host = "s1"
            hdfs_datanode_hosts = "d1,d2,d1"
        "#
        .parse()
        .unwrap();

        let spec = ServiceKind::Hdfs.to_spec(&config).unwrap();
        assert_eq!(spec.name, "hdfs1");
        assert!(spec.service_config.is_empty());
        let types: Vec<_> = spec.roles.iter().map(|r| r.role_type.as_str()).collect();
        assert_eq!(types, vec!["NAMENODE", "SECONDARYNAMENODE", "DATANODE"]);
        assert_eq!(spec.roles[0].name.as_deref(), Some("nn1"));
        assert_eq!(spec.roles[2].hosts, vec!["d1", "d2"]);
        assert_eq!(spec.role_instances().len(), 4);
    }

    #[test]
    fn required_hosts_must_be_present_and_non_empty() {
        let config: Config = r#"
            [YARN]
            yarn_name = "yarn1"
            yarn_resourcemanager_host = "rm"
            yarn_jobhistory_server_host = "jh"
        "#
        .parse()
        .unwrap();
        assert!(matches!(
            ServiceKind::Yarn.desired_roles(&config),
            Err(ConfigError::MissingKey { .. })
        ));

        let config: Config = r#"
            [FLUME]
            flume_name = "flume1"
            flume_agent_hosts = " , "
        "#
        .parse()
        .unwrap();
        assert!(matches!(
            ServiceKind::Flume.desired_roles(&config),
            Err(ConfigError::EmptyHostList { .. })
        ));
    }

    #[test]
    fn management_roles_are_validated() {
        let config: Config = r#"
            [CM]
            cm_private_hostname = "cm.internal"

            [MGMT_SERVICE]
            mgmt_service_name = "mgmt"
            cm_management_roletypes = "HOSTMONITOR,BOGUSMONITOR,EVENTSERVER"
        "#
        .parse()
        .unwrap();

        let spec = ServiceKind::Mgmt.to_spec(&config).unwrap();
        assert_eq!(spec.invalid_role_types, vec!["BOGUSMONITOR"]);
        let instances = spec.role_instances();
        assert_eq!(
            instances,
            vec![
                RoleInstance {
                    role_type: "HOSTMONITOR".into(),
                    name: Some("HOSTMONITOR-1".into()),
                    host: "cm.internal".into(),
                },
                RoleInstance {
                    role_type: "EVENTSERVER".into(),
                    name: Some("EVENTSERVER-1".into()),
                    host: "cm.internal".into(),
                },
            ]
        );
    }
}
