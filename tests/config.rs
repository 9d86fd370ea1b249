// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

#[cfg(test)]
mod tests {
    use cmdeploy_lib::{
        cluster::Cluster,
        cm_api::ApiSettings,
        config::{Config, ConfigError},
        service::ServiceKind,
        test_env::*,
    };

    fn settings(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fixture_loads_in_declaration_order() {
        let cluster = test_cluster("cluster.toml");
        assert_eq!(cluster.name, "cluster1");

        let names: Vec<_> = cluster.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mgmt", "zookeeper1", "hdfs1", "hive1"]);

        let kinds: Vec<_> = cluster.services.iter().map(|s| s.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                ServiceKind::Mgmt,
                ServiceKind::Zookeeper,
                ServiceKind::Hdfs,
                ServiceKind::Hive
            ]
        );

        // MGMT: 4 roles, ZK: 3, HDFS: 1 + 1 + 2 + 1, HIVE: 1 + 1 + 1
        assert_eq!(cluster.num_role_instances(), 15);
    }

    #[test]
    fn fixture_service_and_role_configs() {
        let cluster = test_cluster("cluster.toml");

        let hdfs = cluster.get_service("hdfs1").unwrap();
        assert_eq!(
            hdfs.service_config,
            settings(&[
                ("dfs_replication", "2"),
                ("zookeeper_service", "zookeeper1")
            ])
        );

        assert_eq!(
            cluster.role_configs.resolve(&ServiceKind::Hdfs, "DATANODE"),
            settings(&[("dfs_data_dir_list", "/data/1/dfs/dn,/data/2/dfs/dn")])
        );
        assert_eq!(
            cluster.role_configs.resolve(&ServiceKind::Hdfs, "GATEWAY"),
            settings(&[("dfs_client_use_trash", "true")])
        );
        assert_eq!(
            cluster.role_configs.resolve(&ServiceKind::Hive, "GATEWAY"),
            settings(&[("hive_client_auto_reconnect", "false")])
        );
        assert_eq!(
            cluster.role_configs.resolve(&ServiceKind::Zookeeper, "SERVER"),
            settings(&[("maxClientCnxns", "1024")])
        );
        assert!(cluster
            .role_configs
            .resolve(&ServiceKind::Hdfs, "BALANCER")
            .is_empty());

        let settings = ApiSettings::from_config(
            &Config::from_file(&test_path("cluster.toml")).unwrap(),
        )
        .unwrap();
        assert_eq!(settings.cluster_name, "cluster1");
        assert_eq!(settings.base_url(), "http://cm.example.com:7180/api/v10");
    }

    #[test]
    fn missing_key_is_fatal_at_load() {
        let config: Config = r#"
            [CLUSTER]
            cluster_name = "c1"
            services = "HDFS"

            [HDFS]
            hdfs_name = "hdfs1"
            hdfs_datanode_hosts = "d1"
        "#
        .parse()
        .unwrap();

        match Cluster::from_config(&config) {
            Err(ConfigError::MissingKey { section, key }) => {
                assert_eq!(section, "HDFS");
                assert_eq!(key, "hdfs_namenode_host");
            }
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn missing_cluster_section_is_fatal() {
        let config: Config = "[HDFS]\nhdfs_name = \"hdfs1\"\n".parse().unwrap();
        assert!(matches!(
            Cluster::from_config(&config),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn unknown_service_kind_is_fatal() {
        let config: Config = r#"
            [CLUSTER]
            cluster_name = "c1"
            services = "HBASE"
        "#
        .parse()
        .unwrap();
        assert!(matches!(
            Cluster::from_config(&config),
            Err(ConfigError::UnknownServiceKind(kind)) if kind == "HBASE"
        ));
    }

    #[test]
    fn service_with_its_own_section_loads_as_generic() {
        let config: Config = r#"
            [CLUSTER]
            cluster_name = "c1"
            services = "HDFS, HBASE, HDFS_ARCHIVE"

            [HDFS]
            hdfs_name = "hdfs1"
            hdfs_namenode_host = "n1"
            hdfs_datanode_hosts = "d1"

            [HBASE]
            hbase_name = "hbase1"
            hbase_master_hosts = "m1"

            [HDFS_ARCHIVE]
            type = "HDFS"
            name = "archive"
            namenode_host = "an1"
            datanode_hosts = "ad1,ad2"
        "#
        .parse()
        .unwrap();

        let cluster = Cluster::from_config(&config).unwrap();
        let tags: Vec<_> = cluster.services.iter().map(|s| s.kind.tag()).collect();
        assert_eq!(tags, vec!["HDFS", "HBASE", "HDFS"]);
        assert_eq!(cluster.services[0].kind, ServiceKind::Hdfs);

        let hbase = cluster.get_service("hbase1").unwrap();
        assert_eq!(hbase.roles.len(), 1);
        assert_eq!(hbase.roles[0].role_type, "MASTER");
        assert_eq!(hbase.roles[0].hosts, vec!["m1"]);

        let archive = cluster.get_service("archive").unwrap();
        assert_eq!(archive.role_instances().len(), 3);
    }

    #[test]
    fn duplicate_service_is_fatal() {
        let config: Config = r#"
            [CLUSTER]
            cluster_name = "c1"
            services = "FLUME,FLUME"

            [FLUME]
            flume_name = "flume1"
            flume_agent_hosts = "a1"
        "#
        .parse()
        .unwrap();
        assert!(matches!(
            Cluster::from_config(&config),
            Err(ConfigError::DuplicateService(name)) if name == "flume1"
        ));
    }

    #[test]
    fn unreadable_file_is_fatal() {
        assert!(matches!(
            Cluster::new(&test_path("does_not_exist.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn retain_services_filters_and_rejects_unknown() {
        let mut cluster = test_cluster("cluster.toml");
        assert_eq!(
            cluster.retain_services(&["hive1".to_string(), "nope".to_string()]),
            Err("nope".to_string())
        );
        assert_eq!(cluster.services.len(), 4);

        cluster
            .retain_services(&["hive1".to_string(), "zookeeper1".to_string()])
            .unwrap();
        let names: Vec<_> = cluster.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zookeeper1", "hive1"]);
    }
}
