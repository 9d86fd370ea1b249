// SPDX-License-Identifier: MIT
// Copyright 2025. Triad National Security, LLC.

use crate::{
    cluster::Cluster,
    cm_api::CmClient,
    commands::{
        handled_error, load_api_settings, load_cluster, load_config, Cli, Handle, HandledResult,
    },
    gateway::ClusterGateway,
};

pub fn status(cli: &Cli) -> HandledResult<()> {
    let config = load_config(cli)?;
    let cluster = load_cluster(&config)?;
    let settings = load_api_settings(&config)?;

    let client = CmClient::new(settings)
        .handle_err(|e| eprintln!("Could not set up management API client: {e}"))?;

    print_status(&cluster, &client)
}

/// Print, for every declared service, whether it exists and which role config groups it has.
pub fn print_status<G: ClusterGateway>(cluster: &Cluster, gateway: &G) -> HandledResult<()> {
    let mut error_seen = false;

    for service in cluster.services.iter() {
        match gateway.service_exists(&service.kind, &service.name) {
            Ok(true) => println!("{} ({}): deployed", service.name, service.kind),
            Ok(false) => {
                println!("{} ({}): NOT deployed", service.name, service.kind);
                continue;
            }
            Err(e) => {
                println!("{} ({}): unknown: {e}", service.name, service.kind);
                error_seen = true;
                continue;
            }
        }

        match gateway.list_role_config_groups(&service.kind, &service.name) {
            Ok(groups) => {
                for group in groups {
                    let declared = cluster.role_configs.resolve(&service.kind, &group.role_type);
                    println!(
                        "    {:<40} {:<28} {} declared config entries",
                        group.name,
                        group.role_type,
                        declared.len()
                    );
                }
            }
            Err(e) => {
                println!("    could not list role config groups: {e}");
                error_seen = true;
            }
        }
    }

    if error_seen {
        return handled_error();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::HandledError, test_env::*};

    #[test]
    fn deployed_and_missing_services_report_success() {
        let cluster = test_cluster("cluster.toml");
        let gateway =
            MockGateway::new().with_service("hdfs1", "HDFS", &[("nn-group", "NAMENODE")]);

        assert_eq!(print_status(&cluster, &gateway), Ok(()));
        // Groups are only listed for services that exist.
        assert_eq!(
            gateway
                .calls()
                .iter()
                .filter(|c| matches!(c, Call::ListGroups { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn unknown_existence_or_failed_listing_exits_non_zero() {
        let cluster = test_cluster("cluster.toml");

        let gateway = MockGateway::new().fail_exists("zookeeper1");
        assert_eq!(print_status(&cluster, &gateway), Err(HandledError {}));
        // A failure does not stop the remaining services from being shown.
        assert!(gateway.calls().contains(&Call::Exists {
            service: "hdfs1".into()
        }));

        let gateway = MockGateway::new()
            .with_service("zookeeper1", "ZOOKEEPER", &[("zk-group", "SERVER")])
            .fail_list("zookeeper1");
        assert_eq!(print_status(&cluster, &gateway), Err(HandledError {}));
    }
}
