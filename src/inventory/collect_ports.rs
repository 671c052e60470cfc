use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{InventoryError, Result};
use crate::inventory::types::{
    Container, ContainerPort, ContainerRef, InventoryRecord, ListeningPort,
};
use crate::sources::{self, SourceReader};

const IPV4_ANY: &str = "0.0.0.0";
const IPV6_ANY: &str = "::";

/// Entry point: listening sockets, then containers cross-linked to them.
pub fn collect_listen_ports<S: SourceReader>(
    source: &S,
    record: &mut InventoryRecord,
) -> Result<()> {
    if source.exists(sources::NETSTAT) {
        let rows = parse_netstat(&source.lines(sources::NETSTAT)?);
        let facts = normalize_listen_ports(rows);
        record.network_listen_ports = facts.ports;
        record.network_listen_ports_list = facts.port_list;
    }

    // Container listing is optional and never aborts the run
    if source.exists(sources::CONTAINERS) {
        match source
            .read_text(sources::CONTAINERS)
            .and_then(|text| parse_containers(&text))
        {
            Ok(mut containers) => {
                link_containers(&mut record.network_listen_ports, &mut containers);
                record.containers = containers;
            }
            Err(e) => tracing::warn!("Skipping container listing: {}", e),
        }
    }

    tracing::info!(
        "Listening ports: {} sockets, {} containers",
        record.network_listen_ports.len(),
        record.containers.len()
    );
    Ok(())
}

/// One listening socket row from `netstat -tulpen`.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketRow {
    pub proto: String,
    pub address: String,
    pub port: String,
    pub program: String,
}

pub struct ListenFacts {
    pub ports: IndexMap<String, ListeningPort>,
    pub port_list: Vec<String>,
}

pub fn listen_port_id(proto: &str, port: &str, address: &str) -> String {
    format!("port {}/{} on {}", proto, port, address)
}

/// Parse netstat rows; header and unrelated lines are skipped.
pub fn parse_netstat(lines: &[String]) -> Vec<SocketRow> {
    let mut rows = Vec::new();

    for line in lines {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(proto) = words.first() else {
            continue;
        };
        if !(proto.starts_with("tcp") || proto.starts_with("udp")) || words.len() < 5 {
            tracing::debug!("Not a socket row: {}", line);
            continue;
        }

        // Local address: port is the last colon-delimited token
        let Some((address, port)) = words[3].rsplit_once(':') else {
            tracing::debug!("Local address without port: {}", words[3]);
            continue;
        };

        rows.push(SocketRow {
            proto: proto.to_string(),
            address: trim_address(address).to_string(),
            port: port.to_string(),
            program: words[words.len() - 1].to_string(),
        });
    }

    rows
}

/// Drop a stray trailing colon unless the colon belongs to an IPv6 literal.
fn trim_address(address: &str) -> &str {
    if address.matches(':').count() == 1 {
        address.trim_end_matches(':')
    } else {
        address
    }
}

/// Sort by (address, port) as strings and key each row by its synthetic id.
///
/// Ports compare lexicographically ("443" sorts before "80"). A later row
/// with an id already seen replaces the earlier entry in place.
pub fn normalize_listen_ports(mut rows: Vec<SocketRow>) -> ListenFacts {
    rows.sort_by(|a, b| (&a.address, &a.port).cmp(&(&b.address, &b.port)));

    let mut ports = IndexMap::new();
    let mut port_list: Vec<String> = Vec::new();

    for row in rows {
        let id = listen_port_id(&row.proto, &row.port, &row.address);
        if !port_list.contains(&row.port) {
            port_list.push(row.port.clone());
        }
        ports.insert(
            id,
            ListeningPort {
                listen_proto: row.proto,
                listen_port: row.port,
                listen_ip: row.address,
                listen_pid_program: row.program,
                container: None,
            },
        );
    }

    ListenFacts { ports, port_list }
}

//
// Containers
//

/// `docker ps --format '{{json .}}'` line or Docker API `/containers/json` entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContainerRow {
    Api(ApiContainer),
    Cli(CliContainer),
}

#[derive(Debug, Deserialize)]
struct ApiContainer {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "Names", default)]
    names: Vec<String>,
    #[serde(rename = "Ports", default)]
    ports: Vec<ApiPort>,
}

#[derive(Debug, Deserialize)]
struct ApiPort {
    #[serde(rename = "IP")]
    ip: Option<String>,
    #[serde(rename = "PrivatePort")]
    private_port: Option<u16>,
    #[serde(rename = "PublicPort")]
    public_port: Option<u16>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliContainer {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Image")]
    image: Option<String>,
    #[serde(rename = "Names")]
    names: Option<String>,
    #[serde(rename = "Ports", default)]
    ports: String,
}

impl From<ContainerRow> for Container {
    fn from(row: ContainerRow) -> Self {
        match row {
            ContainerRow::Api(c) => Container {
                id: c.id,
                image: c.image,
                name: c.names.first().map(|n| n.trim_start_matches('/').to_string()),
                ports: c
                    .ports
                    .iter()
                    .filter_map(|p| {
                        Some(ContainerPort {
                            host_port: p.public_port?,
                            container_port: p.private_port,
                            proto: p.kind.clone().unwrap_or_else(|| "tcp".to_string()),
                            ipv6: p.ip.as_deref().is_some_and(|ip| ip.contains(':')),
                        })
                    })
                    .collect(),
                listen_ports: Vec::new(),
            },
            ContainerRow::Cli(c) => Container {
                id: c.id,
                image: c.image,
                name: c.names,
                ports: parse_port_mappings(&c.ports),
                listen_ports: Vec::new(),
            },
        }
    }
}

/// Accepts a JSON array or one JSON object per line.
pub fn parse_containers(text: &str) -> Result<Vec<Container>> {
    let json_err = |source| InventoryError::Json {
        name: sources::CONTAINERS.to_string(),
        source,
    };

    let rows: Vec<ContainerRow> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(json_err)?
    } else {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()
            .map_err(json_err)?
    };

    Ok(rows.into_iter().map(Container::from).collect())
}

/// Parse docker's `Ports` column, e.g. `0.0.0.0:8080->80/tcp, :::8080->80/tcp`.
/// Unpublished ports (`5432/tcp`) are skipped.
pub fn parse_port_mappings(ports: &str) -> Vec<ContainerPort> {
    let mut mappings = Vec::new();

    for entry in ports.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((host, inner)) = entry.split_once("->") else {
            continue;
        };
        let Some((ip, host_ports)) = host.rsplit_once(':') else {
            continue;
        };
        let (inner_ports, proto) = inner.split_once('/').unwrap_or((inner, "tcp"));

        let inner_range = parse_port_range(inner_ports);
        let Some(host_range) = parse_port_range(host_ports) else {
            tracing::debug!("Unparsable port mapping: {}", entry);
            continue;
        };
        for (offset, host_port) in host_range.enumerate() {
            mappings.push(ContainerPort {
                host_port,
                container_port: inner_range.clone().and_then(|mut r| r.nth(offset)),
                proto: proto.to_string(),
                ipv6: ip.contains(':'),
            });
        }
    }

    mappings
}

fn parse_port_range(ports: &str) -> Option<std::ops::RangeInclusive<u16>> {
    match ports.split_once('-') {
        Some((start, end)) => Some(start.parse().ok()?..=end.parse().ok()?),
        None => {
            let port = ports.parse().ok()?;
            Some(port..=port)
        }
    }
}

/// Match each published container port to a wildcard-bound listening socket.
/// Matches annotate both sides; ports without a socket are dropped silently.
pub fn link_containers(ports: &mut IndexMap<String, ListeningPort>, containers: &mut [Container]) {
    for container in containers.iter_mut() {
        let reference = ContainerRef {
            id: container.id.clone(),
            image: container.image.clone(),
            name: container.name.clone(),
        };

        let mut matched: Vec<String> = Vec::new();
        for mapping in &container.ports {
            let (proto, address) = if mapping.ipv6 {
                (format!("{}6", mapping.proto), IPV6_ANY)
            } else {
                (mapping.proto.clone(), IPV4_ANY)
            };
            let id = listen_port_id(&proto, &mapping.host_port.to_string(), address);
            if let Some(listen) = ports.get_mut(&id) {
                listen.container = Some(reference.clone());
                if !matched.contains(&id) {
                    matched.push(id);
                }
            }
        }
        container.listen_ports.extend(matched);
    }
}
