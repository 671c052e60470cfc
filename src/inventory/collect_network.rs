use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{InventoryError, Result};
use crate::inventory::types::NetInterface;
use crate::sources::{self, SourceReader};

const LOOPBACK: &str = "lo";

/// Entry point: run the link, address and route passes in order.
pub fn collect_network_info<S: SourceReader>(
    source: &S,
    builder: &mut InterfaceMapBuilder,
) -> Result<()> {
    if source.exists(sources::IP_LINK_JSON) {
        let links: Vec<IpLinkJson> = source.json(sources::IP_LINK_JSON)?;
        apply_link_pass(builder, links.into_iter().map(LinkFacts::from));
    } else if source.exists(sources::IP_LINK_TEXT) {
        let lines = source.lines(sources::IP_LINK_TEXT)?;
        apply_link_pass(builder, parse_link_text(&lines));
    } else {
        return Err(InventoryError::MissingSource(format!(
            "{} or {}",
            sources::IP_LINK_JSON,
            sources::IP_LINK_TEXT
        )));
    }

    if source.exists(sources::IP_ADDR_JSON) {
        let addrs: Vec<IpAddrJson> = source.json(sources::IP_ADDR_JSON)?;
        apply_address_json(builder, addrs);
    } else if source.exists(sources::IP_ADDR_TEXT) {
        let lines = source.lines(sources::IP_ADDR_TEXT)?;
        apply_address_text(builder, &lines);
    } else {
        tracing::warn!("No address listing found, interfaces will carry no ips");
    }

    if source.exists(sources::ROUTES) {
        let lines = source.lines(sources::ROUTES)?;
        apply_route_pass(builder, &lines);
    }

    tracing::info!(
        "Network passes done: {} interfaces, {} routes",
        builder.interfaces.len(),
        builder.routes.len()
    );
    Ok(())
}

/// Final network section of the inventory.
#[derive(Debug, Default)]
pub struct NetworkFacts {
    pub interfaces: IndexMap<String, NetInterface>,
    pub all_ip_addresses: Vec<String>,
    pub routes_all: Vec<String>,
}

/// Interface map shared by the network passes and the hardware classifier.
///
/// Every operation only adds to an entry; nothing set by an earlier pass is
/// erased until [`InterfaceMapBuilder::finish`].
#[derive(Debug, Default)]
pub struct InterfaceMapBuilder {
    interfaces: IndexMap<String, NetInterface>,
    all_addresses: Vec<String>,
    routes: Vec<String>,
    route_destinations: HashSet<String>,
}

/// One interface as reported by the link listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkFacts {
    pub name: String,
    pub parent: Option<String>,
    pub mac: Option<String>,
    pub master: Option<String>,
    pub altnames: Vec<String>,
}

impl InterfaceMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    pub fn upsert_link(&mut self, facts: LinkFacts) {
        // Parent must already be known; forward references are dropped.
        let link = facts.parent.filter(|parent| self.is_known(parent));
        let entry = self.interfaces.entry(facts.name).or_default();

        if link.is_some() {
            entry.link = link;
        }
        if facts.master.is_some() {
            entry.master = facts.master;
        }
        if facts.mac.is_some() {
            entry.mac = facts.mac;
        }
        if !facts.altnames.is_empty() {
            let altnames = entry.altnames.get_or_insert_with(Vec::new);
            for altname in facts.altnames {
                if !altnames.contains(&altname) {
                    altnames.push(altname);
                }
            }
        }
    }

    /// Make sure a known interface carries an `ips` list, even if it stays empty.
    pub fn open_addresses(&mut self, name: &str) -> bool {
        match self.interfaces.get_mut(name) {
            Some(entry) => {
                entry.ips.get_or_insert_with(Vec::new);
                true
            }
            None => false,
        }
    }

    pub fn append_address(&mut self, name: &str, cidr: &str) -> bool {
        let Some(entry) = self.interfaces.get_mut(name) else {
            tracing::debug!("Address {} for unknown interface {} skipped", cidr, name);
            return false;
        };
        entry.ips.get_or_insert_with(Vec::new).push(cidr.to_string());
        if name != LOOPBACK {
            self.all_addresses.push(cidr.to_string());
        }
        true
    }

    /// Record one route row under `destination`.
    ///
    /// The route list keeps only the first row per destination, while every
    /// row naming a known device links the destination to that interface.
    pub fn record_route(&mut self, destination: &str, row: &str, dev: Option<&str>) {
        if self.route_destinations.insert(destination.to_string()) {
            self.routes.push(row.to_string());
        }
        if let Some(entry) = dev.and_then(|dev| self.interfaces.get_mut(dev)) {
            entry
                .routes_to
                .get_or_insert_with(Vec::new)
                .push(destination.to_string());
        }
    }

    /// Attach hardware identity to an interface already seen by the link pass.
    pub fn merge_hardware(
        &mut self,
        name: &str,
        vendor: Option<String>,
        product: Option<String>,
    ) -> bool {
        match self.interfaces.get_mut(name) {
            Some(entry) => {
                if vendor.is_some() {
                    entry.vendor = vendor;
                }
                if product.is_some() {
                    entry.product = product;
                }
                true
            }
            None => false,
        }
    }

    /// Add an interface the OS does not name, under a generated id.
    pub fn insert_synthetic(
        &mut self,
        id: String,
        vendor: Option<String>,
        product: Option<String>,
    ) {
        let entry = self.interfaces.entry(id).or_default();
        if vendor.is_some() {
            entry.vendor = vendor;
        }
        if product.is_some() {
            entry.product = product;
        }
    }

    /// Drop loopback and empty address lists; sort the run-wide address list.
    pub fn finish(mut self) -> NetworkFacts {
        self.interfaces.shift_remove(LOOPBACK);
        for entry in self.interfaces.values_mut() {
            if entry.ips.as_ref().is_some_and(|ips| ips.is_empty()) {
                entry.ips = None;
            }
        }
        self.all_addresses.sort();

        NetworkFacts {
            interfaces: self.interfaces,
            all_ip_addresses: self.all_addresses,
            routes_all: self.routes,
        }
    }
}

//
// Link pass
//

#[derive(Debug, Deserialize)]
pub struct IpLinkJson {
    pub ifname: String,
    pub address: Option<String>,
    pub link_type: Option<String>,
    #[serde(default)]
    pub altnames: Vec<String>,
    pub master: Option<String>,
    pub link: Option<String>,
}

impl From<IpLinkJson> for LinkFacts {
    fn from(link: IpLinkJson) -> Self {
        let is_loopback = link.link_type.as_deref() == Some("loopback");
        LinkFacts {
            name: link.ifname,
            parent: link.link,
            mac: link.address.filter(|_| !is_loopback),
            master: link.master,
            altnames: link.altnames,
        }
    }
}

/// Link kinds whose `link/<kind>` address is recorded as the MAC.
const HARDWARE_LINK_KINDS: &[&str] = &["link/ether", "link/infiniband"];

pub fn apply_link_pass<I>(builder: &mut InterfaceMapBuilder, links: I)
where
    I: IntoIterator<Item = LinkFacts>,
{
    for link in links {
        builder.upsert_link(link);
    }
}

/// Parse `ip link` text output into one record per interface.
pub fn parse_link_text(lines: &[String]) -> Vec<LinkFacts> {
    let mut links: Vec<LinkFacts> = Vec::new();

    for line in lines {
        let words: Vec<&str> = line.split_whitespace().collect();

        if let Some((name, parent)) = parse_header_name(line) {
            links.push(LinkFacts {
                name,
                parent,
                master: word_after(&words, "master"),
                ..Default::default()
            });
            continue;
        }

        // Detail lines belong to the last header
        let Some(current) = links.last_mut() else {
            continue;
        };
        if let Some(mac) = HARDWARE_LINK_KINDS
            .iter()
            .find_map(|kind| word_after(&words, kind))
        {
            current.mac = Some(mac);
        }
        if let Some(altname) = word_after(&words, "altname") {
            current.altnames.push(altname);
        }
    }

    links
}

/// `"5: eth0.100@eth0: <...>"` gives `("eth0.100", Some("eth0"))`.
fn parse_header_name(line: &str) -> Option<(String, Option<String>)> {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let field = line.replace(": ", ":");
    let name = field.split(':').nth(1)?.trim();
    if name.is_empty() {
        return None;
    }
    match name.split_once('@') {
        Some((local, parent)) => Some((local.to_string(), Some(parent.to_string()))),
        None => Some((name.to_string(), None)),
    }
}

fn word_after(words: &[&str], marker: &str) -> Option<String> {
    let pos = words.iter().position(|w| *w == marker)?;
    words.get(pos + 1).map(|w| w.to_string())
}

//
// Address pass
//

#[derive(Debug, Deserialize)]
pub struct IpAddrJson {
    pub ifname: String,
    pub addr_info: Option<Vec<AddrInfo>>,
}

#[derive(Debug, Deserialize)]
pub struct AddrInfo {
    pub local: Option<String>,
    pub prefixlen: Option<u8>,
}

pub fn apply_address_json(builder: &mut InterfaceMapBuilder, links: Vec<IpAddrJson>) {
    for link in links {
        let Some(addr_info) = link.addr_info else {
            continue;
        };
        if !builder.open_addresses(&link.ifname) {
            tracing::debug!("Addresses of unknown interface {} skipped", link.ifname);
            continue;
        }
        for addr in addr_info {
            let Some(local) = addr.local else {
                continue;
            };
            let cidr = match addr.prefixlen {
                Some(prefix) => format!("{}/{}", local, prefix),
                None => local,
            };
            builder.append_address(&link.ifname, &cidr);
        }
    }
}

pub fn apply_address_text(builder: &mut InterfaceMapBuilder, lines: &[String]) {
    let mut current: Option<String> = None;

    for line in lines {
        if let Some((name, _)) = parse_header_name(line) {
            current = Some(name);
            continue;
        }
        let Some(name) = current.as_deref() else {
            continue;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        let cidr = word_after(&words, "inet").or_else(|| word_after(&words, "inet6"));
        if let Some(cidr) = cidr {
            builder.append_address(name, &cidr);
        }
    }
}

//
// Route pass
//

/// Group `ip route` rows by destination; indented rows continue the last
/// top-level route (multipath next hops).
pub fn apply_route_pass(builder: &mut InterfaceMapBuilder, lines: &[String]) {
    let mut destination: Option<String> = None;

    for line in lines {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        let continuation = line.starts_with(char::is_whitespace);
        if !continuation {
            destination = Some(words[0].to_string());
        }
        let Some(dest) = destination.as_deref() else {
            tracing::debug!("Route continuation without destination skipped: {}", line);
            continue;
        };

        let row = words.join(" ");
        let dev = word_after(&words, "dev");
        builder.record_route(dest, &row, dev.as_deref());
    }
}
