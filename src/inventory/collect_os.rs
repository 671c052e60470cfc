use crate::error::{InventoryError, Result};
use crate::inventory::types::InventoryRecord;
use crate::sources::{self, SourceReader};

/// Regular (non-system) account uid range
const USER_UID_RANGE: std::ops::Range<u32> = 1000..60000;

pub fn collect_os_info<S: SourceReader>(source: &S, record: &mut InventoryRecord) -> Result<()> {
    record.os_hostname = Some(required_line(source, sources::OS_HOSTNAME)?);
    record.os_version = Some(parse_os_version(&source.lines(sources::OS_VERSION)?)?);
    record.os_core = Some(required_line(source, sources::OS_CORE)?);

    record.date_of_inventory = optional_line(source, sources::DATE_OF_INVENTORY)?;
    record.os_ssl_version = optional_line(source, sources::OS_SSL_VERSION)?;
    record.os_ssh_version = optional_line(source, sources::OS_SSH_VERSION)?;

    if source.exists(sources::OS_USERS) {
        record.os_users = parse_users(&source.lines(sources::OS_USERS)?);
    }
    if source.exists(sources::OS_SSH_PORT) {
        record.os_ssh_port = Some(parse_ssh_port(&source.lines(sources::OS_SSH_PORT)?)?);
    }

    tracing::info!(
        "OS: {} running {}",
        record.os_hostname.as_deref().unwrap_or_default(),
        record.os_version.as_deref().unwrap_or_default()
    );
    Ok(())
}

fn required_line<S: SourceReader>(source: &S, name: &str) -> Result<String> {
    let line = source.first_line(name)?.trim().to_string();
    if line.is_empty() {
        return Err(InventoryError::missing_field("first line", name));
    }
    Ok(line)
}

fn optional_line<S: SourceReader>(source: &S, name: &str) -> Result<Option<String>> {
    if !source.exists(name) {
        return Ok(None);
    }
    let line = source.first_line(name)?.trim().to_string();
    Ok(Some(line).filter(|l| !l.is_empty()))
}

/// `/etc/os-release` content or an already extracted pretty name.
pub fn parse_os_version(lines: &[String]) -> Result<String> {
    if let Some(pretty) = lines
        .iter()
        .find_map(|line| line.trim().strip_prefix("PRETTY_NAME="))
    {
        return Ok(pretty.trim_matches('"').to_string());
    }
    lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or_else(|| InventoryError::missing_field("PRETTY_NAME", sources::OS_VERSION))
}

/// Plain user names, or passwd lines filtered to regular accounts and sorted.
pub fn parse_users(lines: &[String]) -> Vec<String> {
    let lines: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    if !lines.iter().any(|line| line.contains(':')) {
        return lines.into_iter().map(str::to_string).collect();
    }

    let mut users: Vec<String> = lines
        .into_iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            let uid: u32 = fields.get(2)?.parse().ok()?;
            USER_UID_RANGE.contains(&uid).then(|| fields[0].to_string())
        })
        .collect();
    users.sort();
    users
}

/// A bare number or the first `Port N` directive of sshd_config.
pub fn parse_ssh_port(lines: &[String]) -> Result<u16> {
    let line = lines
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .ok_or_else(|| InventoryError::missing_field("port", sources::OS_SSH_PORT))?;

    let mut words = line.split_whitespace();
    let token = match words.next() {
        Some(word) if word.eq_ignore_ascii_case("port") => words.next().unwrap_or_default(),
        Some(word) => word,
        None => "",
    };
    token
        .parse()
        .map_err(|_| InventoryError::malformed("os_ssh_port", line))
}
