use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::inventory::types::{DiskInfo, InventoryRecord, Volume, GB};
use crate::sources::{self, SourceReader};

/// RAID tool facts merged onto the controllers and disks found by lshw.
pub fn collect_storage_info<S: SourceReader>(
    source: &S,
    config: &StorageConfig,
    record: &mut InventoryRecord,
) -> Result<()> {
    if source.exists(sources::RAID_CONTROLLER) {
        match source.lines(sources::RAID_CONTROLLER) {
            Ok(lines) => {
                let facts = parse_controller_facts(&lines);
                enrich_controller(record, &config.raid_vendor_marker, &facts)
            }
            Err(e) => tracing::warn!("Skipping RAID controller facts: {}", e),
        }
    }

    // storcli wins over the free-text disk listing when both were captured
    if source.exists(sources::STORCLI) {
        match source.json::<StorcliDump>(sources::STORCLI) {
            Ok(dump) => record.disks.extend(storcli_disks(&dump)),
            Err(e) => tracing::warn!("Skipping storcli output: {}", e),
        }
    } else if source.exists(sources::RAID_DISKS) {
        match source.lines(sources::RAID_DISKS) {
            Ok(lines) => record.disks.extend(parse_raid_disks(&lines)),
            Err(e) => tracing::warn!("Skipping RAID disk listing: {}", e),
        }
    }

    tracing::info!(
        "Storage: {} controllers, {} disks",
        record.storages.len(),
        record.disks.len()
    );
    Ok(())
}

pub fn collect_volumes<S: SourceReader>(source: &S, record: &mut InventoryRecord) -> Result<()> {
    if !source.exists(sources::VOLUMES) {
        return Ok(());
    }
    match source.lines(sources::VOLUMES) {
        Ok(lines) => record.volumes = parse_volumes(&lines),
        Err(e) => tracing::warn!("Skipping volume listing: {}", e),
    }
    tracing::info!("Volumes: {}", record.volumes.len());
    Ok(())
}

//
// Controller
//

#[derive(Debug, Default, PartialEq)]
pub struct ControllerFacts {
    pub product_name: Option<String>,
    pub serial: Option<String>,
}

/// `Key = Value` or `Key: Value` lines from the controller summary.
pub fn parse_controller_facts(lines: &[String]) -> ControllerFacts {
    let mut facts = ControllerFacts::default();

    for line in lines {
        let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Product Name" => facts.product_name = Some(value.to_string()),
            "Serial Number" => facts.serial = Some(value.to_string()),
            _ => {}
        }
    }

    facts
}

/// Overwrite model/serial of the first controller carrying the vendor marker.
pub fn enrich_controller(record: &mut InventoryRecord, marker: &str, facts: &ControllerFacts) {
    let marker = marker.to_lowercase();
    let Some(controller) = record.storages.iter_mut().find(|c| {
        c.model
            .as_deref()
            .is_some_and(|model| model.to_lowercase().contains(&marker))
    }) else {
        tracing::debug!("No controller matches RAID marker '{}'", marker);
        return;
    };

    if let Some(name) = &facts.product_name {
        controller.model_override = Some(name.clone());
    }
    if let Some(serial) = &facts.serial {
        controller.serial = Some(serial.clone());
    }
}

//
// Disks
//

/// `storcli /call/eall/sall show all J` output, only what disk identity needs.
#[derive(Debug, Deserialize)]
pub struct StorcliDump {
    #[serde(rename = "Controllers", default)]
    pub controllers: Vec<StorcliController>,
}

#[derive(Debug, Deserialize)]
pub struct StorcliController {
    #[serde(rename = "Response Data", default)]
    pub response_data: IndexMap<String, Value>,
}

pub fn storcli_disks(dump: &StorcliDump) -> Vec<DiskInfo> {
    let mut disks = Vec::new();

    for controller in &dump.controllers {
        for drive in controller.response_data.values() {
            let Some(details) = drive.as_object() else {
                continue;
            };
            let identity = details.values().filter_map(Value::as_object).find(|detail| {
                detail.contains_key("SN") && detail.contains_key("Model Number")
            });
            let Some(detail) = identity else {
                continue;
            };

            let field = |key: &str| {
                detail
                    .get(key)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
            };
            disks.push(DiskInfo {
                model: field("Model Number"),
                size_raw: field("Raw size"),
                serial: field("SN").and_then(|sn| sn.split_whitespace().next().map(str::to_string)),
                wwn: field("WWN"),
                fw_version: field("Firmware Revision"),
                ..Default::default()
            });
        }
    }

    disks
}

/// One drive identity per line: serial, model words, firmware.
pub fn parse_raid_disks(lines: &[String]) -> Vec<DiskInfo> {
    lines
        .iter()
        .filter_map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("Inquiry Data:").unwrap_or(line);
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.len() < 3 {
                tracing::debug!("Short disk identity line: {}", line);
                return None;
            }
            Some(DiskInfo {
                serial: Some(words[0].to_string()),
                model: Some(words[1..words.len() - 1].join(" ")),
                fw_version: Some(words[words.len() - 1].to_string()),
                ..Default::default()
            })
        })
        .collect()
}

//
// Volumes
//

/// `lsblk -P` style listing; the first line is a header.
pub fn parse_volumes(lines: &[String]) -> Vec<Volume> {
    lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let attributes = parse_pairs(line);
            let size_in_gb = attributes.get("size").and_then(|size| size_to_gb(size));
            Volume {
                attributes,
                size_in_gb,
            }
        })
        .collect()
}

/// Split `KEY="value with spaces" OTHER=x` into lowercased keys and unquoted values.
fn parse_pairs(line: &str) -> IndexMap<String, String> {
    let mut pairs = IndexMap::new();
    let mut rest = line.trim_start();

    while let Some((key, tail)) = rest.split_once('=') {
        let (value, remainder) = match tail.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, remainder)) => (value, remainder),
                None => (quoted, ""),
            },
            None => tail.split_once(char::is_whitespace).unwrap_or((tail, "")),
        };
        pairs.insert(key.trim().to_lowercase(), value.to_string());
        rest = remainder.trim_start();
    }

    pairs
}

/// `1.5G` -> 1, `2T` -> 2048; a bare number counts as bytes.
pub fn size_to_gb(size: &str) -> Option<u64> {
    let size = size.trim();
    let (number, unit) = match size.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&size[..idx], c.to_ascii_uppercase()),
        _ => (size, 'B'),
    };
    let multiplier: u64 = match unit {
        'T' => 1 << 40,
        'G' => 1 << 30,
        'M' => 1 << 20,
        'K' => 1 << 10,
        'B' => 1,
        _ => return None,
    };

    let value: f64 = number.trim().replace(',', ".").parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier as f64 / GB as f64).floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::StorageController;
    use crate::sources::MemorySource;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn controller(model: &str) -> StorageController {
        StorageController {
            vendor: Some("Broadcom / LSI".into()),
            model: Some(model.into()),
            model_override: None,
            description: Some("RAID bus controller".into()),
            serial: None,
        }
    }

    const STORCLI: &str = r#"{
  "Controllers": [{
    "Command Status": {"Status": "Success"},
    "Response Data": {
      "Drive /c0/e32/s0": [{"EID:Slt": "32:0", "State": "Onln"}],
      "Drive /c0/e32/s0 - Detailed Information": {
        "Drive /c0/e32/s0 State": {"Shield Counter": 0},
        "Drive /c0/e32/s0 Device attributes": {
          "SN": "S3Z8NX0K123456      ",
          "WWN": "5002538E40A1B2C3",
          "Firmware Revision": "HXT7404Q",
          "Raw size": "447.130 GB [0x37e436b0 Sectors]",
          "Model Number": "SAMSUNG MZ7LH480HAHQ-00005"
        }
      }
    }
  }]
}"#;

    #[test]
    fn test_controller_enrichment_first_match_only() {
        let mut record = InventoryRecord::default();
        record.storages = vec![
            controller("SAS3008 PCI-Express Fusion-MPT SAS-3"),
            controller("MegaRAID SAS-3 3108 [Invader]"),
            controller("MegaRAID SAS-3 3108 [Invader]"),
        ];
        let facts = parse_controller_facts(&lines(
            "Controller = 0\nProduct Name = PERC H730P Mini\n\
             Serial Number = 5CF00J7\nFW Package Build: 25.5.6.0009\n",
        ));
        enrich_controller(&mut record, "megaraid", &facts);

        assert!(record.storages[0].model_override.is_none());
        assert_eq!(record.storages[1].model_override.as_deref(), Some("PERC H730P Mini"));
        assert_eq!(record.storages[1].serial.as_deref(), Some("5CF00J7"));
        assert!(record.storages[2].serial.is_none());
    }

    #[test]
    fn test_controller_without_marker_untouched() {
        let mut record = InventoryRecord::default();
        record.storages = vec![controller("SATA controller")];
        let facts = parse_controller_facts(&lines("Product Name: PERC H730P Mini"));
        assert_eq!(facts.product_name.as_deref(), Some("PERC H730P Mini"));

        enrich_controller(&mut record, "megaraid", &facts);
        assert!(record.storages[0].model_override.is_none());
    }

    #[test]
    fn test_storcli_disk_identity() {
        let dump: StorcliDump = serde_json::from_str(STORCLI).unwrap();
        let disks = storcli_disks(&dump);
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].serial.as_deref(), Some("S3Z8NX0K123456"));
        assert_eq!(disks[0].model.as_deref(), Some("SAMSUNG MZ7LH480HAHQ-00005"));
        assert_eq!(disks[0].fw_version.as_deref(), Some("HXT7404Q"));
        assert_eq!(disks[0].wwn.as_deref(), Some("5002538E40A1B2C3"));
        assert!(disks[0].size_in_gb.is_none());
    }

    #[test]
    fn test_raid_disk_lines() {
        let disks = parse_raid_disks(&lines(
            "Inquiry Data: S3Z8NX0K123456 SAMSUNG MZ7LH480HAHQ-00005 HXT7404Q\n\
             short line\n\
             WD-WX12A3456789 WDC WD4003FZEX 01.01A01\n",
        ));
        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].serial.as_deref(), Some("S3Z8NX0K123456"));
        assert_eq!(disks[0].model.as_deref(), Some("SAMSUNG MZ7LH480HAHQ-00005"));
        assert_eq!(disks[1].model.as_deref(), Some("WDC WD4003FZEX"));
        assert_eq!(disks[1].fw_version.as_deref(), Some("01.01A01"));
    }

    #[test]
    fn test_storcli_preferred_over_text_listing() {
        let source = MemorySource::new()
            .with(sources::STORCLI, STORCLI)
            .with(sources::RAID_DISKS, "AAA model x FW1\nBBB model y FW2\n");
        let mut record = InventoryRecord::default();
        collect_storage_info(&source, &StorageConfig::default(), &mut record).unwrap();
        assert_eq!(record.disks.len(), 1);
    }

    #[test]
    fn test_broken_storcli_is_not_fatal() {
        let source = MemorySource::new().with(sources::STORCLI, "{ truncated");
        let mut record = InventoryRecord::default();
        assert!(collect_storage_info(&source, &StorageConfig::default(), &mut record).is_ok());
        assert!(record.disks.is_empty());
    }

    #[test]
    fn test_size_suffixes() {
        assert_eq!(size_to_gb("1.5G"), Some(1));
        assert_eq!(size_to_gb("2T"), Some(2048));
        assert_eq!(size_to_gb("512M"), Some(0));
        assert_eq!(size_to_gb("1073741824"), Some(1));
        assert_eq!(size_to_gb("huge"), None);
        assert_eq!(size_to_gb(""), None);
    }

    #[test]
    fn test_volume_lines() {
        let volumes = parse_volumes(&lines(
            "NAME SIZE TYPE MOUNTPOINT\n\
             NAME=\"sda1\" SIZE=\"1.5G\" TYPE=\"part\" MOUNTPOINT=\"/boot efi\"\n\
             NAME=\"md0\" SIZE=\"2T\" TYPE=\"raid1\" MOUNTPOINT=\"\"\n\
             NAME=loop0 SIZE=n/a\n",
        ));
        assert_eq!(volumes.len(), 3);
        assert_eq!(volumes[0].attributes["name"], "sda1");
        assert_eq!(volumes[0].attributes["mountpoint"], "/boot efi");
        assert_eq!(volumes[0].size_in_gb, Some(1));
        assert_eq!(volumes[1].size_in_gb, Some(2048));
        assert_eq!(volumes[1].attributes["mountpoint"], "");
        assert_eq!(volumes[2].size_in_gb, None);
    }
}
