//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use super::{QueryArgs, Settings};
use crate::api;
use ecalmask_core::{
    ConditionsEpoch, ConditionsPayload, ConditionsStore, EcalGeometry, EcalSubdetector, EpochId,
    MaskError, MaskResolver, MaskSnapshot, RecordKind, SharedMasks, StatusSheet, flag_names,
    payload_blake3, payload_checksum, payload_from_bytes, payload_to_bytes,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum status sheet size (16 MB).
const MAX_SHEET_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum payload file size, matching the decoder's limit.
const MAX_PAYLOAD_FILE_SIZE: u64 = ecalmask_core::MAX_PAYLOAD_SIZE as u64;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), MaskError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| MaskError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(MaskError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, MaskError> {
    let canonical = path.canonicalize().map_err(|e| {
        MaskError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(MaskError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, MaskError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        MaskError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(MaskError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| MaskError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Print a JSON value in pretty form.
fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// LOADING CONDITIONS
// =============================================================================

/// Read and decode a payload file.
pub fn read_payload_file(path: &Path) -> Result<ConditionsPayload, MaskError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_PAYLOAD_FILE_SIZE)?;
    let data = std::fs::read(&validated)
        .map_err(|e| MaskError::IoError(format!("Read payload: {}", e)))?;
    payload_from_bytes(&data)
}

/// Load the conditions selected by `settings`.
///
/// With a run, the conditions path is a store and the epoch containing the
/// run is loaded; otherwise it is a payload file. Without a path nothing is
/// loaded and nothing will be masked.
pub fn load_conditions(settings: &Settings) -> Result<ConditionsPayload, MaskError> {
    let Some(path) = settings.conditions.as_deref() else {
        tracing::warn!("No conditions given, nothing will be masked");
        return Ok(ConditionsPayload::default());
    };

    match settings.run {
        Some(run) => {
            let validated = validate_file_path(path)?;
            let store = ConditionsStore::open(&validated)?;
            let payload = store.epoch_for_run(run)?;
            tracing::info!(run, epoch = payload.epoch.0, "loaded conditions from store");
            Ok(payload)
        }
        None => {
            let payload = read_payload_file(path)?;
            tracing::info!(epoch = payload.epoch.0, path = %path.display(), "loaded conditions payload");
            Ok(payload)
        }
    }
}

/// Load conditions and bind them to a resolver.
pub fn load_resolver(settings: &Settings) -> Result<MaskResolver, MaskError> {
    let epoch = ConditionsEpoch::from(load_conditions(settings)?);
    let mut resolver = MaskResolver::new();
    resolver.init_masking(&epoch, settings.verbose);
    Ok(resolver)
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Which query a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    Channel,
    Tower,
}

fn run_query(settings: &Settings, args: &QueryArgs, kind: QueryKind) -> Result<(), MaskError> {
    let subdet: EcalSubdetector = args.subdet.parse()?;
    let bits = settings.bits(args.bits.as_deref())?;
    let resolver = load_resolver(settings)?;

    let masked = match kind {
        QueryKind::Channel => resolver.mask_channel(args.module, args.ix, args.iy, bits, subdet)?,
        QueryKind::Tower => resolver.mask_tower(args.module, args.ix, args.iy, bits, subdet)?,
    };

    if settings.json_mode {
        print_json(&serde_json::json!({
            "query": if kind == QueryKind::Channel { "channel" } else { "tower" },
            "subdet": subdet,
            "module": args.module,
            "ix": args.ix,
            "iy": args.iy,
            "bits": bits,
            "epoch": resolver.bound_epoch().map(|e| e.0),
            "masked": masked
        }));
        return Ok(());
    }

    println!(
        "{} module {} ({}, {}) bits 0x{:08x}: {}",
        subdet.name(),
        args.module,
        args.ix,
        args.iy,
        bits,
        if masked { "MASKED" } else { "not masked" }
    );
    Ok(())
}

/// Channel mask query.
pub fn cmd_channel(settings: &Settings, args: &QueryArgs) -> Result<(), MaskError> {
    run_query(settings, args, QueryKind::Channel)
}

/// Tower mask query.
pub fn cmd_tower(settings: &Settings, args: &QueryArgs) -> Result<(), MaskError> {
    run_query(settings, args, QueryKind::Tower)
}

// =============================================================================
// SCAN COMMAND
// =============================================================================

/// List masked positions of one module.
pub fn cmd_scan(
    settings: &Settings,
    module: i32,
    bits: Option<&str>,
    subdet: &str,
    limit: Option<usize>,
) -> Result<(), MaskError> {
    let subdet: EcalSubdetector = subdet.parse()?;
    let bits = settings.bits(bits)?;
    let resolver = load_resolver(settings)?;
    let scan = resolver.snapshot().scan_module(module, bits, subdet)?;

    if settings.json_mode {
        print_json(&serde_json::to_value(&scan).unwrap_or_default());
        return Ok(());
    }

    println!("{} module {} (bits 0x{:08x})", subdet.name(), module, bits);
    println!("==========================================");
    println!("Crystals:       {}", scan.crystals);
    println!("Masked:         {}", scan.masked.len());
    println!("  by channel:   {}", scan.channel_masked());
    println!("  by tower:     {}", scan.tower_masked());

    let shown = limit.unwrap_or(scan.masked.len());
    if shown > 0 && !scan.masked.is_empty() {
        println!();
        for position in scan.masked.iter().take(shown) {
            let source = match (position.channel, position.tower) {
                (true, true) => "channel+tower",
                (true, false) => "channel",
                _ => "tower",
            };
            println!("  ({:>3}, {:>3})  {}", position.ix, position.iy, source);
        }
        if scan.masked.len() > shown {
            println!("  ... {} more", scan.masked.len() - shown);
        }
    }
    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Parse a status sheet, choosing the format by file extension.
pub fn parse_sheet(path: &Path, text: &str) -> Result<StatusSheet, MaskError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(text)
            .map_err(|e| MaskError::InvalidSheet(format!("Invalid JSON sheet: {}", e)))
    } else {
        toml::from_str(text)
            .map_err(|e| MaskError::InvalidSheet(format!("Invalid TOML sheet: {}", e)))
    }
}

/// Convert a status sheet into a payload file.
pub fn cmd_import(
    settings: &Settings,
    input: &Path,
    output: &Path,
    epoch: Option<u64>,
) -> Result<(), MaskError> {
    let validated = validate_file_path(input)?;
    validate_file_size(&validated, MAX_SHEET_FILE_SIZE)?;
    let output = validate_output_path(output)?;

    let text = std::fs::read_to_string(&validated)
        .map_err(|e| MaskError::IoError(format!("Read sheet: {}", e)))?;
    let sheet = parse_sheet(&validated, &text)?;
    let entries = sheet.entries.len();

    let payload = sheet.into_payload(epoch.map(EpochId), &EcalGeometry)?;
    let data = payload_to_bytes(&payload)?;
    std::fs::write(&output, &data)
        .map_err(|e| MaskError::IoError(format!("Write payload: {}", e)))?;

    tracing::info!(entries, epoch = payload.epoch.0, "imported status sheet");

    if settings.json_mode {
        print_json(&serde_json::json!({
            "output": output.to_string_lossy(),
            "epoch": payload.epoch.0,
            "sheet_entries": entries,
            "table_entries": payload.entry_count(),
            "checksum": payload_checksum(&payload)
        }));
        return Ok(());
    }

    println!(
        "Imported {} sheet entries into epoch {} ({} table entries, {} bytes)",
        entries,
        payload.epoch,
        payload.entry_count(),
        data.len()
    );
    Ok(())
}

// =============================================================================
// STORE COMMANDS
// =============================================================================

/// Add a payload file to a conditions store.
pub fn cmd_store_put(
    settings: &Settings,
    store: &Path,
    first_run: u64,
    input: &Path,
) -> Result<(), MaskError> {
    let payload = read_payload_file(input)?;
    let mut conditions = ConditionsStore::open(store)?;
    let entries = payload.entry_count();
    conditions.put_epoch(first_run, payload)?;

    if settings.json_mode {
        print_json(&serde_json::json!({
            "store": store.to_string_lossy(),
            "first_run": first_run,
            "entries": entries
        }));
        return Ok(());
    }

    println!(
        "Stored epoch starting at run {} ({} entries) in {:?}",
        first_run, entries, store
    );
    Ok(())
}

/// List the epochs of a conditions store with their run intervals.
pub fn cmd_store_list(settings: &Settings, store: &Path) -> Result<(), MaskError> {
    let validated = validate_file_path(store)?;
    let conditions = ConditionsStore::open(&validated)?;
    let first_runs = conditions.epochs()?;

    let mut rows = Vec::with_capacity(first_runs.len());
    for (i, &first_run) in first_runs.iter().enumerate() {
        let payload = conditions.epoch_for_run(first_run)?;
        let last_run = first_runs.get(i + 1).map(|next| next.saturating_sub(1));
        rows.push((first_run, last_run, payload));
    }

    if settings.json_mode {
        let epochs: Vec<serde_json::Value> = rows
            .iter()
            .map(|(first_run, last_run, payload)| {
                serde_json::json!({
                    "first_run": first_run,
                    "last_run": last_run,
                    "channel_entries": payload.table(RecordKind::ChannelStatus).map(|t| t.len()),
                    "tower_entries": payload.table(RecordKind::TowerStatus).map(|t| t.len()),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "store": store.to_string_lossy(),
            "epochs": epochs
        }));
        return Ok(());
    }

    println!("Conditions store {:?}", store);
    println!("==========================================");
    if rows.is_empty() {
        println!("(no epochs)");
    }
    for (first_run, last_run, payload) in &rows {
        let interval = match last_run {
            Some(last) => format!("{}..={}", first_run, last),
            None => format!("{}..", first_run),
        };
        println!(
            "  runs {:<20} channel: {:<8} tower: {}",
            interval,
            describe_table(payload.table(RecordKind::ChannelStatus).map(|t| t.len())),
            describe_table(payload.table(RecordKind::TowerStatus).map(|t| t.len()))
        );
    }
    Ok(())
}

fn describe_table(entries: Option<usize>) -> String {
    entries.map_or_else(|| "absent".to_string(), |n| n.to_string())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show the loaded conditions.
pub fn cmd_status(settings: &Settings) -> Result<(), MaskError> {
    let payload = load_conditions(settings)?;
    let checksum = payload_checksum(&payload);

    let flag_counts = |kind: RecordKind| -> Vec<(&'static str, usize)> {
        let Some(table) = payload.table(kind) else {
            return Vec::new();
        };
        let mut seen = 0u32;
        for (_, status) in table.iter() {
            seen |= status.bits();
        }
        flag_names(seen)
            .into_iter()
            .filter_map(|name| {
                ecalmask_core::flag_bits(name).map(|bit| (name, table.count_matching(bit)))
            })
            .collect()
    };

    if settings.json_mode {
        let mut records = serde_json::Map::new();
        for kind in RecordKind::ALL {
            let table = payload.table(kind);
            let flags: serde_json::Map<String, serde_json::Value> = flag_counts(kind)
                .into_iter()
                .map(|(name, count)| (name.to_string(), serde_json::json!(count)))
                .collect();
            records.insert(
                kind.name().to_string(),
                serde_json::json!({
                    "present": table.is_some(),
                    "entries": table.map(|t| t.len()),
                    "flags": flags
                }),
            );
        }
        print_json(&serde_json::json!({
            "conditions": settings.conditions.as_ref().map(|p| p.to_string_lossy()),
            "run": settings.run,
            "epoch": payload.epoch.0,
            "records": records,
            "checksum": checksum
        }));
        return Ok(());
    }

    println!("ecalmask Conditions Status");
    println!("==========================");
    match &settings.conditions {
        Some(path) => println!("Conditions: {:?}", path),
        None => println!("Conditions: (none)"),
    }
    if let Some(run) = settings.run {
        println!("Run:        {}", run);
    }
    println!("Epoch:      {}", payload.epoch);
    println!();
    for kind in RecordKind::ALL {
        let table = payload.table(kind);
        println!("{:<15} {}", kind.name(), describe_table(table.map(|t| t.len())));
        for (name, count) in flag_counts(kind) {
            println!("    {:<40} {}", name, count);
        }
    }
    println!();
    println!("Checksum:   {}", checksum);

    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// BLAKE3 digest of the loaded conditions.
pub fn cmd_hash(settings: &Settings) -> Result<(), MaskError> {
    let payload = load_conditions(settings)?;
    let hash = payload_blake3(&payload)?;
    let checksum = payload_checksum(&payload);

    if settings.json_mode {
        print_json(&serde_json::json!({
            "epoch": payload.epoch.0,
            "hash": hash,
            "algorithm": "blake3",
            "checksum": checksum
        }));
        return Ok(());
    }

    println!("BLAKE3: {}", hash);
    println!("Checksum: {}", checksum);
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Reload conditions and republish them if their epoch changed.
///
/// Returns `true` when the served masks were replaced.
pub fn refresh_masks(settings: &Settings, masks: &SharedMasks) -> Result<bool, MaskError> {
    let epoch = ConditionsEpoch::from(load_conditions(settings)?);
    Ok(masks.refresh_from(&epoch, settings.verbose))
}

/// Periodically reload the store behind `masks`.
///
/// The store is reopened on every tick, so `store-put` can write to it
/// between reloads. Failed reloads keep the current masks.
fn spawn_refresh(settings: Settings, masks: Arc<SharedMasks>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let settings = settings.clone();
            let masks = Arc::clone(&masks);
            match tokio::task::spawn_blocking(move || refresh_masks(&settings, &masks)).await {
                Ok(Ok(changed)) => tracing::debug!(changed, "conditions reloaded"),
                Ok(Err(e)) => tracing::warn!(error = %e, "conditions reload failed"),
                Err(e) => tracing::warn!(error = %e, "conditions reload task failed"),
            }
        }
    });
}

/// Start the HTTP server.
pub async fn cmd_serve(
    settings: &Settings,
    host: Option<String>,
    port: Option<u16>,
    refresh: Option<u64>,
) -> Result<(), MaskError> {
    let epoch = ConditionsEpoch::from(load_conditions(settings)?);
    let snapshot = MaskSnapshot::resolve(&epoch, settings.verbose);

    let host = host.unwrap_or_else(|| settings.config.server.host.clone());
    let port = port.unwrap_or(settings.config.server.port);
    let refresh = match (refresh.or(settings.config.server.refresh_secs), settings.run) {
        (Some(0), _) => {
            return Err(MaskError::ConfigError(
                "refresh interval must be at least one second".to_string(),
            ));
        }
        (Some(secs), Some(_)) if settings.conditions.is_some() => Some(secs),
        (Some(_), _) => {
            tracing::warn!("refresh needs a conditions store and --run, serving a fixed epoch");
            None
        }
        (None, _) => None,
    };

    println!("ecalmask HTTP server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    match snapshot.epoch() {
        Some(e) => println!("  Epoch:      {}", e),
        None => println!("  Epoch:      (none)"),
    }
    match refresh {
        Some(secs) => println!("  Refresh:    every {}s", secs),
        None => println!("  Refresh:    off"),
    }
    println!();
    println!("Endpoints:");
    println!("  GET /health       - Health check");
    println!("  GET /status       - Bound conditions");
    println!("  GET /mask/channel - Channel mask query");
    println!("  GET /mask/tower   - Tower mask query");
    println!("  GET /scan         - Masked positions of a module");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = api::AppState::new(snapshot);
    if let Some(secs) = refresh {
        spawn_refresh(
            settings.clone(),
            Arc::clone(&state.masks),
            Duration::from_secs(secs),
        );
    }

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state, &settings.config.server.cors_origins).await
}
