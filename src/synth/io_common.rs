use log::{debug, info, warn};

use std::fs;
use std::path::{Path, PathBuf};

use snafu::prelude::*;
use synthesis::{ProductLevel, RawTable};

use crate::synth::*;

/// The two folders of a product level that hold shared tables.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TableKind {
    Agg,
    Data,
}

impl TableKind {
    fn dir(&self) -> &'static str {
        match self {
            TableKind::Agg => "agg",
            TableKind::Data => "data",
        }
    }
}

/// A provider of tables: one file per table, with a header row.
pub trait TableSource {
    fn extension(&self) -> &'static str;

    /// Reads the table at the given path. The path exists.
    fn read_file(&self, path: &Path) -> SynthResult<RawTable>;
}

pub fn source_for(input: InputType) -> Box<dyn TableSource> {
    match input {
        InputType::Csv => Box::new(CsvSource {}),
        InputType::Xlsx => Box::new(XlsxSource {}),
    }
}

pub fn table_path(
    source: &dyn TableSource,
    client_dir: &Path,
    pl: ProductLevel,
    parts: &[&str],
    name: &str,
) -> PathBuf {
    let mut p: PathBuf = client_dir.join(pl.to_string());
    for part in parts {
        p.push(part);
    }
    p.push(format!("{}.{}", name, source.extension()));
    p
}

pub fn read_path(source: &dyn TableSource, path: &Path, pl: ProductLevel) -> SynthResult<RawTable> {
    ensure!(
        path.is_file(),
        MissingTableSnafu {
            path: path.display().to_string(),
            product_level: pl.to_string(),
        }
    );
    info!("Attempting to read table {:?}", path);
    source.read_file(path)
}

/// Reads one of the shared tables of a product level (`<pl>/agg/allmean`, ...).
pub fn read_table(
    source: &dyn TableSource,
    client_dir: &Path,
    pl: ProductLevel,
    kind: TableKind,
    name: &str,
) -> SynthResult<RawTable> {
    let p = table_path(source, client_dir, pl, &[kind.dir()], name);
    read_path(source, &p, pl)
}

/// Reads the percentiles of an entity.
///
/// When the entity has no folder of its own, the first `pct` file found under the
/// product level, then under the client, is used instead.
pub fn read_percentiles(
    source: &dyn TableSource,
    client_dir: &Path,
    pl: ProductLevel,
    entity: &str,
) -> SynthResult<RawTable> {
    let name = "pct";
    let p = table_path(source, client_dir, pl, &[entity, TableKind::Agg.dir()], name);
    if p.is_file() {
        return read_path(source, &p, pl);
    }
    let file_name = format!("{}.{}", name, source.extension());
    let fallback = find_file(&client_dir.join(pl.to_string()), &file_name)
        .or_else(|| find_file(client_dir, &file_name));
    match fallback {
        Some(f) => {
            warn!(
                "read_percentiles: {:?} not found for {}, using {:?}",
                p, pl, f
            );
            read_path(source, &f, pl)
        }
        None => read_path(source, &p, pl),
    }
}

/// Depth-first search of a file by name. Entries are visited in name order.
pub fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();
    for p in entries.iter() {
        if p.is_file() && p.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            return Some(p.clone());
        }
    }
    entries
        .iter()
        .filter(|p| p.is_dir())
        .find_map(|p| find_file(p, file_name))
}

/// The name of the client is the name of its directory.
pub fn client_name(client_dir: &Path) -> SynthResult<String> {
    match client_dir.file_name().and_then(|n| n.to_str()) {
        Some(n) => Ok(n.to_string()),
        None => whatever!("Cannot find a client name in {:?}", client_dir),
    }
}

/// The product levels of a client, in order. Only the folders with a stakeholder
/// group are kept.
pub fn discover_product_levels(client_dir: &Path) -> SynthResult<Vec<ProductLevel>> {
    let entries = fs::read_dir(client_dir).context(ReadingDirSnafu {
        path: client_dir.display().to_string(),
    })?;
    let mut res: Vec<ProductLevel> = Vec::new();
    for e in entries.flatten() {
        if !e.path().is_dir() {
            continue;
        }
        let name = e.file_name().to_string_lossy().to_string();
        match name.parse::<ProductLevel>() {
            Ok(pl) if pl.stakeholder().is_some() => res.push(pl),
            Ok(pl) => debug!("discover_product_levels: skipping {}", pl),
            Err(_) => debug!("discover_product_levels: skipping {:?}", name),
        }
    }
    res.sort();
    Ok(res)
}
