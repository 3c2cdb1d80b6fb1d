use polars::prelude::*;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::domain::BSError;
use crate::fields::{self, FieldValue, PostRef};
use crate::row::{FILTER_POSITION, FILTER_SCHOOL, Row, RowId, SORT_NAME, SORT_NIL, SORT_RANK};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    Csv,
    Parquet,
    Arrow,
    Json,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// One athlete with every CMS field already resolved to plain values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AthleteRecord {
    pub id: u64,
    pub name: String,
    pub position: String,
    pub nil_valuation: f64,
    pub class_year: String,
    pub height: String,
    pub weight: String,
    pub hometown: String,
    pub school: Option<PostRef>,
    pub sponsors: Vec<PostRef>,
    pub rank: usize,
}

impl AthleteRecord {
    pub fn school_name(&self) -> &str {
        self.school.as_ref().map(|s| s.title.as_str()).unwrap_or("")
    }

    pub fn player_info(&self) -> String {
        fields::player_info(&self.class_year, &self.height, &self.weight)
    }

    pub fn sponsor_names(&self) -> Vec<&str> {
        self.sponsors
            .iter()
            .map(|s| s.title.as_str())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn to_row(&self) -> Row {
        Row::new(RowId(self.id))
            .with_search_part(&self.name)
            .with_search_part(&self.position)
            .with_search_part(self.school_name())
            .with_attribute(FILTER_POSITION, &self.position)
            .with_attribute(FILTER_SCHOOL, self.school_name())
            .with_sort_value(SORT_NAME, self.name.as_str())
            .with_sort_value(SORT_NIL, self.nil_valuation)
            .with_sort_value(SORT_RANK, self.rank)
    }
}

#[derive(Debug, Deserialize)]
struct PostTitle {
    #[serde(alias = "ID")]
    id: u64,
    #[serde(alias = "post_title", default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct AthleteEntry {
    #[serde(alias = "ID")]
    id: u64,
    #[serde(alias = "post_title", alias = "name", default)]
    title: String,
    #[serde(default)]
    position: Option<FieldValue>,
    #[serde(default)]
    nil_valuation: Option<FieldValue>,
    #[serde(default)]
    valuation: Option<FieldValue>,
    #[serde(default)]
    class_year: Option<FieldValue>,
    #[serde(default)]
    height: Option<FieldValue>,
    #[serde(default)]
    weight: Option<FieldValue>,
    #[serde(default)]
    hometown: Option<FieldValue>,
    #[serde(default)]
    school: Option<FieldValue>,
    #[serde(default)]
    sponsors: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
struct AthleteExport {
    #[serde(default)]
    posts: Vec<PostTitle>,
    athletes: Vec<AthleteEntry>,
}

impl AthleteEntry {
    fn resolve(self, titles: &HashMap<u64, String>) -> AthleteRecord {
        AthleteRecord {
            id: self.id,
            name: self.title.trim().to_string(),
            position: fields::text_of(&self.position),
            nil_valuation: fields::first_number(&[&self.nil_valuation, &self.valuation]),
            class_year: fields::text_of(&self.class_year),
            height: fields::text_of(&self.height),
            weight: fields::text_of(&self.weight),
            hometown: fields::text_of(&self.hometown),
            school: self.school.as_ref().and_then(|s| s.resolve_post(titles)),
            sponsors: self
                .sponsors
                .as_ref()
                .map(|s| s.resolve_posts(titles))
                .unwrap_or_default(),
            rank: 0,
        }
    }
}

const TABULAR_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "title",
    "position",
    "school",
    "nil_valuation",
    "valuation",
    "class_year",
    "height",
    "weight",
    "hometown",
    "sponsors",
];

pub fn load_athletes(path: PathBuf) -> Result<(FileInfo, Vec<AthleteRecord>), BSError> {
    let file_info = get_file_info(path)?;
    let start_time = Instant::now();
    let records = match file_info.file_type {
        FileType::Csv => records_from_frame(load_csv(&file_info.path)?)?,
        FileType::Parquet => records_from_frame(load_parquet(&file_info.path)?)?,
        FileType::Arrow => records_from_frame(load_arrow(&file_info.path)?)?,
        FileType::Json => load_json(&file_info.path)?,
    };
    let records = rank_by_valuation(ensure_unique_ids(records));

    info!(
        "Loaded {} athletes from {:?} ({} bytes) in {}ms",
        records.len(),
        file_info.path,
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok((file_info, records))
}

/// Missing ids (0) and repeated ids get fresh ids past the largest one in
/// the file. The first record carrying an id keeps it.
pub fn ensure_unique_ids(mut records: Vec<AthleteRecord>) -> Vec<AthleteRecord> {
    let mut next_id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
    let mut seen = HashSet::with_capacity(records.len());
    for record in records.iter_mut() {
        if record.id != 0 && seen.insert(record.id) {
            continue;
        }
        if record.id == 0 {
            debug!("\"{}\" has no id, using {next_id}", record.name);
        } else {
            warn!(
                "Duplicate athlete id {} for \"{}\", using {next_id}",
                record.id, record.name
            );
        }
        record.id = next_id;
        seen.insert(next_id);
        next_id += 1;
    }
    records
}

/// Orders by NIL valuation, highest first, and assigns 1-based ranks.
pub fn rank_by_valuation(mut records: Vec<AthleteRecord>) -> Vec<AthleteRecord> {
    records.sort_by(|a, b| {
        b.nil_valuation
            .partial_cmp(&a.nil_valuation)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (idx, record) in records.iter_mut().enumerate() {
        record.rank = idx + 1;
    }
    records
}

pub fn parse_json_export(content: &str) -> Result<Vec<AthleteRecord>, BSError> {
    let export: AthleteExport = serde_json::from_str(content)?;
    let titles: HashMap<u64, String> = export
        .posts
        .into_iter()
        .map(|p| (p.id, p.title))
        .collect();
    trace!("JSON export with {} post titles", titles.len());
    Ok(export
        .athletes
        .into_iter()
        .map(|a| a.resolve(&titles))
        .collect())
}

fn load_json(path: &Path) -> Result<Vec<AthleteRecord>, BSError> {
    let content = fs::read_to_string(path)?;
    parse_json_export(&content)
}

pub fn records_from_frame(frame: LazyFrame) -> Result<Vec<AthleteRecord>, BSError> {
    let df = frame.collect()?;
    let nrows = df.height();

    // Each column is extracted on its own thread.
    let columns: Result<Vec<(&str, Vec<String>)>, PolarsError> = TABULAR_COLUMNS
        .par_iter()
        .map(|&name| string_column(&df, name).map(|data| (name, data)))
        .collect();
    let columns: HashMap<&str, Vec<String>> = columns?.into_iter().collect();
    let at = |name: &str, row: usize| cell(&columns, name, row);

    let records = (0..nrows)
        .map(|row| {
            let name = match at("name", row) {
                "" => at("title", row),
                name => name,
            };
            let school = at("school", row);
            AthleteRecord {
                id: at("id", row).parse().unwrap_or(0),
                name: name.to_string(),
                position: at("position", row).to_string(),
                nil_valuation: [at("nil_valuation", row), at("valuation", row)]
                    .iter()
                    .map(|v| fields::parse_number(v))
                    .find(|n| *n != 0.0)
                    .unwrap_or(0.0),
                class_year: at("class_year", row).to_string(),
                height: at("height", row).to_string(),
                weight: at("weight", row).to_string(),
                hometown: at("hometown", row).to_string(),
                school: (!school.is_empty()).then(|| PostRef {
                    id: 0,
                    title: school.to_string(),
                }),
                sponsors: at("sponsors", row)
                    .split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| PostRef {
                        id: 0,
                        title: s.to_string(),
                    })
                    .collect(),
                rank: 0,
            }
        })
        .collect::<Vec<_>>();
    debug!("Built {} records from {} columns", records.len(), columns.len());
    Ok(records)
}

fn cell<'a>(columns: &'a HashMap<&str, Vec<String>>, name: &str, row: usize) -> &'a str {
    columns
        .get(name)
        .and_then(|c| c.get(row))
        .map(String::as_str)
        .unwrap_or("")
}

// Absent columns come back as empty strings, one per row.
fn string_column(df: &DataFrame, col_name: &str) -> Result<Vec<String>, PolarsError> {
    let Ok(column) = df.column(col_name) else {
        return Ok(vec![String::new(); df.height()]);
    };
    let col = column.cast(&DataType::String)?;
    let series = col.str()?;
    let mut data = Vec::with_capacity(series.len());
    for value in series.into_iter() {
        data.push(match value {
            Some(s) => s.replace("\r\n", " ").replace('\n', " ").trim().to_string(),
            None => String::new(),
        });
    }
    Ok(data)
}

fn detect_file_type(path: &Path) -> Result<FileType, BSError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
        Some("JSON") => Ok(FileType::Json),
        _ => Err(BSError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, BSError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BSError::FileNotFound,
        ErrorKind::PermissionDenied => BSError::PermissionDenied,
        _ => BSError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(BSError::LoadingFailed("Not a file!".into()));
    }

    let file_size = metadata.len();
    let file_type = detect_file_type(&path)?;

    Ok(FileInfo {
        path,
        file_size,
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
