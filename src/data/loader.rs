use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, LargeListArray,
    ListArray, StringArray,
};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::LevelDataset;
use super::record::{RawGamma, RawLevel, group_into_datasets};
use crate::config::GammaConfig;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load raw level records from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per level, gamma columns as lists
/// * `.json`    – `[{ "dataset": "A", "energy": "1400.5", "gammas": [...] }, ...]`
/// * `.csv`     – one row per level, gamma columns semicolon-separated
pub fn load_file(path: &Path) -> Result<Vec<RawLevel>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Load a file and normalize its records into datasets.
///
/// Records without a dataset code are filed under the file stem.
pub fn load_datasets(path: &Path, gamma: &GammaConfig) -> Result<Vec<LevelDataset>> {
    let records = load_file(path).with_context(|| format!("loading {}", path.display()))?;
    let default_code = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset");
    let datasets = group_into_datasets(records, default_code, gamma)
        .with_context(|| format!("normalizing records of {}", path.display()))?;

    for ds in &datasets {
        log::info!("Loaded dataset {} with {} levels", ds.code, ds.len());
    }
    Ok(datasets)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   {
///     "dataset": "A",
///     "energy": "1400.5",
///     "energy_unc": "0.3",
///     "jpi": "(2)+",
///     "gammas": [
///       { "energy": "1400.3", "energy_unc": null, "intensity": "100", "intensity_unc": "5" }
///     ]
///   },
///   ...
/// ]
/// ```
///
/// Numbers may be given as JSON numbers, but strings keep trailing zeros
/// and therefore the implied precision.
fn load_json(path: &Path) -> Result<Vec<RawLevel>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut levels = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let energy = json_text(obj.get("energy"))
            .with_context(|| format!("Row {i}: missing or invalid 'energy'"))?;

        let gammas = match obj.get("gammas") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(j, g)| json_gamma(g).with_context(|| format!("Row {i}, gammas[{j}]")))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => bail!("Row {i}: 'gammas' is not an array"),
        };

        levels.push(RawLevel {
            dataset: json_text(obj.get("dataset")),
            energy,
            energy_unc: json_text(obj.get("energy_unc")),
            jpi: json_text(obj.get("jpi")),
            gammas,
        });
    }

    Ok(levels)
}

fn json_gamma(val: &JsonValue) -> Result<RawGamma> {
    let obj = val.as_object().context("not a JSON object")?;
    Ok(RawGamma {
        energy: json_text(obj.get("energy")).context("missing or invalid 'energy'")?,
        energy_unc: json_text(obj.get("energy_unc")),
        intensity: json_text(obj.get("intensity")),
        intensity_unc: json_text(obj.get("intensity_unc")),
        final_level: obj
            .get("final_level")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize),
    })
}

/// Strings pass through; numbers are rendered back to text.
fn json_text(val: Option<&JsonValue>) -> Option<String> {
    match val? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one level per row.
/// Required: `energy`.  Optional: `dataset`, `energy_unc`, `jpi`, and the
/// gamma columns `gamma_energy`, `gamma_energy_unc`, `gamma_intensity`,
/// `gamma_intensity_unc`, each holding semicolon-separated values:
///   `"1400.3;600.1"`, `"100;;"` (empty token = not reported)
fn load_csv(path: &Path) -> Result<Vec<RawLevel>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let col = |name: &str| headers.iter().position(|h| h == name);
    let energy_idx = col("energy").context("CSV missing 'energy' column")?;
    let dataset_idx = col("dataset");
    let energy_unc_idx = col("energy_unc");
    let jpi_idx = col("jpi");
    let gamma_cols = [
        col("gamma_energy"),
        col("gamma_energy_unc"),
        col("gamma_intensity"),
        col("gamma_intensity_unc"),
    ];

    let mut levels = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let energy = cell(Some(energy_idx))
            .with_context(|| format!("CSV row {row_no}: empty 'energy'"))?;

        let lists: Vec<Vec<Option<String>>> = gamma_cols
            .iter()
            .map(|&idx| split_semicolon(cell(idx).as_deref().unwrap_or("")))
            .collect();
        let gammas = zip_gamma_lists(&lists, row_no)?;

        levels.push(RawLevel {
            dataset: cell(dataset_idx),
            energy,
            energy_unc: cell(energy_unc_idx),
            jpi: cell(jpi_idx),
            gammas,
        });
    }

    Ok(levels)
}

fn split_semicolon(s: &str) -> Vec<Option<String>> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    s.split(';')
        .map(|tok| {
            let tok = tok.trim();
            (!tok.is_empty()).then(|| tok.to_string())
        })
        .collect()
}

/// Combine column-wise gamma lists `[energy, energy_unc, intensity, intensity_unc]`.
/// Companion lists must be empty or as long as the energy list.
fn zip_gamma_lists(lists: &[Vec<Option<String>>], row: usize) -> Result<Vec<RawGamma>> {
    let energies = &lists[0];
    for (name, list) in ["gamma_energy_unc", "gamma_intensity", "gamma_intensity_unc"]
        .iter()
        .zip(&lists[1..])
    {
        if !list.is_empty() && list.len() != energies.len() {
            bail!(
                "Row {row}: gamma_energy has {} values but {name} has {}",
                energies.len(),
                list.len()
            );
        }
    }

    let at = |list: &Vec<Option<String>>, j: usize| list.get(j).cloned().flatten();

    energies
        .iter()
        .enumerate()
        .map(|(j, e)| {
            let energy = e
                .clone()
                .with_context(|| format!("Row {row}, gamma_energy[{j}] is empty"))?;
            Ok(RawGamma {
                energy,
                energy_unc: at(&lists[1], j),
                intensity: at(&lists[2], j),
                intensity_unc: at(&lists[3], j),
                final_level: None,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of level records.
///
/// Expected schema:
/// - `energy`: Utf8 (preferred, keeps precision) or a numeric column
/// - `dataset`, `jpi`: Utf8, optional
/// - `energy_unc`: numeric or Utf8, optional
/// - `gamma_energy`, `gamma_energy_unc`, `gamma_intensity`, `gamma_intensity_unc`:
///   List<Float64> or LargeList<Float64> with nullable items, optional
///
/// Numeric energies are rendered with their shortest round-trip text before
/// precision is inferred from them.
fn load_parquet(path: &Path) -> Result<Vec<RawLevel>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut levels = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let energy_col = column(&batch, "energy")
            .ok_or_else(|| anyhow::anyhow!("Parquet file missing 'energy' column"))?;

        for row in 0..batch.num_rows() {
            let energy = extract_text(energy_col, row)
                .with_context(|| format!("Row {row}: null 'energy'"))?;

            let gammas = parquet_gammas(&batch, row)
                .with_context(|| format!("Row {row}: failed to read gamma lists"))?;

            levels.push(RawLevel {
                dataset: column(&batch, "dataset").and_then(|c| extract_text(c, row)),
                energy,
                energy_unc: column(&batch, "energy_unc").and_then(|c| extract_text(c, row)),
                jpi: column(&batch, "jpi").and_then(|c| extract_text(c, row)),
                gammas,
            });
        }
    }

    Ok(levels)
}

fn parquet_gammas(batch: &RecordBatch, row: usize) -> Result<Vec<RawGamma>> {
    let names = ["gamma_energy", "gamma_energy_unc", "gamma_intensity", "gamma_intensity_unc"];
    let mut lists: Vec<Vec<Option<String>>> = Vec::with_capacity(names.len());
    for name in names {
        let list = match column(batch, name) {
            Some(col) => extract_f64_list(col, row)
                .with_context(|| format!("column '{name}'"))?
                .into_iter()
                .map(|v| v.map(|v| v.to_string()))
                .collect(),
            None => Vec::new(),
        };
        lists.push(list);
    }
    zip_gamma_lists(&lists, row)
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Arc<dyn Array>> {
    batch.schema().index_of(name).ok().map(|i| batch.column(i))
}

/// Extract a `Vec<Option<f64>>` from a List or LargeList column at the given
/// row. A null list is an empty one.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<Option<f64>>> {
    if col.is_null(row) {
        return Ok(Vec::new());
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    // The inner array can be Float64 or Float32
    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.map(f64::from)).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a scalar cell as text. Null and unsupported types give `None`.
fn extract_text(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Utf8 => col
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|s| s.value(row).to_string()),
        DataType::LargeUtf8 => Some(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row).to_string()),
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row).to_string()),
        other => {
            log::warn!("ignoring cell of unsupported type {other:?}");
            None
        }
    }
}
