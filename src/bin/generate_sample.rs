use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use level_matcher::data::record::{RawGamma, RawLevel};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// The "true" level scheme every dataset observes a part of.
const SCHEME: [(f64, &str); 10] = [
    (0.0, "0+"),
    (845.6, "2+"),
    (1400.2, "4+"),
    (1660.3, "2+"),
    (2085.1, "3-"),
    (2410.7, "(4,5)-"),
    (2598.9, "6+"),
    (2733.0, "2+"),
    (3010.4, "(1,2)+"),
    (3321.8, "5-"),
];

/// How one dataset sees the scheme.
struct Observer {
    code: &'static str,
    detection: f64,
    jitter: f64,
    decimals: usize,
    with_jpi: bool,
    with_intensity: bool,
    spurious: usize,
}

const OBSERVERS: [Observer; 3] = [
    Observer {
        code: "A",
        detection: 1.0,
        jitter: 0.1,
        decimals: 1,
        with_jpi: true,
        with_intensity: true,
        spurious: 0,
    },
    Observer {
        code: "B",
        detection: 0.85,
        jitter: 0.6,
        decimals: 0,
        with_jpi: true,
        with_intensity: true,
        spurious: 1,
    },
    Observer {
        code: "C",
        detection: 0.7,
        jitter: 0.3,
        decimals: 1,
        with_jpi: false,
        with_intensity: false,
        spurious: 2,
    },
];

/// Gamma branches of each level: up to three transitions to lower levels,
/// strongest first, as `(final level, relative intensity)`.
fn decay_branches(rng: &mut SimpleRng) -> Vec<Vec<(usize, f64)>> {
    (0..SCHEME.len())
        .map(|i| {
            let mut branches: Vec<(usize, f64)> = (0..i)
                .rev()
                .take(3)
                .enumerate()
                .map(|(k, f)| (f, if k == 0 { 100.0 } else { 5.0 + 60.0 * rng.next_f64() }))
                .collect();
            branches.sort_by(|a, b| b.1.total_cmp(&a.1));
            branches
        })
        .collect()
}

fn observe(obs: &Observer, branches: &[Vec<(usize, f64)>], rng: &mut SimpleRng) -> Vec<RawLevel> {
    let fmt = |v: f64| format!("{:.*}", obs.decimals, v);
    let mut levels = Vec::new();

    for (i, &(energy, jpi)) in SCHEME.iter().enumerate() {
        if i > 0 && rng.next_f64() > obs.detection {
            continue;
        }
        let gammas = branches[i]
            .iter()
            .map(|&(f, intensity)| {
                let e_gamma = energy - SCHEME[f].0 + rng.gauss(0.0, obs.jitter);
                let intensity = (intensity * rng.gauss(1.0, 0.08)).max(1.0);
                RawGamma {
                    energy: fmt(e_gamma),
                    energy_unc: None,
                    intensity: obs.with_intensity.then(|| format!("{intensity:.0}")),
                    intensity_unc: obs
                        .with_intensity
                        .then(|| format!("{:.0}", (0.1 * intensity).max(1.0))),
                    final_level: None,
                }
            })
            .collect();

        levels.push(RawLevel {
            dataset: Some(obs.code.to_string()),
            energy: fmt(energy + if i == 0 { 0.0 } else { rng.gauss(0.0, obs.jitter) }),
            energy_unc: None,
            jpi: obs.with_jpi.then(|| jpi.to_string()),
            gammas,
        });
    }

    for _ in 0..obs.spurious {
        levels.push(RawLevel {
            dataset: Some(obs.code.to_string()),
            energy: fmt(500.0 + 3000.0 * rng.next_f64()),
            ..RawLevel::default()
        });
    }

    levels.sort_by(|a, b| {
        let ea: f64 = a.energy.parse().unwrap_or(0.0);
        let eb: f64 = b.energy.parse().unwrap_or(0.0);
        ea.total_cmp(&eb)
    });
    levels
}

fn write_parquet(path: &Path, levels: &[RawLevel]) -> Result<()> {
    fn list_column(levels: &[RawLevel], field: impl Fn(&RawGamma) -> Option<&String>) -> ArrayRef {
        let mut builder = ListBuilder::new(Float64Builder::new());
        for level in levels {
            let values = builder.values();
            for g in &level.gammas {
                values.append_option(field(g).and_then(|s| s.parse::<f64>().ok()));
            }
            builder.append(true);
        }
        Arc::new(builder.finish())
    }

    let text_column = |field: fn(&RawLevel) -> Option<&str>| -> ArrayRef {
        Arc::new(StringArray::from(levels.iter().map(field).collect::<Vec<_>>()))
    };

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(Schema::new(vec![
        Field::new("dataset", DataType::Utf8, true),
        Field::new("energy", DataType::Utf8, false),
        Field::new("energy_unc", DataType::Utf8, true),
        Field::new("jpi", DataType::Utf8, true),
        Field::new("gamma_energy", list_type.clone(), false),
        Field::new("gamma_energy_unc", list_type.clone(), false),
        Field::new("gamma_intensity", list_type.clone(), false),
        Field::new("gamma_intensity_unc", list_type, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text_column(|l| l.dataset.as_deref()),
            text_column(|l| Some(l.energy.as_str())),
            text_column(|l| l.energy_unc.as_deref()),
            text_column(|l| l.jpi.as_deref()),
            list_column(levels, |g| Some(&g.energy)),
            list_column(levels, |g| g.energy_unc.as_ref()),
            list_column(levels, |g| g.intensity.as_ref()),
            list_column(levels, |g| g.intensity_unc.as_ref()),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_levels.json"));

    let mut rng = SimpleRng::new(42);
    let branches = decay_branches(&mut rng);
    let levels: Vec<RawLevel> = OBSERVERS
        .iter()
        .flat_map(|obs| observe(obs, &branches, &mut rng))
        .collect();

    let is_parquet = matches!(
        output_path.extension().and_then(|e| e.to_str()),
        Some("parquet" | "pq")
    );
    if is_parquet {
        write_parquet(&output_path, &levels)?;
    } else {
        let json = serde_json::to_string_pretty(&levels).context("serializing levels")?;
        std::fs::write(&output_path, json).context("writing JSON")?;
    }

    println!(
        "Wrote {} levels from {} datasets to {}",
        levels.len(),
        OBSERVERS.len(),
        output_path.display()
    );
    Ok(())
}
