use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, TimeZone, Utc};
use clap::Parser;

/// Write a synthetic fleet file for the dashboard.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Output file.
    #[arg(default_value = "fleet_anomalies.csv")]
    output: PathBuf,

    /// Seed of the generator.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Engine channels per powercar and their normal operating band.
const CHANNELS: [(&str, f64, f64); 3] = [
    ("RS_E_InAirTemp", 30.0, 8.0),
    ("RS_E_WatTemp", 80.0, 6.0),
    ("RS_T_OilTemp", 75.0, 7.0),
];

/// Readings outside `mean ± FLAG_SIGMAS * sd` are flagged.
const FLAG_SIGMAS: f64 = 2.5;

const VEHICLES: [(&str, &str, f64, f64); 4] = [
    ("181", "Namur", 50.47, 4.87),
    ("182", "Liège", 50.63, 5.57),
    ("183", "Hainaut", 50.45, 3.95),
    ("184", "Luxembourg", 49.68, 5.81),
];

const SAMPLES_PER_VEHICLE: usize = 500;

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

fn header() -> Vec<String> {
    let mut cols: Vec<String> = [
        "mapped_veh_id",
        "timestamps_UTC",
        "lat",
        "lon",
        "province",
        "outside_temp",
        "speed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for pc in ["PC1", "PC2"] {
        cols.extend(CHANNELS.iter().map(|(c, _, _)| format!("{c}_{pc}")));
    }
    for pc in ["PC1", "PC2"] {
        cols.extend(CHANNELS.iter().map(|(c, _, _)| format!("anomaly_{c}_{pc}")));
    }
    cols
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writer.write_record(header())?;

    let start = Utc
        .with_ymd_and_hms(2023, 1, 23, 6, 0, 0)
        .single()
        .context("invalid start time")?;
    let mut rows = 0usize;

    for (v, (veh_id, province, lat0, lon0)) in VEHICLES.iter().enumerate() {
        let (mut lat, mut lon) = (*lat0, *lon0);
        for i in 0..SAMPLES_PER_VEHICLE {
            let ts = start + Duration::minutes((i * 10 + v * 3) as i64);
            lat += rng.gauss(0.0, 0.003);
            lon += rng.gauss(0.0, 0.003);
            let hour = ((i * 10) / 60 % 24) as f64;
            let daily = (hour / 24.0 * std::f64::consts::TAU).sin();
            let outside = 4.0 + 5.0 * daily + rng.gauss(0.0, 0.8);
            let speed = (rng.gauss(60.0, 25.0)).max(0.0);

            let mut values = Vec::new();
            let mut flags = Vec::new();
            for _pc in 0..2 {
                for (_, mean, sd) in CHANNELS {
                    // Roughly one reading in fifty is pushed out of band.
                    let spike = if rng.next_f64() < 0.02 { 4.0 * sd } else { 0.0 };
                    let value = rng.gauss(mean, sd) + spike;
                    let flagged = (value - mean).abs() > FLAG_SIGMAS * sd;
                    values.push(format!("{value:.2}"));
                    flags.push(if flagged { "Yes" } else { "No" }.to_string());
                }
            }

            let mut record = vec![
                veh_id.to_string(),
                ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                format!("{lat:.5}"),
                format!("{lon:.5}"),
                province.to_string(),
                format!("{outside:.1}"),
                format!("{speed:.1}"),
            ];
            record.extend(values);
            record.extend(flags);
            writer.write_record(&record)?;
            rows += 1;
        }
    }
    writer.flush()?;

    println!(
        "Wrote {rows} readings for {} vehicles to {}",
        VEHICLES.len(),
        args.output.display()
    );
    Ok(())
}
