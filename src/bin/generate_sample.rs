use std::f64::consts::PI;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use neutrino_direction::data::model::{Direction, EventRecord, EventTable};
use neutrino_direction::data::writer;

/// Write a synthetic event metadata table for trying out `make-folds`.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[arg(long, default_value = "train_meta.parquet")]
    output: PathBuf,

    /// Number of events to generate.
    #[arg(long, default_value_t = 10_000)]
    events: usize,

    /// Events per storage batch.
    #[arg(long, default_value_t = 2_000)]
    batch_size: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Box-Muller transform for a standard normal draw.
fn gauss(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);

    let mut records = Vec::with_capacity(cli.events);
    let mut pulse_cursor: i64 = 0;
    for i in 0..cli.events {
        // Pulse counts are heavy tailed: log-normal around ~60 pulses.
        let n_pulses = (4.1 + 0.9 * gauss(&mut rng)).exp().round().max(1.0) as i64;
        let direction = Direction::new(rng.gen_range(0.0..2.0 * PI), rng.gen_range(0.0..=PI));

        let batch_id = (i / cli.batch_size.max(1)) as i64 + 1;
        let event_id = 24 + 17 * i as i64;
        records.push(
            EventRecord::new(batch_id, event_id, pulse_cursor, pulse_cursor + n_pulses)
                .with_direction(direction),
        );
        pulse_cursor += n_pulses;
    }

    let table = EventTable::new(records);
    writer::write_file(&table, &cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;

    println!(
        "Wrote {} events ({} pulses) to {}",
        table.len(),
        pulse_cursor,
        cli.output.display()
    );
    Ok(())
}
