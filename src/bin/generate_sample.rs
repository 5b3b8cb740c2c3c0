use std::path::Path;

use anyhow::{Context, Result};

use rusty_spectra::{Experiment, Measurement, Record, Spectrum};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn generate_signal(
    wavenumbers: &[f64],
    baseline: f64,
    peaks: &[(f64, f64, f64)],
    noise_level: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    wavenumbers
        .iter()
        .map(|&wn| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wn, mu, sigma, amp))
                .sum();
            baseline + signal + rng.gauss(0.0, noise_level)
        })
        .collect()
}

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

fn wavenumber_axis(wavenumbers: &[f64]) -> Record {
    Record::data("wavenumber")
        .with_description("FTIR wavenumber grid")
        .with_units("cm-1")
        .with_values(wavenumbers)
}

fn sensor(name: &str, setpoint: f64, readings: Vec<f64>) -> Record {
    Record::data(name)
        .with_units("C")
        .with_setpoint(setpoint)
        .with_values(readings)
}

fn acquisition(
    source: &str,
    index: usize,
    wavenumbers: &[f64],
    baseline: f64,
    peaks: &[(f64, f64, f64)],
    setpoint: f64,
    rng: &mut SimpleRng,
) -> Result<Spectrum> {
    let signal = Record::data("radiance")
        .with_units("W/(m2 sr cm-1)")
        .with_axis(wavenumber_axis(wavenumbers))
        .with_values(generate_signal(wavenumbers, baseline, peaks, 0.002, rng))
        .with_standard_uncertainty(0.002);

    let surface: Vec<f64> = (0..4).map(|_| setpoint + rng.gauss(0.0, 0.05)).collect();
    let room: Vec<f64> = (0..4).map(|_| 21.0 + rng.gauss(0.0, 0.1)).collect();

    Ok(Spectrum::new(signal)
        .with_context(|| format!("building {source} spectrum {index}"))?
        .with_source_name(source)
        .with_filename(format!("{source}_{index:03}.spa"))
        .with_start_datetime(format!("2022-11-16 10:{:02}:00", index * 2))
        .with_end_datetime(format!("2022-11-16 10:{:02}:30", index * 2))
        .with_scans(64)
        .with_xpm_file("emissivity.xpm")
        .with_polarization("s")
        .with_surface_temperature(sensor("T_surface", setpoint, surface))
        .with_surrounding_temperature(sensor("T_room", 21.0, room))
        .with_angle(
            Record::data("angle")
                .with_units("deg")
                .with_setpoint(11.0)
                .with_values(11.0),
        ))
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    // Wavenumbers: 4000 → 502, step 2
    let wavenumbers: Vec<f64> = (0..1750).map(|i| 4000.0 - i as f64 * 2.0).collect();
    let setpoints = [200.0, 300.0, 400.0];

    let mut measurement = Measurement::new("sapphire")
        .with_start_datetime("2022-11-16 09:55:00")
        .with_end_datetime("2022-11-16 11:00:00");
    measurement.add_parameter(
        Record::parameter("aperture")
            .with_units("mm")
            .with_values(2.0),
    );

    let mut index = 0;
    for (source, baseline) in [("blackbody", 1.0), ("gold", 0.02)] {
        for &setpoint in &setpoints {
            measurement.add_calibration_spectrum(acquisition(
                source, index, &wavenumbers, baseline, &[], setpoint, &mut rng,
            )?);
            index += 1;
        }
    }
    let sapphire_peaks = [(1000.0, 60.0, 0.4), (650.0, 40.0, 0.3)];
    for &setpoint in &setpoints {
        measurement.add_sample_spectrum(acquisition(
            "sapphire", index, &wavenumbers, 0.1, &sapphire_peaks, setpoint, &mut rng,
        )?);
        index += 1;
    }

    let mut experiment = Experiment::new("sapphire")
        .with_description("Directional spectral emissivity of sapphire")
        .with_author("Sample Generator")
        .with_measurement(measurement);

    for &setpoint in &setpoints {
        let scale = setpoint / 400.0;
        let emissivity: Vec<f64> = wavenumbers
            .iter()
            .map(|&wn| {
                let peaks: f64 = sapphire_peaks
                    .iter()
                    .map(|&(mu, sigma, amp)| gaussian(wn, mu, sigma, amp * scale))
                    .sum();
                0.05 + peaks + rng.gauss(0.0, 0.001)
            })
            .collect();
        experiment.add_result(
            Record::result("emissivity")
                .with_description("directional spectral emissivity")
                .with_axis(wavenumber_axis(&wavenumbers))
                .with_axis(Record::data("temperature").with_units("C").with_values(setpoint))
                .with_axis(Record::data("angle").with_units("deg").with_values(11.0))
                .with_values(emissivity),
        );
        experiment.add_result(
            Record::result("total emissivity")
                .with_axis(Record::data("temperature").with_units("C").with_values(setpoint))
                .with_values(0.1 + 0.05 * scale),
        );
    }

    let output_path = Path::new("sample_experiment.json");
    experiment
        .write_json(output_path)
        .context("writing sample experiment")?;

    println!(
        "Wrote {} spectra ({} wavenumbers each) and {} results to {}",
        index,
        wavenumbers.len(),
        experiment.results().len(),
        output_path.display()
    );
    Ok(())
}
