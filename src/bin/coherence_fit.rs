use serde::Serialize;
use std::env;
use talbot_wavefront::analyzer::zscan::{fit_stack, measure_frame, AxisCoherence, ZScanFrame};
use talbot_wavefront::config::coherence::{self, CoherenceConfig};
use talbot_wavefront::config::config_path_from_args;
use talbot_wavefront::diagnostics::LogSink;
use talbot_wavefront::fit::{fit_pattern_period, fit_visibility, PatternPeriodFit, VisibilityFit};
use talbot_wavefront::image::io::{load_grayscale_f64, write_json_file};
use talbot_wavefront::Result;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CoherenceReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    period_seed: Option<PatternPeriodFit>,
    fit: VisibilityFit,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StackReport {
    frames: Vec<ZScanFrame>,
    axes: Vec<AxisCoherence>,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "coherence_fit".to_string());
    let config = coherence::load_config(&config_path_from_args(&program, args)?)?;
    if config.uses_images() {
        run_stack(&config)
    } else {
        run_contrast(&config)
    }
}

fn run_contrast(config: &CoherenceConfig) -> Result<()> {
    let mut params = config.fit.clone();
    let period_seed = match &config.period_scan {
        Some(scan) => {
            let seed = fit_pattern_period(&scan.z, &scan.period)?;
            println!(
                "Pattern period seed: p0 = {:.4e} m, source distance = {:.3} m",
                seed.pattern_period, seed.source_distance
            );
            params.pattern_period = seed.pattern_period;
            params.source_distance = seed.source_distance;
            Some(seed)
        }
        None => None,
    };

    let fit = fit_visibility(&config.z, &config.contrast, config.photon_energy, &params)?;
    print_fit("Visibility fit", &fit);

    if let Some(path) = &config.json_out {
        write_json_file(path, &CoherenceReport { period_seed, fit })?;
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn run_stack(config: &CoherenceConfig) -> Result<()> {
    if config.period_scan.is_some() {
        log::warn!("period_scan is ignored with an image stack; periods are measured per frame");
    }
    let mut sink = LogSink;
    let mut frames = Vec::with_capacity(config.images.len());
    for (path, &z) in config.images.iter().zip(&config.z) {
        let image = load_grayscale_f64(path)?;
        let frame = measure_frame(&image, z, &config.stack, &mut sink)?;
        println!(
            "{}: z = {:.4e} m, period {} x {}, visibility {:.4} v / {:.4} h",
            path.display(),
            z,
            frame.harmonic_period.vertical,
            frame.harmonic_period.horizontal,
            frame.visibility.vertical,
            frame.visibility.horizontal
        );
        frames.push(frame);
    }

    let axes = fit_stack(
        &frames,
        config.photon_energy,
        &config.stack,
        &config.fit,
        &mut sink,
    )?;
    for axis in &axes {
        if let Some(seed) = &axis.period_fit {
            println!(
                "{} period fit: p0 = {:.4e} m, source distance = {:.3} m",
                axis.axis, seed.pattern_period, seed.source_distance
            );
        }
        print_fit(&format!("{} visibility fit", axis.axis), &axis.visibility);
    }

    if let Some(path) = &config.json_out {
        write_json_file(path, &StackReport { frames, axes })?;
        println!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn print_fit(title: &str, fit: &VisibilityFit) {
    let p = &fit.params;
    println!("{title} ({} samples, {} iterations)", fit.z.len(), fit.iterations);
    println!("  amplitude       {:.4}", p.amplitude);
    println!("  pattern period  {:.4e} m", p.pattern_period);
    println!("  source distance {:.4} m", p.source_distance);
    println!("  z0              {:.4e} m", p.z0);
    println!("  source size     {:.4e} m", fit.source_size);
    println!("  coherence length {:.4e} m", fit.coherence_length);
    println!("  chi2            {:.4e}", fit.chi2);
}
