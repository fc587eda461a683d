use std::env;
use std::path::Path;
use talbot_wavefront::config::{config_path_from_args, sgt};
use talbot_wavefront::image::io::{load_grayscale_f64, save_grayscale_f64, write_json_file};
use talbot_wavefront::image::{subtract_dark, ImageF64};
use talbot_wavefront::{AnalysisReport, Result, TalbotAnalyzer};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "sgt_analysis".to_string());
    let config = sgt::load_config(&config_path_from_args(&program, args)?)?;

    let mut sample = load_grayscale_f64(&config.input.sample)?;
    let mut reference = config
        .input
        .reference
        .as_deref()
        .map(load_grayscale_f64)
        .transpose()?;

    let dark = config
        .input
        .dark
        .as_deref()
        .map(load_grayscale_f64)
        .transpose()?;
    subtract_dark(
        &mut sample,
        reference.as_mut(),
        dark.as_ref(),
        config.input.dark_corner,
    )?;

    let mut params = config.params.clone();
    if let Some([r0, r1, c0, c1]) = config.crop {
        let full = sample.shape();
        let period = params
            .harmonics
            .period
            .unwrap_or_else(|| params.experiment.harmonic_period(full.0, full.1));
        sample = sample.crop(r0, r1, c0, c1)?;
        reference = reference
            .map(|r| r.crop(r0, r1, c0, c1))
            .transpose()?;
        params.harmonics.period = Some(period.rescaled(full, sample.shape()));
    }

    let analyzer = TalbotAnalyzer::new(params);
    let report = analyzer.process_with_diagnostics(&sample, reference.as_ref())?;
    print_text_summary(&report);

    if let Some(path) = &config.output.json_out {
        write_json_file(path, &report)?;
        println!("\nJSON report written to {}", path.display());
    }
    if let Some(dir) = &config.output.image_dir {
        save_maps(dir, &report)?;
        println!("Maps written to {}", dir.display());
    }
    Ok(())
}

fn print_text_summary(report: &AnalysisReport) {
    println!("Analysis summary");
    for line in report.summary.to_text().lines() {
        println!("  {line}");
    }
    println!("Timings (ms)");
    for stage in &report.timings.stages {
        println!("  {:<12} {:>9.3}", stage.label, stage.elapsed_ms);
    }
    println!("  {:<12} {:>9.3}", "total", report.timings.total_ms);
}

fn save_maps(dir: &Path, report: &AnalysisReport) -> Result<()> {
    let result = &report.result;
    let obs = &result.observables;
    let maps: [(&str, &ImageF64); 7] = [
        ("int00", &obs.int00),
        ("dark_field01", &obs.dark_field01),
        ("dark_field10", &obs.dark_field10),
        ("phase01", &obs.phase01),
        ("phase10", &obs.phase10),
        ("dpc01", &result.dpc.dpc01),
        ("dpc10", &result.dpc.dpc10),
    ];
    for (name, map) in maps {
        save_grayscale_f64(map, &dir.join(format!("{name}.png")))?;
    }
    if let Some(phase) = &result.phase {
        save_grayscale_f64(phase, &dir.join("integrated_phase.png"))?;
    }
    Ok(())
}
