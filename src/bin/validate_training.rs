// SPDX-License-Identifier: AGPL-3.0-only

//! GPU Training Validation
//!
//! Runs the two canonical convergence scenarios end-to-end on the GPU
//! and checks the fitted splats against the targets they were asked to
//! reproduce:
//!
//! 1. Single splat: a red splat at (28, 28) trained against a green
//!    target at (32, 32) on a 64×64 image, 100 iterations.
//! 2. Multi splat: three splats with rotated colors and offset centers
//!    trained against a three-splat target, 200 iterations.
//!
//! Writes `validate_training_{target,final}.ppm` for visual inspection.
//!
//! Exit code 0 = all checks pass, 1 = any failure. If no GPU is
//! available the binary prints SKIP and exits 0 so CPU-only CI stays
//! green.

use splatforge::cpu_reference;
use splatforge::tolerances::{CONVERGED_LOSS_FRACTION, POSITION_MATCH_PX};
use splatforge::validation::ValidationHarness;
use splatforge::{GaussianParam, GpuContext, SplatForgeError, TrainConfig, Trainer};

fn distance_xy(a: &GaussianParam, b: &GaussianParam) -> f32 {
    let dx = a.position[0] - b.position[0];
    let dy = a.position[1] - b.position[1];
    (dx * dx + dy * dy).sqrt()
}

fn three_splat_targets() -> Vec<GaussianParam> {
    vec![
        GaussianParam::new([16.0, 16.0, 0.0], [1.0, 0.0, 0.0]),
        GaussianParam::new([32.0, 32.0, 0.0], [0.0, 1.0, 0.0]),
        GaussianParam::new([48.0, 48.0, 0.0], [0.0, 0.0, 1.0]),
    ]
}

fn three_splat_initial() -> Vec<GaussianParam> {
    // Colors rotated by one, centers nudged a couple of pixels.
    vec![
        GaussianParam::new([18.0, 17.0, 0.0], [0.0, 1.0, 0.0]),
        GaussianParam::new([30.0, 34.0, 0.0], [0.0, 0.0, 1.0]),
        GaussianParam::new([49.0, 46.0, 0.0], [1.0, 0.0, 0.0]),
    ]
}

fn run(gpu: GpuContext, harness: &mut ValidationHarness) -> Result<(), SplatForgeError> {
    // ── Scenario 1: single splat ──
    println!("── Scenario 1: single splat, 64×64, 100 iterations ──");
    let target_splats = vec![GaussianParam::new([32.0, 32.0, 0.0], [0.0, 1.0, 0.0])];
    let target = cpu_reference::render(&target_splats, 64, 64);
    let initial = vec![GaussianParam::new([28.0, 28.0, 0.0], [1.0, 0.0, 0.0])];

    let mut trainer = Trainer::new(gpu, TrainConfig::new(64, 64, 100), initial, &target)?;
    println!("  adapter: {}", trainer.adapter_name());
    let history = trainer.train()?;
    let (first, last) = (history[0], history[history.len() - 1]);
    println!("  loss: {first:.4} → {last:.4}");

    harness.check_upper("single: final loss below initial", f64::from(last), f64::from(first));
    harness.check_upper(
        "single: converged loss fraction",
        f64::from(last / first),
        f64::from(CONVERGED_LOSS_FRACTION),
    );
    let fitted = trainer.params()[0];
    harness.check_bool(
        "single: green channel exceeds red",
        fitted.color[1] > fitted.color[0],
    );
    harness.check_upper(
        "single: center within match radius",
        f64::from(distance_xy(&fitted, &target_splats[0])),
        f64::from(POSITION_MATCH_PX),
    );

    target.save_ppm("validate_training_target.ppm")?;
    trainer.render_current()?.save_ppm("validate_training_final.ppm")?;
    println!("  wrote validate_training_target.ppm, validate_training_final.ppm");
    println!();

    // ── Scenario 2: three splats ──
    println!("── Scenario 2: three splats, 64×64, 200 iterations ──");
    let target_splats = three_splat_targets();
    let target = cpu_reference::render(&target_splats, 64, 64);

    let gpu = GpuContext::new_blocking()?;
    let mut trainer = Trainer::new(
        gpu,
        TrainConfig::new(64, 64, 200),
        three_splat_initial(),
        &target,
    )?;
    let history = trainer.train()?;
    let (first, last) = (history[0], history[history.len() - 1]);
    println!("  loss: {first:.4} → {last:.4}");

    harness.check_upper(
        "multi: converged loss fraction",
        f64::from(last / first),
        f64::from(CONVERGED_LOSS_FRACTION),
    );
    for (i, (fitted, tgt)) in trainer.params().iter().zip(&target_splats).enumerate() {
        harness.check_upper(
            &format!("multi: splat {i} center within match radius"),
            f64::from(distance_xy(fitted, tgt)),
            f64::from(POSITION_MATCH_PX),
        );
    }
    Ok(())
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  GPU Splat Training Validation                               ║");
    println!("║  Render → loss → backward → SGD, end to end on device        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let gpu = match GpuContext::new_blocking() {
        Ok(gpu) => gpu,
        Err(e) => {
            println!("SKIP: {e}");
            GpuContext::print_available_adapters();
            std::process::exit(0);
        }
    };
    gpu.print_info();
    println!();

    let mut harness = ValidationHarness::new("gpu_training");
    if let Err(e) = run(gpu, &mut harness) {
        eprintln!("validation aborted: {e}");
        std::process::exit(1);
    }
    harness.finish();
}
