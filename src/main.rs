use spark_engine::config::EngineConfig;
use spark_engine::core::{Engine, EngineResult};

fn main() {
    if let Err(e) = run() {
        eprintln!("Engine failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> EngineResult<()> {
    let mut config = EngineConfig::load_or_default();
    config.apply_env_overrides();
    Engine::init_logging(&config.logging);

    let mut engine = Engine::new(&config)?;
    let ids = engine.spawn_presets(&config.emitters)?;

    // 运行到一半时关闭第一个发射器
    if let Some(&first) = ids.first() {
        let delay = config.simulation.frames as f64 * config.simulation.fixed_delta as f64 * 0.5;
        engine.schedule_emitter(first, delay, |emitter| {
            emitter.set_enabled(false);
            tracing::info!(target: "engine", "Scheduled shutdown of first emitter fired");
        })?;
    }

    engine.run_fixed(config.simulation.frames, config.simulation.fixed_delta)?;

    let stats = engine.stats();
    tracing::info!(
        target: "engine",
        "Finished: {} frame(s), {:.2}s, {} emitter(s), {} particle(s) alive, {} pending call(s)",
        stats.frame,
        stats.elapsed,
        stats.emitters,
        stats.alive_particles,
        stats.pending_calls
    );
    Ok(())
}
