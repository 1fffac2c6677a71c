use clap::Parser;
use std::io::Write;
use std::time::{Duration, Instant};
use twister::audio::ChannelAudioBackend;
use twister::builtin_scenes;
use twister::cli::CliArgs;
use twister::runner::{RunnerCommand, SimulationRunner, TickReport};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = CliArgs::parse();

    if args.list_scenes {
        for (name, _) in builtin_scenes::builders() {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = args.scene_config()?;
    let seed = config.resolved_seed();
    config.seed = Some(seed);

    let Some(init) = builtin_scenes::find(&args.scene) else {
        anyhow::bail!("unknown scene `{}`, try --list-scenes", args.scene);
    };
    log::info!(
        "Loading scene `{}` (seed {}, pool size {}).",
        args.scene,
        seed,
        config.pool_size
    );
    let scene = init(&config, Box::new(ChannelAudioBackend::spawn()))?;

    let clickable: Vec<_> = scene.registry.clickable().collect();
    let (mut runner, commands) = SimulationRunner::new(scene);
    let timestep = Duration::from_secs_f32(config.timestep);
    let stdout = std::io::stdout();
    let mut totals = TickReport::default();
    let started = Instant::now();

    for step in 0..args.steps {
        let tick_start = Instant::now();

        if args.jump_every != 0 && step > 0 && step % args.jump_every == 0 {
            for body in &clickable {
                commands.send(RunnerCommand::Click { body: *body })?;
            }
        }

        let report = runner.tick();
        totals.step_id = report.step_id;
        totals.contacts += report.contacts;
        totals.handlers_invoked += report.handlers_invoked;
        totals.impulses += report.impulses;

        if args.frames_every != 0 && report.step_id % args.frames_every == 0 {
            let frame = runner.scene().pose_frame();
            let mut out = stdout.lock();
            serde_json::to_writer(&mut out, &frame)?;
            writeln!(out)?;
        }

        if args.realtime {
            if let Some(remaining) = timestep.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    log::info!(
        "Ran {} steps in {:.2}s: {} contact changes, {} handler calls, {} impulses.",
        totals.step_id,
        started.elapsed().as_secs_f32(),
        totals.contacts,
        totals.handlers_invoked,
        totals.impulses
    );

    Ok(())
}
