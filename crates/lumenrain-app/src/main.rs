use std::rc::Rc;

use glam::Vec2;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lumenrain_core::{EffectHost, EffectsConfig};
use lumenrain_platform::headless::{
    HeadlessScheduler, HeadlessViewport, MemoryContainer, RecordingSurface,
};
use lumenrain_platform::ViewportSize;

struct Scenario {
    name: &'static str,
    width: f32,
    resized_width: f32,
    user_agent: &'static str,
}

const SCENARIOS: [Scenario; 2] = [
    Scenario {
        name: "desktop",
        width: 1536.0,
        resized_width: 1024.0,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36",
    },
    Scenario {
        name: "phone",
        width: 767.0,
        resized_width: 390.0,
        user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) Mobile/15E148",
    },
];

fn run_scenario(config: &EffectsConfig, scenario: &Scenario) -> Result<(), String> {
    let scheduler = Rc::new(HeadlessScheduler::new());
    let viewport = HeadlessViewport::new(
        ViewportSize::new(scenario.width, 900.0),
        Some(scenario.user_agent),
    );
    let container = MemoryContainer::new(scenario.width);
    let falling = RecordingSurface::new(Vec2::new(240.0, 240.0));
    let orbit = RecordingSurface::new(Vec2::new(320.0, 320.0));

    let mut host = EffectHost::new(config.clone(), scheduler.clone(), Rc::new(viewport.clone()));
    host.add_rain(Box::new(container.clone()));
    host.add_falling_logo(Some(Box::new(falling.clone())));
    host.add_orbit_logo(Some(Box::new(orbit.clone())));
    host.mount().map_err(|e| e.to_string())?;

    let callbacks = scheduler.run_frames(120);
    info!(
        scenario = scenario.name,
        tier = ?host.capability().tier(),
        columns = container.columns().len(),
        callbacks,
        "mounted"
    );

    container.set_width(scenario.resized_width);
    for _ in 0..8 {
        viewport.resize(ViewportSize::new(scenario.resized_width, 900.0));
        scheduler.advance(10.0);
    }
    scheduler.advance(config.resize_debounce().as_secs_f64() * 1000.0 + 50.0);
    scheduler.run_frames(60);
    info!(
        scenario = scenario.name,
        tier = ?host.capability().tier(),
        columns = container.columns().len(),
        appended = container.appended_total(),
        falling_frames = falling.frames_drawn(),
        orbit_frames = orbit.frames_drawn(),
        "after resize burst"
    );

    host.unmount();
    let leaked = scheduler.live_handles() + viewport.listener_count();
    info!(
        scenario = scenario.name,
        cancelled = scheduler.cancel_count(),
        leaked,
        "unmounted"
    );
    if leaked > 0 {
        return Err(format!("{}: {leaked} handles outlived unmount", scenario.name));
    }
    Ok(())
}

fn main() {
    // Init logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let config = match std::env::args().nth(1) {
        Some(path) => match EffectsConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Lumenrain config error ({path}): {e}");
                std::process::exit(2);
            }
        },
        None => EffectsConfig::default(),
    };

    info!("Lumenrain preview starting");
    let mut failed = false;
    for scenario in &SCENARIOS {
        if let Err(e) = run_scenario(&config, scenario) {
            warn!("{e}");
            failed = true;
        }
    }
    if failed {
        eprintln!("Lumenrain preview failed");
        std::process::exit(1);
    }
}
