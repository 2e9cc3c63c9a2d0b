use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use log::info;

use rendergirl_bridge::{
    BridgeConfig, EngineGateway, HostScene, PixelGrid, RecordingGateway, RenderGirl, ReportSink,
    Severity,
};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let config = match &options.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };
    init_logging(config.log_filter.as_deref());

    let scene = HostScene::load(&options.scene)
        .with_context(|| format!("failed to load scene {}", options.scene.display()))?;
    println!(
        "Loaded scene with {} objects ({} lamps)",
        scene.objects.len(),
        scene.lamps().count()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.kind.as_tag());
    }

    if options.native {
        render_with(native_gateway()?, &options, &config, &scene)
    } else {
        render_with(RecordingGateway::new(), &options, &config, &scene)
    }
}

#[cfg(feature = "native-engine")]
fn native_gateway() -> Result<rendergirl_bridge::gateway::NativeGateway> {
    Ok(rendergirl_bridge::gateway::NativeGateway::new())
}

#[cfg(not(feature = "native-engine"))]
fn native_gateway() -> Result<RecordingGateway> {
    Err(rendergirl_bridge::BridgeError::EngineFatal(
        "this build does not include the native engine (enable the native-engine feature)"
            .to_string(),
    )
    .into())
}

fn init_logging(filter: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or(filter.unwrap_or("info"));
    env_logger::Builder::from_env(env).init();
}

fn render_with<G: EngineGateway>(
    gateway: G,
    options: &CliOptions,
    config: &BridgeConfig,
    scene: &HostScene,
) -> Result<()> {
    let mut engine = RenderGirl::start(gateway, config.source_path.as_deref())
        .context("failed to start RenderGirl")?;

    if options.list_devices {
        let devices = engine.device_names();
        println!("{} device(s) available", devices.len());
        for device in devices {
            println!(" - {device}");
        }
        return Ok(());
    }

    let (width, height) = frame_size(options, config, scene)?;
    info!("rendering {width}x{height}");
    let mut frame = {
        let mut session = engine.begin_session(Arc::new(ConsoleReport))?;
        session.render_scene(scene, width, height)?
    };
    engine.finish();
    println!("Rendered {}x{} frame", frame.width(), frame.height());

    if let Some(path) = &options.output {
        if config.flip_vertical {
            frame.flip_vertical();
        }
        write_png(&frame, path)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

/// Command line size wins, then the config file, then the scene.
fn frame_size(options: &CliOptions, config: &BridgeConfig, scene: &HostScene) -> Result<(u32, u32)> {
    let resolution = config
        .resolution
        .or(scene.resolution)
        .unwrap_or_default();
    let (width, height) = match (options.width, options.height) {
        (Some(width), Some(height)) => (width, height),
        (None, None) => return resolution.effective(),
        (width, height) => {
            let (base_width, base_height) = resolution.effective()?;
            (width.unwrap_or(base_width), height.unwrap_or(base_height))
        }
    };
    if width == 0 || height == 0 {
        return Err(anyhow!("frame size {width}x{height} is empty"));
    }
    Ok((width, height))
}

fn write_png(frame: &PixelGrid, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.to_rgba8())
        .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width(), frame.height()))?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Report channel of the command line: engine messages printed with their
/// severity tag.
struct ConsoleReport;

impl ReportSink for ConsoleReport {
    fn report(&self, severity: Severity, message: &str) {
        println!("[{severity}] {message}");
    }
}

struct CliOptions {
    scene: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    list_devices: bool,
    native: bool,
}

const USAGE: &str = "Usage: rendergirl-bridge <scene.xml> [--config <file.toml>] [--output <frame.png>] \
[--width <px>] [--height <px>] [--list-devices] [--native]";

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(scene) = args.next() else {
            return Err(anyhow!(USAGE));
        };
        let mut options = Self {
            scene: PathBuf::from(scene),
            config: None,
            output: None,
            width: None,
            height: None,
            list_devices: false,
            native: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--output" => options.output = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--width" => options.width = Some(size(&mut args, &arg)?),
                "--height" => options.height = Some(size(&mut args, &arg)?),
                "--list-devices" => options.list_devices = true,
                "--native" => options.native = true,
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {USAGE}"));
                }
            }
        }
        Ok(options)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("{flag} expects a value"))
}

fn size(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<u32> {
    let raw = value(args, flag)?;
    raw.parse::<u32>()
        .with_context(|| format!("{flag} expects a pixel count, got {raw}"))
}
