//! rgbcap viewer — entry point.
//!
//! ```text
//! rgbcap-view                     Capture with defaults
//! rgbcap-view --config <path>     Use custom config TOML
//! rgbcap-view --firmware <path>   Override the firmware image
//! rgbcap-view --gen-config        Dump default config and exit
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::JoinHandle;

use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use rgbcap_core::{
    CaptureSession, DeviceCommand, FirmwareImage, FrameMonitor, TimingTuning, UsbVideoDevice,
};

use rgbcap_view::config::ViewerConfig;
use rgbcap_view::display::{blit_frame, surface_height};
use rgbcap_view::input::{translate_key, ViewerAction};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rgbcap-view", about = "Digital RGB capture viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rgbcap-view.toml")]
    config: PathBuf,

    /// Firmware hex image (overrides config).
    #[arg(short, long)]
    firmware: Option<PathBuf>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.gen_config {
        match toml::to_string_pretty(&ViewerConfig::default()) {
            Ok(text) => {
                println!("{text}");
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("failed to render default config: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let config = ViewerConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rgbcap-view v{}", env!("CARGO_PKG_VERSION"));

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Fatal conditions (device absent, firmware load, subsystem
            // init) are reported exactly once, here.
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: ViewerConfig) -> Result<(), Box<dyn std::error::Error>> {
    // ── 1. Device bring-up ──────────────────────────────────────

    let device = UsbVideoDevice::open()?;

    let firmware_path = cli
        .firmware
        .unwrap_or_else(|| PathBuf::from(&config.device.firmware));
    if firmware_path.as_os_str().is_empty() {
        warn!("no firmware image configured; assuming the device is already running");
    } else {
        let text = std::fs::read_to_string(&firmware_path)
            .map_err(|e| format!("cannot read firmware {}: {e}", firmware_path.display()))?;
        let image = FirmwareImage::parse_str(&text)?;
        device.load_firmware(&image)?;
    }

    // ── 2. Capture session ──────────────────────────────────────

    let tuning = Arc::new(TimingTuning::new(
        config.timing.v_back_porch,
        config.timing.h_back_porch,
        config.timing.h_total,
    ));
    let mut session = CaptureSession::new(device, config.session_config());
    session.start()?;

    let width = config.display.width as usize;
    let height = config.display.height as usize;
    let mut monitor = FrameMonitor::new(
        session.reader(),
        Arc::clone(&tuning),
        session.shutdown_flag(),
        width,
        height,
    );
    let mut frame_rx = monitor.frame_receiver();

    let mut monitor_thread: Option<JoinHandle<()>> = Some(
        std::thread::Builder::new()
            .name("frame-decode".into())
            .spawn(move || monitor.run())?,
    );

    // ── 3. Window and surface ───────────────────────────────────

    let surface_h = surface_height(config.display.height, config.display.line_double);
    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title(window_title(config.timing.h_total))
        .with_inner_size(LogicalSize::new(
            config.display.width as f64,
            surface_h as f64,
        ))
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let mut pixels = Pixels::new(config.display.width, surface_h, surface)?;

    let line_double = config.display.line_double;
    let pixel_clock_control = config.device.pixel_clock_control;

    // ── 4. Event loop ───────────────────────────────────────────

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        let mut quit = |session: &mut CaptureSession<UsbVideoDevice>| {
            info!("shutting down");
            if let Err(e) = session.shutdown() {
                warn!("capture teardown: {e}");
            }
            if let Some(handle) = monitor_thread.take() {
                let _ = handle.join();
            }
            elwt.exit();
        };

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => quit(&mut session),

                WindowEvent::Resized(size) => {
                    if let Err(e) = pixels.resize_surface(size.width, size.height) {
                        warn!("surface resize: {e}");
                    }
                }

                WindowEvent::KeyboardInput { event, .. }
                    if event.state == ElementState::Pressed =>
                {
                    let PhysicalKey::Code(code) = event.physical_key else {
                        return;
                    };
                    let Some(action) = translate_key(code) else {
                        return;
                    };
                    match action {
                        ViewerAction::VPorchUp => {
                            info!(v_back_porch = tuning.step_v_back_porch(1), "timing");
                        }
                        ViewerAction::VPorchDown => {
                            info!(v_back_porch = tuning.step_v_back_porch(-1), "timing");
                        }
                        ViewerAction::HPorchUp => {
                            info!(h_back_porch = tuning.step_h_back_porch(1), "timing");
                        }
                        ViewerAction::HPorchDown => {
                            info!(h_back_porch = tuning.step_h_back_porch(-1), "timing");
                        }
                        ViewerAction::ClockUp | ViewerAction::ClockDown => {
                            if !pixel_clock_control {
                                return;
                            }
                            let delta = if action == ViewerAction::ClockUp { 1 } else { -1 };
                            let h_total = tuning.step_h_total(delta);
                            if let Err(e) =
                                session.send_command(DeviceCommand::SetPixelClock { h_total })
                            {
                                warn!("pixel clock command failed: {e}");
                            }
                            window.set_title(&window_title(h_total));
                        }
                        ViewerAction::ResetFifo => {
                            if let Err(e) = session.send_command(DeviceCommand::ResetFifo) {
                                warn!("fifo reset failed: {e}");
                            }
                        }
                        ViewerAction::Quit => quit(&mut session),
                    }
                }

                WindowEvent::RedrawRequested => {
                    {
                        let frame = frame_rx.borrow_and_update();
                        blit_frame(&frame, line_double, pixels.frame_mut());
                    }
                    if let Err(e) = pixels.render() {
                        error!("render failed: {e}");
                        quit(&mut session);
                    }
                }

                _ => {}
            },

            Event::AboutToWait => {
                // Repaint only when the decode thread published a frame.
                if frame_rx.has_changed().unwrap_or(false) {
                    window.request_redraw();
                }
            }

            _ => {}
        }
    })?;

    Ok(())
}

fn window_title(h_total: u16) -> String {
    format!("Digital RGB Display : h_total={h_total}")
}
