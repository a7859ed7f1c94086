//! Producer runner
//!
//! Loads a WebAssembly producer, links the audio imports, calls its start
//! export once and its frame export on a fixed interval. Host events come from
//! stdin, one command per line:
//!
//! ```text
//! hide | show | touchstart | touchend | click | mousedown | quit
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wab_common::config::HostConfig;
use wab_common::time::millis_to_duration;
use wab_common::{EventHub, GestureKind, VisibilityState};
use wasmtime::{Engine, Linker, Module, Store, TypedFunc};

use super::imports::add_to_linker;
use crate::bridge::AudioBridge;

/// Store data for a producer instance
pub struct HostState {
    pub bridge: AudioBridge,
}

fn bridge_of(state: &mut HostState) -> &mut AudioBridge {
    &mut state.bridge
}

/// One line of the stdin control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Hide,
    Show,
    Gesture(GestureKind),
    Quit,
}

impl FromStr for ControlCommand {
    type Err = wab_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hide" => Ok(ControlCommand::Hide),
            "show" => Ok(ControlCommand::Show),
            "touchstart" => Ok(ControlCommand::Gesture(GestureKind::TouchStart)),
            "touchend" => Ok(ControlCommand::Gesture(GestureKind::TouchEnd)),
            "click" | "mousedown" => Ok(ControlCommand::Gesture(GestureKind::MouseDown)),
            "quit" | "exit" => Ok(ControlCommand::Quit),
            other => Err(wab_common::Error::InvalidInput(format!(
                "unknown control command '{}'",
                other
            ))),
        }
    }
}

enum LoopEvent {
    Shutdown,
    Tick,
    Line(Option<String>),
}

pub struct Runner {
    store: Store<HostState>,
    hub: Arc<EventHub>,
    start: Option<TypedFunc<(), ()>>,
    frame: Option<TypedFunc<(), ()>>,
    config: HostConfig,
    started: bool,
}

impl Runner {
    /// Instantiate `module` with the audio imports linked.
    ///
    /// Imports other than `env.audio_*` are satisfied with trapping stubs, so
    /// a producer only fails if it actually calls one.
    pub fn new(
        engine: &Engine,
        module: &Module,
        bridge: AudioBridge,
        hub: Arc<EventHub>,
        config: HostConfig,
    ) -> anyhow::Result<Self> {
        let mut linker = Linker::<HostState>::new(engine);
        add_to_linker(&mut linker, bridge_of)?;
        linker
            .define_unknown_imports_as_traps(module)
            .context("Failed to stub unknown imports")?;

        let mut store = Store::new(engine, HostState { bridge });
        let instance = linker
            .instantiate(&mut store, module)
            .context("Failed to instantiate producer module")?;

        let mut lookup = |name: &str| -> anyhow::Result<Option<TypedFunc<(), ()>>> {
            match instance.get_func(&mut store, name) {
                Some(func) => Ok(Some(
                    func.typed::<(), ()>(&store)
                        .with_context(|| format!("Export '{}' must have type () -> ()", name))?,
                )),
                None => {
                    debug!("Producer has no '{}' export", name);
                    Ok(None)
                }
            }
        };
        let start = lookup(&config.start_export)?;
        let frame = lookup(&config.frame_export)?;

        Ok(Self {
            store,
            hub,
            start,
            frame,
            config,
            started: false,
        })
    }

    /// Compile the module at `path` (binary `.wasm` or text `.wat`) and instantiate it
    pub fn from_file(
        path: &Path,
        bridge: AudioBridge,
        hub: Arc<EventHub>,
        config: HostConfig,
    ) -> anyhow::Result<Self> {
        let engine = Engine::default();
        let module = Module::from_file(&engine, path)
            .with_context(|| format!("Failed to load producer module {}", path.display()))?;
        info!("Loaded producer module {}", path.display());
        Self::new(&engine, &module, bridge, hub, config)
    }

    /// Call the start export. Later calls do nothing.
    pub fn start(&mut self) -> anyhow::Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if let Some(start) = &self.start {
            start
                .call(&mut self.store, ())
                .with_context(|| format!("Producer '{}' trapped", self.config.start_export))?;
        }
        Ok(())
    }

    /// Call the frame export once. Returns false if the producer has none.
    pub fn tick(&mut self) -> anyhow::Result<bool> {
        let Some(frame) = &self.frame else {
            return Ok(false);
        };
        frame
            .call(&mut self.store, ())
            .with_context(|| format!("Producer '{}' trapped", self.config.frame_export))?;
        Ok(true)
    }

    /// Apply a control command. Returns false on `quit`.
    pub fn handle_command(&self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Hide => {
                self.hub.emit_visibility(VisibilityState::Hidden);
            }
            ControlCommand::Show => {
                self.hub.emit_visibility(VisibilityState::Visible);
            }
            ControlCommand::Gesture(kind) => {
                self.hub.emit_gesture(kind);
            }
            ControlCommand::Quit => return false,
        }
        true
    }

    pub fn bridge(&self) -> &AudioBridge {
        &self.store.data().bridge
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }

    /// Run until `quit`, Ctrl+C / SIGTERM, or a producer trap.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.start()?;

        let interval = millis_to_duration(self.config.frame_interval_ms.max(1));
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut commands = if self.config.control_stdin {
            Some(spawn_stdin_reader())
        } else {
            None
        };

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        info!(
            interval_ms = self.config.frame_interval_ms,
            control_stdin = self.config.control_stdin,
            "Producer running"
        );

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => LoopEvent::Shutdown,
                _ = ticker.tick() => LoopEvent::Tick,
                line = next_line(&mut commands) => LoopEvent::Line(line),
            };

            match event {
                LoopEvent::Shutdown => break,
                LoopEvent::Tick => {
                    if !self.tick()? && commands.is_none() {
                        info!("Producer has no frame export and no control input, stopping");
                        break;
                    }
                }
                LoopEvent::Line(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<ControlCommand>() {
                        Ok(command) => {
                            debug!(?command, "Control command");
                            if !self.handle_command(command) {
                                info!("Quit requested");
                                break;
                            }
                        }
                        Err(e) => warn!("{}", e),
                    }
                }
                LoopEvent::Line(None) => {
                    debug!("Control input closed");
                    commands = None;
                }
            }
        }

        info!("Producer stopped");
        Ok(())
    }
}

async fn next_line(commands: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read stdin on a plain thread; blocking stdin reads would otherwise hold up
/// runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("wab-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start control input thread: {}", e);
    }
    rx
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
