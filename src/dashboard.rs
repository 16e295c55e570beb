use crate::{
    compositor::{Composition, Compositor},
    config::Config,
    driver::{registry, Display, PanelCapability, PanelDriver, PanelState},
    render::{ModuleSlot, OutputSource, Presentation, RenderContext},
    renders,
    scheduler::Cycle,
};
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// The module slots of every section and the compositor joining them.
pub struct Modules {
    slots: Vec<ModuleSlot>,
    compositor: Compositor,
    presentation: Presentation,
}

impl Modules {
    pub fn new(slots: Vec<ModuleSlot>, compositor: Compositor, presentation: Presentation) -> Self {
        Self {
            slots,
            compositor,
            presentation,
        }
    }

    /// Builds the slots named in `config` for a panel of `capability`.
    pub fn from_config(config: &Config, capability: PanelCapability) -> Result<Self> {
        let slots = renders::build_slots(config)?;
        let compositor = Compositor::new(config.canvas_size(), config.background_colour, capability);

        Ok(Self::new(slots, compositor, config.presentation()))
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Seeds every slot's fallback with its region of a previous canvas.
    pub fn seed(&mut self, composition: &Composition) {
        for slot in self.slots.iter_mut() {
            let output = self.compositor.extract(composition, slot.region());
            slot.seed_cache(output);
        }

        debug!("Seeded {} sections from the saved canvas", self.slots.len());
    }

    /// Loads the canvas persisted in `dir`, if any, and seeds the slots with it.
    pub fn seed_from_dir(&mut self, dir: &Path, capability: PanelCapability) {
        match Composition::load(dir, self.compositor.canvas_size(), capability) {
            Ok(Some(composition)) => self.seed(&composition),
            Ok(None) => debug!("No saved canvas in {}", dir.display()),
            Err(e) => warn!("Ignoring saved canvas: {e:#}"),
        }
    }

    /// Renders every section and composes the canvas.
    pub fn compose(&mut self, now: NaiveDateTime) -> Composition {
        let context = RenderContext {
            now,
            presentation: &self.presentation,
        };

        let outputs = self
            .slots
            .iter_mut()
            .map(|slot| {
                let (output, source) = slot.produce(&context);
                if source != OutputSource::Fresh {
                    info!("{} section shows a {:?} image", slot.region().name(), source);
                }

                (*slot.region(), output)
            })
            .collect::<Vec<_>>();

        self.compositor.compose(&outputs)
    }
}

/// What a cycle did with the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent,
    Unchanged,
}

/// Renders the dashboard and pushes it to the panel, once per cycle.
pub struct Dashboard {
    modules: Modules,
    display: Display,
    output_dir: PathBuf,
    skip_unchanged: bool,
    calibration_cycles: u32,

    /// Canvas currently shown on the panel
    last_sent: Option<Composition>,
}

impl Dashboard {
    /// Builds the dashboard and the panel driver named in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model = registry::panel_model(&config.panel_model)
            .ok_or_else(|| anyhow!("Unknown panel model {}", config.panel_model))?;
        let panel = model
            .build(config)
            .with_context(|| format!("Could not set up the {} panel", model.name))?;

        Self::with_panel(config, panel)
    }

    /// Builds the dashboard around an already constructed panel.
    pub fn with_panel(config: &Config, panel: Box<dyn PanelDriver>) -> Result<Self> {
        let display = Display::new(panel, config.orientation == 180);
        let mut modules = Modules::from_config(config, display.capability())?;

        modules.seed_from_dir(&config.output_dir, display.capability());

        Ok(Self {
            modules,
            display,
            output_dir: config.output_dir.clone(),
            skip_unchanged: config.skip_unchanged,
            calibration_cycles: config.calibration_cycles,
            last_sent: None,
        })
    }

    pub fn panel_state(&self) -> PanelState {
        self.display.state()
    }

    /// Runs one full cycle: render, compose, push and persist.
    pub fn refresh(&mut self, now: NaiveDateTime, calibrate: bool) -> Result<CycleOutcome> {
        let composition = self.modules.compose(now);

        if self.skip_unchanged && !calibrate && self.last_sent.as_ref() == Some(&composition) {
            info!("Canvas unchanged, panel not refreshed");
            return Ok(CycleOutcome::Unchanged);
        }

        {
            let mut panel = self.display.wake().context("Could not wake the panel")?;

            if calibrate {
                info!("Calibrating the panel");
                panel
                    .calibrate(self.calibration_cycles)
                    .context("Panel calibration failed")?;
            }

            panel
                .send(&composition.black, composition.accent.as_ref())
                .context("Could not send the canvas to the panel")?;
        }

        composition
            .save(&self.output_dir)
            .context("Could not persist the canvas")?;
        self.last_sent = Some(composition);

        info!("Panel refreshed");
        Ok(CycleOutcome::Sent)
    }
}

impl Cycle for Dashboard {
    fn run(&mut self, now: NaiveDateTime, calibrate: bool) -> Result<()> {
        self.refresh(now, calibrate).map(|_| ())
    }
}
