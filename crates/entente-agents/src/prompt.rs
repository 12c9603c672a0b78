//! Prompt template loading and rendering via `minijinja`.
//!
//! The crate ships a built-in template set. Operators can override any of
//! the templates from a directory (`LLM_TEMPLATES_DIR`) to tune behaviour
//! without recompiling; files that are absent keep the built-in version.
//!
//! Both prompts share one context block: standings, the power's own units
//! and legal orders, the full public board, and the visible press history.
//! Only the closing instructions differ.

use std::path::Path;

use entente_types::{ActorView, PhaseType, Power};
use minijinja::Environment;
use serde::Serialize;

use crate::error::AgentError;

/// Template names and their built-in sources.
const BUILTIN_TEMPLATES: [(&str, &str); 4] = [
    ("system.j2", include_str!("../templates/system.j2")),
    ("context.j2", include_str!("../templates/context.j2")),
    ("orders.j2", include_str!("../templates/orders.j2")),
    ("press.j2", include_str!("../templates/press.j2")),
];

/// Supply centres needed to win in the classic scenario.
pub const DEFAULT_VICTORY_CENTERS: usize = 18;

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message naming the power and the goal.
    pub system: String,
    /// User message with the context block and the task instructions.
    pub user: String,
}

/// Manages prompt template loading and rendering.
pub struct PromptEngine {
    env: Environment<'static>,
    victory_centers: usize,
}

impl PromptEngine {
    /// Create a prompt engine with the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, AgentError> {
        let mut env = Environment::new();
        for (name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| AgentError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(Self {
            env,
            victory_centers: DEFAULT_VICTORY_CENTERS,
        })
    }

    /// Create a prompt engine whose templates are overridden by the files
    /// found in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if the directory does not exist, a
    /// file cannot be read, or a template fails to compile.
    pub fn from_dir(dir: &str) -> Result<Self, AgentError> {
        if !Path::new(dir).is_dir() {
            return Err(AgentError::Template(format!(
                "templates directory {dir} does not exist"
            )));
        }
        let mut engine = Self::builtin()?;
        for (name, _) in BUILTIN_TEMPLATES {
            let path = Path::new(dir).join(name);
            if !path.is_file() {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(|e| {
                AgentError::Template(format!("failed to read {}: {e}", path.display()))
            })?;
            engine
                .env
                .add_template_owned(name, source)
                .map_err(|e| AgentError::Template(format!("failed to add {name}: {e}")))?;
        }
        Ok(engine)
    }

    /// Use a different victory threshold in the prompts.
    #[must_use]
    pub const fn with_victory_centers(mut self, victory_centers: usize) -> Self {
        self.victory_centers = victory_centers;
        self
    }

    /// Render the order prompt for `view`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if rendering fails, or
    /// [`AgentError::Serde`] if the board cannot be serialised.
    pub fn render_orders(&self, view: &ActorView) -> Result<RenderedPrompt, AgentError> {
        self.render("orders.j2", view)
    }

    /// Render the press prompt for `view`.
    ///
    /// # Errors
    ///
    /// Same as [`PromptEngine::render_orders`].
    pub fn render_press(&self, view: &ActorView) -> Result<RenderedPrompt, AgentError> {
        self.render("press.j2", view)
    }

    fn render(&self, task: &str, view: &ActorView) -> Result<RenderedPrompt, AgentError> {
        let context = PromptContext::new(view, self.victory_centers)?;
        Ok(RenderedPrompt {
            system: self.render_template("system.j2", &context)?,
            user: self.render_template(task, &context)?,
        })
    }

    fn render_template(&self, name: &str, context: &PromptContext) -> Result<String, AgentError> {
        self.env
            .get_template(name)
            .map_err(|e| AgentError::Template(format!("missing {name}: {e}")))?
            .render(context)
            .map_err(|e| AgentError::Template(format!("{name} render failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Template context
// ---------------------------------------------------------------------------

/// Values exposed to the templates.
#[derive(Debug, Serialize)]
struct PromptContext {
    power: Power,
    phase: String,
    phase_long: String,
    victory_centers: usize,
    standings: Vec<Standing>,
    own_units: Vec<String>,
    own_centers: Vec<String>,
    dislodged: Vec<String>,
    orders_by_location: Vec<LocationOptions>,
    board_json: String,
    press: Vec<String>,
    guidance: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Standing {
    power: Power,
    centers: usize,
    units: usize,
}

#[derive(Debug, Serialize)]
struct LocationOptions {
    location: String,
    options: Vec<String>,
}

impl PromptContext {
    fn new(view: &ActorView, victory_centers: usize) -> Result<Self, AgentError> {
        let standings = view
            .center_counts
            .iter()
            .map(|(power, centers)| Standing {
                power: *power,
                centers: *centers,
                units: view.unit_counts.get(power).copied().unwrap_or(0),
            })
            .collect();
        let orders_by_location = view
            .legal_actions
            .iter()
            .map(|(location, options)| LocationOptions {
                location: location.to_string(),
                options: options.iter().map(ToString::to_string).collect(),
            })
            .collect();
        let press = view
            .press_history
            .iter()
            .map(|m| format!("[{}] {} -> {}: {}", m.phase, m.sender, m.recipient, m.text))
            .collect();

        Ok(Self {
            power: view.power,
            phase: view.phase.to_string(),
            phase_long: view.phase.long_name(),
            victory_centers,
            standings,
            own_units: view
                .own_units
                .iter()
                .map(|(location, unit_type)| format!("{unit_type} {location}"))
                .collect(),
            own_centers: view.own_centers.iter().map(ToString::to_string).collect(),
            dislodged: view.dislodged.iter().map(ToString::to_string).collect(),
            orders_by_location,
            board_json: serde_json::to_string_pretty(&view.board)?,
            press,
            guidance: phase_guidance(view),
        })
    }
}

/// Phase-specific instructions appended to the order prompt.
///
/// Adjustment phases state how many builds or disbands are owed, retreat
/// phases how many dislodged units need an order, and movement phases that
/// unordered units hold.
pub fn phase_guidance(view: &ActorView) -> Vec<String> {
    match view.phase.phase_type {
        PhaseType::Adjustment => {
            let delta = view.adjustment_delta();
            let count = delta.unsigned_abs();
            if delta > 0 {
                vec![format!(
                    "You have {count} build(s). Return an array of exactly {count} DATC build order(s)."
                )]
            } else if delta < 0 {
                vec![format!(
                    "You must remove {count} unit(s). Return an array of exactly {count} DATC disband order(s)."
                )]
            } else {
                Vec::new()
            }
        }
        PhaseType::Movement => vec![
            "Return an array of DATC order(s) for each of *your* units.".to_owned(),
            "Units without orders will hold.".to_owned(),
            "You may support or convoy other powers' units, but first consider your strategic goals."
                .to_owned(),
        ],
        PhaseType::Retreat => {
            let pending = view.legal_actions.location_count();
            if pending == 0 {
                return Vec::new();
            }
            vec![
                format!("You have {pending} dislodged unit(s)."),
                format!("Return an array of exactly {pending} DATC retreat or disband order(s)."),
                "You must submit exactly one order per dislodged unit.".to_owned(),
            ]
        }
    }
}
