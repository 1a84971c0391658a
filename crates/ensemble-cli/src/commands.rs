use crate::cli::RunArgs;
use anyhow::{bail, Context, Result};
use ensemble_core::agent::{AgentConfig, AgentOutcome};
use ensemble_core::capability::CapabilityDescriptor;
use ensemble_core::pipeline::{PipelineDefinition, PipelineOutcome, Preset, Termination, PRESET_NAMES};
use ensemble_core::EnsembleError;

/// A `run` invocation with its goal and agents worked out.
#[derive(Debug)]
pub struct ResolvedRun {
    pub goal: String,
    pub agents: Vec<AgentConfig>,
    /// Set when the agents came from a preset, whose routing must be kept.
    pub preset: Option<Preset>,
}

/// Work out the goal and agents from `--pipeline`, `--preset` and the goal
/// argument. An explicit goal wins over the file's goal or preset example.
pub fn resolve_run(args: &RunArgs) -> Result<ResolvedRun> {
    let explicit_goal = args.goal.clone().filter(|g| !g.trim().is_empty());

    if let Some(ref name) = args.preset {
        let preset = Preset::get(name).with_context(|| {
            format!(
                "unknown preset '{name}' (available: {})",
                PRESET_NAMES.join(", ")
            )
        })?;
        if args.chain && !preset.is_linear() {
            bail!("preset '{name}' routes its agents itself and cannot run with --chain");
        }
        return Ok(ResolvedRun {
            goal: explicit_goal.unwrap_or_else(|| preset.example_goal.to_string()),
            agents: preset.agents.clone(),
            preset: Some(preset),
        });
    }

    if let Some(ref path) = args.pipeline {
        let definition = PipelineDefinition::load(path)
            .with_context(|| format!("failed to load pipeline {}", path.display()))?;
        let Some(goal) = explicit_goal.or(definition.goal) else {
            bail!("no goal given and {} does not set one", path.display());
        };
        return Ok(ResolvedRun {
            goal,
            agents: definition.agents,
            preset: None,
        });
    }

    bail!("pass --pipeline FILE or --preset NAME (available presets: {})", PRESET_NAMES.join(", "))
}

/// One copy of `template` per goal, numbered so names stay unique.
pub fn ask_assignments(template: &AgentConfig, goals: &[String]) -> Vec<(AgentConfig, String)> {
    goals
        .iter()
        .enumerate()
        .map(|(i, goal)| {
            let mut config = template.clone();
            config.name = format!("{} {}", template.name, i + 1);
            (config, goal.clone())
        })
        .collect()
}

pub fn format_answers(goals: &[String], results: &[Result<AgentOutcome, EnsembleError>]) -> String {
    let mut out = String::new();
    for (i, (goal, result)) in goals.iter().zip(results).enumerate() {
        out.push_str(&format!("--- Goal {}: {} ---\n\n", i + 1, goal));
        match result {
            Ok(outcome) => out.push_str(&outcome.answer),
            Err(e) => out.push_str(&format!("[failed: {e}]")),
        }
        out.push_str("\n\n");
    }
    out
}

/// Read a human-gate reply. Empty input or yes continues; anything else stops.
pub fn parse_approval(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "" | "y" | "yes" | "c" | "continue"
    )
}

pub fn format_outcome(outcome: &PipelineOutcome) -> String {
    let mut out = String::new();
    out.push_str("--- Reasoning Steps ---\n\n");
    for line in outcome.step_lines() {
        out.push_str(&line);
        out.push_str("\n\n");
    }
    out.push_str("--- Final Output ---\n\n");
    out.push_str(&outcome.final_answer);
    out.push('\n');
    if outcome.termination != Termination::Completed {
        out.push_str(&format!("\n[run ended: {}]\n", outcome.termination));
    }
    out.push_str("\n--- Workspace ---\n\n");
    match serde_json::to_string_pretty(&outcome.workspace) {
        Ok(json) => out.push_str(&json),
        Err(e) => out.push_str(&format!("<unprintable workspace: {e}>")),
    }
    out.push('\n');
    out
}

pub fn format_tools(descriptors: &[CapabilityDescriptor]) -> String {
    let width = descriptors.iter().map(|d| d.name.len()).max().unwrap_or(0);
    descriptors
        .iter()
        .map(|d| format!("  {:<width$}  {}", d.name, d.description))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_presets(presets: &[Preset]) -> String {
    presets
        .iter()
        .map(|p| {
            let agents: Vec<&str> = p.agents.iter().map(|a| a.name.as_str()).collect();
            format!("  {:<8} {}\n           agents: {}", p.name, p.description, agents.join(" -> "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
