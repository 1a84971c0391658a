use crate::cli::{Cli, Command, RunArgs};
use crate::commands::{
    ask_assignments, format_answers, format_outcome, format_presets, format_tools, parse_approval,
    resolve_run,
};
use anyhow::{Context, Result};
use ensemble_core::agent::AgentEvent;
use ensemble_core::capability::{builtin_registry, CapabilityRegistry};
use ensemble_core::pipeline::{
    fan_out, single_agent, HumanGateFn, MessageChain, Pipeline, PipelineOutcome, Preset,
};
use ensemble_core::Workspace;
use ensemble_core::{LlmClient, Settings};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = match cli.config {
        Some(ref path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => Settings::load(),
    };
    cli.apply_overrides(&mut settings)?;

    match cli.command {
        Command::Run(ref args) => run_pipeline(&settings, args).await,
        Command::Ask { ref goals, json } => match goals.as_slice() {
            [goal] => run_single_agent(&settings, goal, json).await,
            _ => run_many_agents(&settings, goals, json).await,
        },
        Command::Tools { json } => list_tools(&settings, json),
        Command::Presets => {
            println!("{}", format_presets(&Preset::all()));
            Ok(())
        }
    }
}

async fn run_pipeline(settings: &Settings, args: &RunArgs) -> Result<()> {
    let resolved = resolve_run(args)?;
    let llm = settings.build_llm_client()?;
    let registry = Arc::new(builtin_registry(&settings.tools, llm.clone())?);
    let (event_tx, printer) = spawn_event_printer();

    let outcome = if args.chain {
        let chain = MessageChain::new(resolved.agents, llm, registry)?
            .with_max_iterations(settings.pipeline.max_iterations)
            .with_agent_events(event_tx);
        chain.run(&resolved.goal).await
    } else {
        let mut pipeline = match resolved.preset {
            Some(preset) => preset.into_pipeline(llm, registry)?,
            None => Pipeline::new(resolved.agents, llm, registry)?,
        }
        .with_settings(&settings.pipeline)
        .with_agent_events(event_tx);
        if args.approve {
            pipeline = pipeline.with_human_gate(stdin_gate());
        }
        pipeline.run(&resolved.goal).await
    };

    let _ = printer.await;
    print_outcome(&outcome?, args.json)
}

async fn run_single_agent(settings: &Settings, goal: &str, json: bool) -> Result<()> {
    let llm = settings.build_llm_client()?;
    let registry = Arc::new(builtin_registry(&settings.tools, llm.clone())?);
    let (event_tx, printer) = spawn_event_printer();

    let pipeline = Pipeline::new(vec![single_agent(&registry)], llm, registry)?
        .with_agent_events(event_tx);
    let outcome = pipeline.run(goal).await;
    drop(pipeline);

    let _ = printer.await;
    print_outcome(&outcome?, json)
}

/// One single-agent run per goal, `pipeline.max_parallel` at a time, over a
/// shared workspace.
async fn run_many_agents(settings: &Settings, goals: &[String], json: bool) -> Result<()> {
    let llm = settings.build_llm_client()?;
    let registry = Arc::new(builtin_registry(&settings.tools, llm.clone())?);
    let assignments = ask_assignments(&single_agent(&registry), goals);

    let results = fan_out(
        assignments,
        llm,
        registry,
        Arc::new(Workspace::new()),
        settings.pipeline.max_parallel,
    )
    .await?;

    if json {
        let entries: Vec<serde_json::Value> = goals
            .iter()
            .zip(&results)
            .map(|(goal, result)| match result {
                Ok(outcome) => serde_json::json!({
                    "goal": goal,
                    "answer": outcome.answer,
                    "completed": outcome.completed,
                    "steps": outcome.steps,
                }),
                Err(e) => serde_json::json!({ "goal": goal, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", format_answers(goals, &results));
    }
    Ok(())
}

fn list_tools(settings: &Settings, json: bool) -> Result<()> {
    // Listing never calls the model, so any configured backend will do.
    let llm: Arc<dyn LlmClient> = match settings.build_llm_client() {
        Ok(llm) => llm,
        Err(_) => Arc::new(ensemble_core::llm::OpenAIClient::local(
            settings.llm.provider.default_base_url(),
        )),
    };
    let registry: CapabilityRegistry = builtin_registry(&settings.tools, llm)?;
    let descriptors = registry.descriptors();
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
    } else {
        println!("{}", format_tools(&descriptors));
    }
    Ok(())
}

fn print_outcome(outcome: &PipelineOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        print!("{}", format_outcome(outcome));
    }
    Ok(())
}

/// Print agent progress to stderr until every sender is dropped.
fn spawn_event_printer() -> (UnboundedSender<AgentEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<AgentEvent>();
    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::Thinking { agent, iteration } => {
                    eprintln!("[{agent}] thinking (step {iteration})")
                }
                AgentEvent::MessagesReceived { agent, count } => {
                    eprintln!("[{agent}] {count} message(s) received")
                }
                AgentEvent::ToolStart { agent, name } => eprintln!("[{agent}] tool: {name}"),
                AgentEvent::ToolResult {
                    agent,
                    name,
                    success,
                    summary,
                } => {
                    let icon = if success { "ok" } else { "err" };
                    eprintln!("[{agent}] [{name}: {icon}] {summary}");
                }
                AgentEvent::Complete { agent, iterations } => {
                    eprintln!("[{agent}] done after {iterations} step(s)")
                }
                AgentEvent::Exhausted { agent, iterations } => {
                    eprintln!("[{agent}] gave up after {iterations} step(s)")
                }
            }
        }
    });
    (tx, handle)
}

/// Human gate that shows each answer and asks on stdin whether to continue.
fn stdin_gate() -> HumanGateFn {
    Box::new(|agent: String, answer: String| {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                eprintln!("\n--- {agent} answered ---\n{answer}\n");
                eprint!("Continue? [Y/n] ");
                let mut line = String::new();
                match std::io::stdin().read_line(&mut line) {
                    Ok(_) => parse_approval(&line),
                    Err(_) => false,
                }
            })
            .await
            .unwrap_or(false)
        })
    })
}
