mod common;

use common::{answer, call, test_registry, ScriptedLlm};
use ensemble_core::agent::{AgentConfig, StepKind};
use ensemble_core::constants::{keys, INCOMPLETE_ANSWER};
use ensemble_core::llm::LlmClient;
use ensemble_core::pipeline::{
    fan_out, CriticPolicy, DebateRouting, HumanGateFn, MessageChain, Pipeline,
    PipelineDefinition, PipelineEvent, Termination,
};
use ensemble_core::{EnsembleError, Workspace};
use serde_json::json;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;

fn pipeline(agents: Vec<AgentConfig>, llm: &Arc<ScriptedLlm>) -> Pipeline {
    let llm: Arc<dyn LlmClient> = llm.clone();
    Pipeline::new(agents, llm, Arc::new(test_registry())).unwrap()
}

/// Gate that rejects the answer of one named agent.
fn reject_agent(name: &'static str) -> HumanGateFn {
    Box::new(move |agent: String, _answer: String| {
        let approve = agent != name;
        Box::pin(async move { approve }) as Pin<Box<dyn Future<Output = bool> + Send>>
    })
}

fn abc() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new("A", "agent a"),
        AgentConfig::new("B", "agent b"),
        AgentConfig::new("C", "agent c"),
    ]
}

fn blog_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new("Researcher", "researcher"),
        AgentConfig::new("Writer", "writer").with_capabilities(["echo"]),
        AgentConfig::new("Reviewer", "reviewer").with_revision_target("Writer"),
    ]
}

#[tokio::test]
async fn test_linear_routing_runs_in_order() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent b", vec![answer("a2")])
            .script("agent c", vec![answer("a3")]),
    );

    let outcome = pipeline(abc(), &llm).run("start").await.unwrap();

    assert_eq!(outcome.final_answer, "a3");
    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.hops, 3);
    assert_eq!(llm.goals("agent a"), vec!["start"]);
    assert_eq!(llm.goals("agent b"), vec!["a1"]);
    assert_eq!(llm.goals("agent c"), vec!["a2"]);

    assert_eq!(outcome.workspace.get(keys::PIPELINE), Some(&json!(["A", "B", "C"])));
    assert_eq!(outcome.workspace.get(keys::HISTORY), Some(&json!(["A", "B", "C"])));
    assert_eq!(
        outcome.workspace.get(&keys::last_answer("B")),
        Some(&json!("a2"))
    );
    assert_eq!(
        outcome.step_lines(),
        vec![
            "**A Step 1:**\nAgent produced final answer.",
            "**B Step 1:**\nAgent produced final answer.",
            "**C Step 1:**\nAgent produced final answer.",
        ]
    );
    assert!(!outcome.run_id.is_empty());
}

#[tokio::test]
async fn test_critic_bypass_uses_cached_tool_result() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("researcher", vec![answer("facts")])
            .script(
                "writer",
                vec![
                    call("echo", json!({"text": "draft v1"})),
                    answer("article"),
                    answer("article v2"),
                ],
            )
            .script(
                "reviewer",
                vec![answer("This NEEDS REVISION: too short."), answer("Approved.")],
            ),
    );

    let outcome = pipeline(blog_agents(), &llm).run("tides").await.unwrap();

    assert_eq!(outcome.final_answer, "Approved.");
    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.hops, 5);
    assert_eq!(llm.goals("writer"), vec!["facts", "draft v1"]);
    assert_eq!(llm.goals("reviewer"), vec!["article", "article v2"]);

    let revision = outcome
        .steps
        .iter()
        .find(|s| matches!(s.kind, StepKind::SentBackForRevision { .. }))
        .expect("revision step recorded");
    assert_eq!(revision.agent, "Reviewer");
    assert_eq!(
        revision.kind,
        StepKind::SentBackForRevision {
            target: "Writer".into(),
            attempt: 1
        }
    );
}

#[tokio::test]
async fn test_critic_bypass_falls_back_to_reviewer_answer() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("researcher", vec![answer("facts")])
            .script("writer", vec![answer("article"), answer("better article")])
            .script(
                "reviewer",
                vec![answer("needs revision: add sources"), answer("ok")],
            ),
    );

    let outcome = pipeline(blog_agents(), &llm).run("tides").await.unwrap();

    assert_eq!(outcome.final_answer, "ok");
    assert_eq!(
        llm.goals("writer"),
        vec!["facts", "needs revision: add sources"]
    );
}

#[tokio::test]
async fn test_revision_loop_is_bounded() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("writer", vec![answer("d1"), answer("d2"), answer("d3")])
            .script(
                "reviewer",
                vec![
                    answer("needs revision 1"),
                    answer("needs revision 2"),
                    answer("needs revision 3"),
                ],
            ),
    );
    let agents = vec![
        AgentConfig::new("Writer", "writer"),
        AgentConfig::new("Reviewer", "reviewer").with_revision_target("Writer"),
    ];

    let outcome = pipeline(agents, &llm)
        .with_critic(CriticPolicy::new("needs revision", 2))
        .run("write")
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::MaxRevisionsExceeded);
    assert_eq!(outcome.final_answer, "needs revision 3");
    assert_eq!(outcome.hops, 6);
    assert!(matches!(
        outcome.steps.last().map(|s| &s.kind),
        Some(StepKind::RevisionLimitReached { limit: 2, .. })
    ));
}

#[tokio::test]
async fn test_human_gate_rejection_terminates() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent b", vec![answer("a2")])
            .script("agent c", vec![answer("a3")]),
    );

    let outcome = pipeline(abc(), &llm)
        .with_human_gate(reject_agent("B"))
        .run("start")
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::HumanRejected);
    assert_eq!(outcome.final_answer, "a2");
    assert!(llm.conversations("agent c").is_empty());
    assert_eq!(
        outcome.steps.last().map(ToString::to_string).as_deref(),
        Some("**B:** Human stopped or modified output.")
    );
}

#[tokio::test]
async fn test_human_gate_runs_before_critic() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("researcher", vec![answer("facts")])
            .script("writer", vec![answer("article")])
            .script("reviewer", vec![answer("needs revision")]),
    );

    let outcome = pipeline(blog_agents(), &llm)
        .with_human_gate(reject_agent("Reviewer"))
        .run("tides")
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::HumanRejected);
    assert_eq!(outcome.final_answer, "needs revision");
    assert_eq!(llm.goals("writer").len(), 1);
}

#[tokio::test]
async fn test_custom_routing_policy() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent c", vec![answer("a3")]),
    );
    let skip_b = |current: &str, _answer: &str, _ws: &Workspace| -> Result<Option<String>, EnsembleError> {
        Ok(match current {
            "A" => Some("C".to_string()),
            _ => None,
        })
    };

    let outcome = pipeline(abc(), &llm)
        .with_routing(skip_b)
        .run("start")
        .await
        .unwrap();

    assert_eq!(outcome.final_answer, "a3");
    assert_eq!(outcome.hops, 2);
    assert!(llm.conversations("agent b").is_empty());
}

#[tokio::test]
async fn test_critic_bypass_overrides_custom_routing() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("researcher", vec![answer("facts")])
            .script("writer", vec![answer("draft"), answer("draft v2")])
            .script("reviewer", vec![answer("needs revision"), answer("fine")]),
    );
    // Stops after the reviewer, so only the critic can send work back.
    let stop_after_review = |current: &str, _answer: &str, _ws: &Workspace| -> Result<Option<String>, EnsembleError> {
        Ok(match current {
            "Researcher" => Some("Writer".to_string()),
            "Writer" => Some("Reviewer".to_string()),
            _ => None,
        })
    };

    let outcome = pipeline(blog_agents(), &llm)
        .with_routing(stop_after_review)
        .run("tides")
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Completed);
    assert_eq!(outcome.final_answer, "fine");
    assert_eq!(outcome.hops, 5);
    assert_eq!(llm.goals("writer"), vec!["facts", "needs revision"]);
    assert_eq!(
        outcome.workspace.get(keys::HISTORY),
        Some(&json!(["Researcher", "Writer", "Reviewer", "Writer", "Reviewer"]))
    );
}

#[tokio::test]
async fn test_routing_to_unknown_agent_is_an_error() {
    let llm = Arc::new(ScriptedLlm::new().script("agent a", vec![answer("a1")]));
    let to_nowhere = |_: &str, _: &str, _: &Workspace| -> Result<Option<String>, EnsembleError> {
        Ok(Some("Nobody".to_string()))
    };

    let result = pipeline(abc(), &llm).with_routing(to_nowhere).run("go").await;

    assert!(matches!(result, Err(EnsembleError::RoutingConfiguration(_))));
}

#[tokio::test]
async fn test_routing_error_aborts_the_run() {
    let llm = Arc::new(ScriptedLlm::new().script("agent a", vec![answer("a1")]));
    let broken = |_: &str, _: &str, _: &Workspace| -> Result<Option<String>, EnsembleError> {
        Err(EnsembleError::RoutingConfiguration("no order".into()))
    };

    let result = pipeline(abc(), &llm).with_routing(broken).run("go").await;

    assert!(matches!(result, Err(EnsembleError::RoutingConfiguration(_))));
}

#[tokio::test]
async fn test_empty_pipeline_terminates() {
    let llm = Arc::new(ScriptedLlm::new());

    let outcome = pipeline(Vec::new(), &llm).run("anything").await.unwrap();

    assert_eq!(outcome.termination, Termination::NoAgents);
    assert_eq!(outcome.final_answer, "");
    assert_eq!(outcome.hops, 0);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_exhausted_agent_still_routes() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![call("echo", json!({"text": "x"}))])
            .script("agent b", vec![answer("b done")]),
    );
    let agents = vec![
        AgentConfig::new("A", "agent a")
            .with_capabilities(["echo"])
            .with_max_iterations(1),
        AgentConfig::new("B", "agent b"),
    ];

    let outcome = pipeline(agents, &llm).run("go").await.unwrap();

    assert_eq!(outcome.final_answer, "b done");
    assert_eq!(llm.goals("agent b"), vec![INCOMPLETE_ANSWER]);
}

#[tokio::test]
async fn test_construction_validates_agents() {
    let llm: Arc<dyn LlmClient> = Arc::new(ScriptedLlm::new());
    let registry = Arc::new(test_registry());

    let unknown_target = Pipeline::new(
        vec![AgentConfig::new("Reviewer", "r").with_revision_target("Ghost")],
        llm.clone(),
        registry.clone(),
    );
    assert!(matches!(unknown_target, Err(EnsembleError::UnknownAgent(_))));

    let duplicate = Pipeline::new(
        vec![AgentConfig::new("A", "p"), AgentConfig::new("A", "q")],
        llm.clone(),
        registry.clone(),
    );
    assert!(matches!(duplicate, Err(EnsembleError::Config(_))));

    let bad_capability = Pipeline::new(
        vec![AgentConfig::new("A", "p").with_capabilities(["warp_drive"])],
        llm,
        registry,
    );
    assert!(matches!(bad_capability, Err(EnsembleError::Config(_))));
}

#[tokio::test]
async fn test_debate_routing_alternates_rounds() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("pro", vec![answer("pro 1"), answer("pro 2")])
            .script("con", vec![answer("con 1"), answer("con 2")])
            .script("mod", vec![answer("summary")]),
    );
    let agents = vec![
        AgentConfig::new("Pro", "pro"),
        AgentConfig::new("Con", "con"),
        AgentConfig::new("Mod", "mod"),
    ];

    let outcome = pipeline(agents, &llm)
        .with_routing(DebateRouting::new("Pro", "Con", "Mod", 2))
        .run("debate this")
        .await
        .unwrap();

    assert_eq!(outcome.final_answer, "summary");
    assert_eq!(
        outcome.workspace.get(keys::HISTORY),
        Some(&json!(["Pro", "Con", "Pro", "Con", "Mod"]))
    );
    assert_eq!(llm.goals("pro"), vec!["debate this", "con 1"]);
    assert_eq!(llm.goals("mod"), vec!["con 2"]);
}

#[tokio::test]
async fn test_pipeline_events() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent b", vec![answer("a2")]),
    );
    let agents = vec![AgentConfig::new("A", "agent a"), AgentConfig::new("B", "agent b")];
    let (tx, mut rx) = unbounded_channel();

    let outcome = pipeline(agents, &llm)
        .with_events(tx)
        .run("go")
        .await
        .unwrap();
    assert_eq!(outcome.final_answer, "a2");

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 5);
    assert!(matches!(&events[0], PipelineEvent::AgentStarted { agent, hop: 1 } if agent == "A"));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Terminated {
            termination: Termination::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_preloaded_workspace_messages_reach_agents() {
    let llm = Arc::new(ScriptedLlm::new().script("agent a", vec![answer("a1")]));
    let workspace = Arc::new(Workspace::new());
    workspace.send("Operator", "A", "use metric units");

    let agents = vec![AgentConfig::new("A", "agent a")];
    let outcome = pipeline(agents, &llm)
        .run_with_workspace("go", workspace.clone())
        .await
        .unwrap();

    assert_eq!(outcome.final_answer, "a1");
    let seen = &llm.conversations("agent a")[0];
    assert_eq!(seen[2].content, "[Message from Operator]: use metric units");
    assert_eq!(workspace.pending("A"), 0);
}

#[tokio::test]
async fn test_message_chain_carries_conversation() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent b", vec![answer("a2")]),
    );
    let llm_dyn: Arc<dyn LlmClient> = llm.clone();
    let chain = MessageChain::new(
        vec![AgentConfig::new("A", "agent a"), AgentConfig::new("B", "agent b")],
        llm_dyn,
        Arc::new(test_registry()),
    )
    .unwrap();

    let outcome = chain.run("goal").await.unwrap();

    assert_eq!(outcome.final_answer, "a2");
    assert_eq!(outcome.termination, Termination::Completed);
    let seen = &llm.conversations("agent b")[0];
    let contents: Vec<&str> = seen.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["agent b", "goal", "a1", "a1"]);
}

#[tokio::test]
async fn test_fan_out_keeps_order_and_shares_workspace() {
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("left", vec![call("echo", json!({"text": "l"})), answer("left done")])
            .script("right", vec![answer("right done")]),
    );
    let llm_dyn: Arc<dyn LlmClient> = llm.clone();
    let workspace = Arc::new(Workspace::new());

    let results = fan_out(
        vec![
            (
                AgentConfig::new("Left", "left").with_capabilities(["echo"]),
                "go left".to_string(),
            ),
            (AgentConfig::new("Right", "right"), "go right".to_string()),
        ],
        llm_dyn,
        Arc::new(test_registry()),
        workspace.clone(),
        2,
    )
    .await
    .unwrap();

    let answers: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().answer)
        .collect();
    assert_eq!(answers, vec!["left done", "right done"]);
    assert_eq!(
        workspace.get_str(&keys::last_tool_result("Left")).as_deref(),
        Some("l")
    );
}

#[tokio::test]
async fn test_definition_file_drives_a_pipeline() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
goal = "From file"

[[agents]]
name = "A"
persona = "agent a"

[[agents]]
name = "B"
persona = "agent b"
capabilities = ["echo"]
"#
    )
    .unwrap();

    let definition = PipelineDefinition::load(file.path()).unwrap();
    let llm = Arc::new(
        ScriptedLlm::new()
            .script("agent a", vec![answer("a1")])
            .script("agent b", vec![answer("b1")]),
    );
    let goal = definition.goal.clone().unwrap();
    let outcome = pipeline(definition.agents, &llm).run(&goal).await.unwrap();

    assert_eq!(outcome.final_answer, "b1");
    assert_eq!(llm.goals("agent a"), vec!["From file"]);
}
