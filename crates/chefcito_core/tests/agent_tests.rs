mod common;

use std::sync::Arc;
use std::time::Duration;

use chefcito_core::agent::{FALLBACK_REPLY, NEED_MORE_INPUT_REPLY};
use chefcito_core::{
    AgentSettings, CatalogReader, ChatError, ChatRole, ChefAgent, ConversationTurn, CurrentUser,
    TurnOutcome,
};
use common::{kitchen, BrokenCatalog, Scripted, ScriptedModel};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn agent(model: Arc<ScriptedModel>, settings: AgentSettings) -> (ChefAgent, Arc<dyn CatalogReader>) {
    let catalog: Arc<dyn CatalogReader> = Arc::new(kitchen().catalog);
    (ChefAgent::new(model, catalog.clone(), settings), catalog)
}

const FIND_RICE: &str =
    r#"{"status":"tool_request","tool":"find_recipes","args":{"include_ingredients":["Arroz"]}}"#;

#[tokio::test]
async fn direct_final_answer_keeps_only_grounded_references() {
    let k = kitchen();
    let gallo = k.gallo_pinto;
    let final_answer = json!({
        "status": "final",
        "answer_markdown": "Try **Gallo Pinto**!",
        "recipe_ids": [gallo.to_string(), "made-up", gallo.to_string()],
        "ingredient_names": ["arroz", "Unicorn tears", "ARROZ"]
    })
    .to_string();
    let model = ScriptedModel::texts(&[&final_answer]);
    let agent = ChefAgent::new(model.clone(), Arc::new(k.catalog), AgentSettings::default());

    let reply = agent
        .chat(&CurrentUser::Anonymous, "What can I make with rice?", &[])
        .await
        .unwrap();

    assert_eq!(reply.outcome, TurnOutcome::Final);
    assert_eq!(reply.reply, "Try **Gallo Pinto**!");
    assert_eq!(reply.recipe_ids, vec![gallo]);
    assert_eq!(reply.ingredient_names, vec!["Arroz".to_string()]);
    assert!(reply.used_tools.is_empty());
    assert_eq!(model.calls(), 1);

    let prompt = &model.prompts()[0];
    assert!(prompt.contains("Gallo Pinto"));
    assert!(prompt.contains("USER_MESSAGE:\nWhat can I make with rice?"));
    assert!(prompt.contains("anonymous"));
}

#[tokio::test]
async fn tool_result_is_fed_into_the_next_prompt() {
    let model = ScriptedModel::texts(&[
        FIND_RICE,
        r#"{"status":"final","answer_markdown":"Two ideas for your rice.","recipe_ids":[],"ingredient_names":[]}"#,
    ]);
    let (agent, _) = agent(model.clone(), AgentSettings::default());

    let reply = agent
        .chat(&CurrentUser::Anonymous, "rice ideas?", &[])
        .await
        .unwrap();

    assert_eq!(reply.outcome, TurnOutcome::Final);
    assert_eq!(reply.used_tools.len(), 1);
    assert_eq!(reply.used_tools[0].tool, "find_recipes");
    assert_eq!(
        reply.used_tools[0].args,
        json!({ "include_ingredients": ["Arroz"] })
    );

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("TOOL_RESULT"));
    assert!(prompts[1].contains("TOOL_RESULT"));
    assert!(prompts[1].contains(r#""tool":"find_recipes""#));
    assert!(prompts[1].contains(r#""name":"Arroz con leche""#));
}

#[tokio::test]
async fn fenced_json_is_still_understood() {
    let model = ScriptedModel::texts(&[
        "Here it is:\n```json\n{\"status\": \"Final\", \"answer_markdown\": \"Hola!\"}\n```",
    ]);
    let (agent, _) = agent(model, AgentSettings::default());

    let reply = agent.chat(&CurrentUser::Anonymous, "hola", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::Final);
    assert_eq!(reply.reply, "Hola!");
}

#[tokio::test]
async fn unusable_model_output_falls_back_without_retrying() {
    for text in [
        "You should cook rice, it is great.",
        r#"{"status":"thinking","answer_markdown":"hmm"}"#,
        r#"["final"]"#,
        "",
    ] {
        let model = ScriptedModel::texts(&[text, FIND_RICE]);
        let (agent, _) = agent(model.clone(), AgentSettings::default());

        let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
        assert_eq!(reply.outcome, TurnOutcome::Fallback, "{text}");
        assert_eq!(reply.reply, FALLBACK_REPLY);
        assert!(reply.recipe_ids.is_empty());
        assert_eq!(model.calls(), 1, "{text}");
    }
}

#[tokio::test]
async fn transport_errors_fall_back_and_keep_the_tool_log() {
    let model = ScriptedModel::new(vec![
        Scripted::Text(FIND_RICE.to_string()),
        Scripted::Fail("connection reset".to_string()),
    ]);
    let (agent, _) = agent(model, AgentSettings::default());

    let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::Fallback);
    assert_eq!(reply.used_tools.len(), 1);
}

#[tokio::test]
async fn slow_models_time_out_into_the_fallback() {
    let model = ScriptedModel::new(vec![Scripted::Slow(
        Duration::from_secs(5),
        r#"{"status":"final","answer_markdown":"too late"}"#.to_string(),
    )]);
    let settings = AgentSettings {
        llm_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let (agent, _) = agent(model, settings);

    let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::Fallback);
    assert_eq!(reply.reply, FALLBACK_REPLY);
}

#[tokio::test]
async fn loop_ends_after_max_iters_even_when_every_tool_fails() {
    let bogus = r#"{"status":"tool_request","tool":"drop_tables","args":{}}"#;
    let model = ScriptedModel::texts(&[
        bogus,
        bogus,
        bogus,
        r#"{"status":"final","answer_markdown":"never reached"}"#,
    ]);
    let (agent, _) = agent(model.clone(), AgentSettings::default());

    let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::NeedMoreInput);
    assert_eq!(reply.reply, NEED_MORE_INPUT_REPLY);
    assert_eq!(reply.used_tools.len(), 3);
    assert_eq!(model.calls(), 3);

    // Each failed envelope is shown to the model on the following call.
    let prompts = model.prompts();
    assert!(prompts[1].contains(r#""ok":false"#));
    assert!(prompts[2].contains("unknown tool 'drop_tables'"));
}

#[tokio::test]
async fn single_iteration_budget_allows_one_model_call() {
    let model = ScriptedModel::texts(&[FIND_RICE, FIND_RICE]);
    let settings = AgentSettings {
        max_iters: 1,
        ..Default::default()
    };
    let (agent, _) = agent(model.clone(), settings);

    let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::NeedMoreInput);
    assert_eq!(reply.used_tools.len(), 1);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn cancelled_turns_never_call_the_model() {
    let model = ScriptedModel::texts(&[FIND_RICE]);
    let (agent, _) = agent(model.clone(), AgentSettings::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reply = agent
        .chat_with_cancellation(&CurrentUser::Anonymous, "hi", &[], &cancel)
        .await
        .unwrap();
    assert_eq!(reply.outcome, TurnOutcome::Cancelled);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn blank_messages_are_rejected_up_front() {
    let model = ScriptedModel::texts(&[FIND_RICE]);
    let agent = ChefAgent::new(model.clone(), Arc::new(BrokenCatalog), AgentSettings::default());

    let err = agent
        .chat(&CurrentUser::Anonymous, "  \n ", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn catalog_outage_becomes_a_fallback_reply() {
    let model = ScriptedModel::texts(&[FIND_RICE]);
    let agent = ChefAgent::new(model.clone(), Arc::new(BrokenCatalog), AgentSettings::default());

    let reply = agent.chat(&CurrentUser::Anonymous, "hi", &[]).await.unwrap();
    assert_eq!(reply.outcome, TurnOutcome::Fallback);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn history_is_windowed_and_tool_turns_are_dropped() {
    let model = ScriptedModel::texts(&[r#"{"status":"final","answer_markdown":"ok"}"#]);
    let settings = AgentSettings {
        history_window: 2,
        ..Default::default()
    };
    let (agent, _) = agent(model.clone(), settings);

    let history = vec![
        ConversationTurn::user("first question"),
        ConversationTurn::assistant("first answer"),
        ConversationTurn::user("second question"),
        ConversationTurn {
            role: ChatRole::Tool,
            content: "raw tool output".to_string(),
            metadata: None,
        },
        ConversationTurn::assistant("second answer"),
    ];
    agent
        .chat(&CurrentUser::Anonymous, "third question", &history)
        .await
        .unwrap();

    let prompt = &model.prompts()[0];
    assert!(prompt.contains("- user: second question\n- assistant: second answer"));
    assert!(!prompt.contains("first question"));
    assert!(!prompt.contains("raw tool output"));
}

#[tokio::test]
async fn signed_in_users_are_described_to_the_model() {
    let mut k = kitchen();
    let user_id = Uuid::new_v4();
    k.catalog.set_user_restrictions(user_id, vec![k.lactose]);
    let model = ScriptedModel::texts(&[r#"{"status":"final","answer_markdown":"ok"}"#]);
    let agent = ChefAgent::new(model.clone(), Arc::new(k.catalog), AgentSettings::default());

    agent
        .chat(&CurrentUser::Authenticated { user_id }, "hi", &[])
        .await
        .unwrap();
    assert!(model.prompts()[0].contains("signed in"));
}
