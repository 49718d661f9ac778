//! Conductor -> DisplayState integration
//!
//! Drives a real Conductor with a scripted backend and checks that the TUI's
//! display state, built only from Conductor messages, shows the response the
//! way it should be drawn.

use std::path::PathBuf;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use streamchat_core::{
    ChatConfig, ChatError, Conductor, ConductorState, DisplayTag, LlmBackend,
    LlmRequest, StreamingToken, SurfaceEvent, Turn, TurnSink,
};
use streamchat_tui::display::DisplayState;

struct ScriptedBackend {
    deltas: Vec<&'static str>,
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn send_streaming(
        &self,
        _request: &LlmRequest,
    ) -> anyhow::Result<mpsc::Receiver<StreamingToken>> {
        let (tx, rx) = mpsc::channel(16);
        let deltas = self.deltas.clone();
        tokio::spawn(async move {
            for delta in &deltas {
                let _ = tx.send(StreamingToken::Token((*delta).to_string())).await;
            }
            let _ = tx
                .send(StreamingToken::Complete {
                    message: deltas.concat(),
                })
                .await;
        });
        Ok(rx)
    }
}

struct NullSink;

impl TurnSink for NullSink {
    fn describe(&self) -> String {
        "nowhere".to_string()
    }

    fn persist(&mut self, _turn: &Turn) -> Result<PathBuf, ChatError> {
        Ok(PathBuf::from("nowhere.md"))
    }
}

async fn run_exchange(deltas: Vec<&'static str>, prompt: &str) -> DisplayState {
    let mut config = ChatConfig::default();
    config.api_key = Some("sk-test".to_string());

    let (tx, mut rx) = mpsc::channel(1024);
    let mut conductor = Conductor::new(ScriptedBackend { deltas }, config, tx).with_sink(NullSink);

    tokio_test::assert_ok!(conductor.start().await);
    tokio_test::assert_ok!(
        conductor
            .handle_event(SurfaceEvent::user_message(prompt))
            .await
    );
    conductor.wait_for_turn().await;

    let mut display = DisplayState::default();
    while let Ok(msg) = rx.try_recv() {
        display.apply_message(msg);
    }
    display
}

fn runs_with(display: &DisplayState, tag: DisplayTag) -> Vec<String> {
    display
        .styled_runs()
        .into_iter()
        .filter(|(_, t)| *t == tag)
        .map(|(text, _)| text)
        .collect()
}

#[tokio::test]
async fn test_bold_split_across_deltas_is_drawn_bold() {
    let display = run_exchange(vec!["This is **imp", "ortant** text."], "hi").await;

    assert_eq!(runs_with(&display, DisplayTag::AssistantBold).concat(), "important");
    assert_eq!(display.conductor_state, ConductorState::Ready);
}

#[tokio::test]
async fn test_code_block_and_user_echo() {
    let display = run_exchange(vec!["See:\n```sh\nls\n", "```\n"], "list files").await;

    // The closing fence takes the post-toggle style
    assert_eq!(
        runs_with(&display, DisplayTag::AssistantCode).concat(),
        "```sh\nls\n"
    );
    assert!(runs_with(&display, DisplayTag::User).concat().contains("list files"));
}

#[tokio::test]
async fn test_session_info_reaches_display() {
    let display = run_exchange(vec!["ok"], "hi").await;

    assert_eq!(display.model, ChatConfig::default().model);
    assert_eq!(display.scenario, ChatConfig::default().scenario);
    assert!(display.continuation);
}

#[tokio::test]
async fn test_quit_round_trip() {
    let mut config = ChatConfig::default();
    config.api_key = Some("sk-test".to_string());
    let (tx, mut rx) = mpsc::channel(64);
    let mut conductor = Conductor::new(ScriptedBackend { deltas: vec![] }, config, tx);

    tokio_test::assert_ok!(conductor.handle_event(SurfaceEvent::QuitRequested).await);

    let mut display = DisplayState::default();
    while let Ok(msg) = rx.try_recv() {
        display.apply_message(msg);
    }
    assert!(display.quit_requested);
    assert!(matches!(
        display.conductor_state,
        ConductorState::ShuttingDown
    ));
}

#[tokio::test]
async fn test_log_dir_chosen_at_runtime_reaches_display() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ChatConfig::default();
    config.api_key = Some("sk-test".to_string());
    let (tx, mut rx) = mpsc::channel(64);
    let mut conductor = Conductor::new(ScriptedBackend { deltas: vec!["ok"] }, config, tx);
    let mut display = DisplayState::default();

    // Nowhere to save yet, so the message is refused
    tokio_test::assert_ok!(
        conductor
            .handle_event(SurfaceEvent::user_message("hi"))
            .await
    );
    while let Ok(msg) = rx.try_recv() {
        display.apply_message(msg);
    }
    assert!(display
        .status_message
        .as_deref()
        .is_some_and(|reason| reason.contains("log_dir")));

    tokio_test::assert_ok!(
        conductor
            .handle_event(SurfaceEvent::SetLogDir {
                path: dir.path().to_path_buf(),
            })
            .await
    );
    while let Ok(msg) = rx.try_recv() {
        display.apply_message(msg);
    }
    assert!(display
        .log_destination
        .as_deref()
        .is_some_and(|dest| dest.contains(&*dir.path().to_string_lossy())));
}
