use std::time::Duration;

use garden_guru_model::ErrorKind;
use garden_guru_test_model::{PresetResponse, TestModelProvider};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use super::*;
use crate::chat::SessionState;
use crate::prompts::{ANALYSIS_FALLBACK, CHAT_FALLBACK};

fn photo() -> ImageInput {
    ImageInput::with_type(vec![0x89, 0x50, 0x4e, 0x47], "image/png").unwrap()
}

async fn wait_for(
    rx: &mut watch::Receiver<Snapshot>,
    f: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    timeout(Duration::from_millis(500), rx.wait_for(f))
        .await
        .unwrap()
        .unwrap()
        .clone()
}

#[tokio::test]
async fn test_analyze_requires_image() {
    let workbench =
        WorkbenchBuilder::with_model_provider(TestModelProvider::default())
            .build();
    assert_eq!(workbench.analyze(), Err(SubmitError::NoImage));
    assert_eq!(
        SubmitError::NoImage.to_string(),
        "Please upload an image first."
    );
}

#[tokio::test]
async fn test_analysis_is_posted_to_chat() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("**Snake plant**"));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();
    let mut rx = workbench.subscribe();

    workbench.select_image(photo());
    workbench.analyze().unwrap();
    assert!(workbench.snapshot().analysis_busy);
    assert_eq!(workbench.analyze(), Err(SubmitError::Busy));

    let snapshot = wait_for(&mut rx, |s| !s.analysis_busy).await;
    assert_eq!(
        snapshot.analysis,
        Some(Outcome::Reply("**Snake plant**".to_owned()))
    );
    assert_eq!(snapshot.image_type.as_deref(), Some("image/png"));
    assert_eq!(snapshot.transcript, vec![Message::analysis("**Snake plant**")]);
}

#[tokio::test]
async fn test_failed_analysis_stays_out_of_chat() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("never").with_failures(0));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();
    let mut rx = workbench.subscribe();

    workbench.select_image(photo());
    workbench.analyze().unwrap();

    let snapshot = wait_for(&mut rx, |s| !s.analysis_busy).await;
    let analysis = snapshot.analysis.unwrap();
    assert_eq!(analysis.text(), ANALYSIS_FALLBACK);
    assert!(analysis.failure().is_some());
    assert!(snapshot.transcript.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_image_supersedes_running_analysis() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("Old photo"));
    provider.set_delay(Duration::from_millis(100));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();

    workbench.select_image(photo());
    workbench.analyze().unwrap();
    sleep(Duration::from_millis(10)).await;

    workbench.select_image(photo());
    let snapshot = workbench.snapshot();
    assert!(!snapshot.analysis_busy);
    assert_eq!(snapshot.analysis, None);

    // The cancelled request never writes its result.
    sleep(Duration::from_secs(1)).await;
    let snapshot = workbench.snapshot();
    assert_eq!(snapshot.analysis, None);
    assert!(snapshot.transcript.is_empty());
}

#[tokio::test]
async fn test_chat_round_trip() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("Every 7 to 10 days."));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();
    let mut rx = workbench.subscribe();

    assert_eq!(workbench.send_message("   "), Err(SubmitError::EmptyMessage));

    workbench.send_message("How often should I water?").unwrap();
    let snapshot = workbench.snapshot();
    assert!(snapshot.chat_busy);
    assert_eq!(
        snapshot.transcript,
        vec![Message::user("How often should I water?")]
    );
    assert_eq!(workbench.send_message("Hello?"), Err(SubmitError::Busy));

    let snapshot = wait_for(&mut rx, |s| !s.chat_busy).await;
    assert_eq!(
        snapshot.transcript,
        vec![
            Message::user("How often should I water?"),
            Message::model("Every 7 to 10 days."),
        ]
    );
    assert_eq!(snapshot.last_chat_failure, None);
    assert_eq!(snapshot.session, SessionState::Active);
}

#[tokio::test]
async fn test_chat_failure_shows_fallback() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("never").with_failures(0));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();
    let mut rx = workbench.subscribe();

    workbench.send_message("Hi").unwrap();
    let snapshot = wait_for(&mut rx, |s| !s.chat_busy).await;
    assert_eq!(snapshot.transcript[1], Message::model(CHAT_FALLBACK));
    assert_eq!(snapshot.last_chat_failure, Some(ErrorKind::Other));
}

#[tokio::test]
async fn test_clear_history_keeps_session() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("A monstera, got it."));
    provider.add_turn(PresetResponse::with_text("Your monstera needs..."));
    let workbench =
        WorkbenchBuilder::with_model_provider(provider.clone()).build();
    let mut rx = workbench.subscribe();

    workbench.send_message("I own a monstera.").unwrap();
    wait_for(&mut rx, |s| !s.chat_busy).await;

    workbench.clear_history();
    assert!(workbench.snapshot().transcript.is_empty());

    workbench.send_message("What does it need?").unwrap();
    let snapshot = wait_for(&mut rx, |s| !s.chat_busy).await;
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.transcript[1].text, "Your monstera needs...");

    // The model saw the conversation from before the clear.
    let requests = provider.requests();
    assert_eq!(requests[1].messages.len(), 3);
}

#[tokio::test]
async fn test_reset_conversation() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("Hello!"));
    let workbench =
        WorkbenchBuilder::with_model_provider(provider.clone()).build();
    let mut rx = workbench.subscribe();

    workbench.send_message("Hi").unwrap();
    wait_for(&mut rx, |s| !s.chat_busy).await;

    workbench.reset_conversation();
    let snapshot = workbench.snapshot();
    assert!(snapshot.transcript.is_empty());
    assert_eq!(snapshot.session, SessionState::Uninitialized);

    workbench.send_message("Hi again").unwrap();
    let snapshot = wait_for(&mut rx, |s| !s.chat_busy).await;
    assert_eq!(snapshot.transcript[1], Message::model("Hello!"));
    assert_eq!(provider.requests()[1].messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_chat() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("Too late"));
    provider.set_delay(Duration::from_millis(100));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();

    assert!(!workbench.cancel_chat());
    workbench.send_message("Hi").unwrap();
    sleep(Duration::from_millis(10)).await;
    assert!(workbench.cancel_chat());

    sleep(Duration::from_secs(1)).await;
    let snapshot = workbench.snapshot();
    assert!(!snapshot.chat_busy);
    assert_eq!(snapshot.transcript, vec![Message::user("Hi")]);
    assert_eq!(workbench.session().context_len(), 0);
}

#[tokio::test]
async fn test_surfaces_are_independent() {
    let mut provider = TestModelProvider::default();
    provider.add_turn(PresetResponse::with_text("Both work."));
    let workbench = WorkbenchBuilder::with_model_provider(provider).build();
    let mut rx = workbench.subscribe();

    workbench.select_image(photo());
    workbench.analyze().unwrap();
    workbench.send_message("Meanwhile, a question").unwrap();

    let snapshot =
        wait_for(&mut rx, |s| !s.analysis_busy && !s.chat_busy).await;
    assert!(snapshot.analysis.unwrap().is_reply());
    assert_eq!(snapshot.transcript.len(), 3);
}
