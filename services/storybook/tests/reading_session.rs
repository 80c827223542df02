//! Full reading sessions over the simulated speech engine.

use std::sync::Arc;
use std::time::Duration;
use storybook_core::{Page, Story};
use storybook_lib::adapters::{JsonStoryLibrary, SimulatedSpeechAdapter};
use storybook_lib::playback::{
    PlaybackEvent, PlaybackNotice, PlaybackOptions, PlaybackReceiver, ReaderProfile,
    StoryPlaybackController,
};

fn story(pages: &[&str]) -> Story {
    Story::new(
        "ワンダーとにじいろのくも",
        pages.iter().map(|text| Page::new(*text, "")).collect(),
    )
}

async fn collect_until_end(notices: &mut PlaybackReceiver) -> Vec<PlaybackNotice> {
    let mut seen = Vec::new();
    while let Some(notice) = notices.recv().await {
        let done = notice.event == PlaybackEvent::EndOfStory;
        seen.push(notice);
        if done {
            break;
        }
    }
    seen
}

fn find(notices: &[PlaybackNotice], event: &PlaybackEvent) -> PlaybackNotice {
    notices
        .iter()
        .find(|notice| &notice.event == event)
        .cloned()
        .unwrap_or_else(|| panic!("missing {:?} in {:?}", event, notices))
}

#[tokio::test(start_paused = true)]
async fn player_reads_the_whole_story_with_reading_time_pauses() {
    let speech = Arc::new(SimulatedSpeechAdapter::new(100));
    let (controller, mut notices) = StoryPlaybackController::new(
        story(&["あいうえお", "かきくけこ"]),
        speech.clone(),
        PlaybackOptions::default(),
    );

    controller.play().await.unwrap();
    let seen = collect_until_end(&mut notices).await;

    let started = find(&seen, &PlaybackEvent::NarrationStarted { index: 0 });
    let finished = find(&seen, &PlaybackEvent::NarrationFinished { index: 0 });
    let turned = find(&seen, &PlaybackEvent::PageChanged { index: 1 });
    // Five characters at the default 0.8 speed.
    assert_eq!(finished.at - started.at, Duration::from_millis(625));
    // The three second reading floor plus the five second default delay.
    assert_eq!(turned.at - finished.at, Duration::from_millis(8000));

    let texts: Vec<String> = speech.transcript().into_iter().map(|u| u.text).collect();
    assert_eq!(texts, vec!["あいうえお", "かきくけこ"]);
    assert!(speech.transcript().iter().all(|u| (u.rate - 0.8).abs() < 1e-6));

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.current_page_index, Some(1));
    assert!(!snapshot.is_playing);
    controller.close().await;
}

#[tokio::test(start_paused = true)]
async fn pausing_during_the_wait_keeps_the_page() {
    let speech = Arc::new(SimulatedSpeechAdapter::new(100));
    let options = PlaybackOptions {
        profile: ReaderProfile::viewer(),
        ..PlaybackOptions::default()
    };
    let (controller, mut notices) =
        StoryPlaybackController::new(story(&["あい", "うえ", "お"]), speech.clone(), options);
    controller.set_auto_page_turn(true).await;

    controller.play().await.unwrap();
    while let Some(notice) = notices.recv().await {
        if let PlaybackEvent::AdvanceScheduled { from, delay } = notice.event {
            assert_eq!(from, 0);
            assert_eq!(delay, Duration::from_secs(3));
            break;
        }
    }
    controller.pause().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.current_page_index, Some(0));
    assert!(!snapshot.is_playing);
    assert_eq!(speech.transcript().len(), 1);
    while let Ok(notice) = notices.try_recv() {
        assert!(!matches!(notice.event, PlaybackEvent::PageChanged { .. }));
    }
}

#[tokio::test(start_paused = true)]
async fn manual_navigation_interrupts_and_does_not_resume() {
    let speech = Arc::new(SimulatedSpeechAdapter::new(1000));
    let (controller, _notices) = StoryPlaybackController::new(
        story(&["ながい ながい おはなし", "つぎのページ"]),
        speech.clone(),
        PlaybackOptions::default(),
    );

    controller.play().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(controller.next_page().await);
    tokio::time::sleep(Duration::from_secs(60)).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.current_page_index, Some(1));
    assert!(!snapshot.is_playing);
    assert_eq!(speech.transcript().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn bundled_sample_library_opens_and_plays() {
    let library = JsonStoryLibrary::load(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../data/stories.json"
    ))
    .await
    .unwrap();
    let id = "6f1d0c1e-3b7a-4e0e-9a39-1f0c2a6b8d11".parse().unwrap();
    let speech = Arc::new(SimulatedSpeechAdapter::new(10));
    let (controller, mut notices) =
        StoryPlaybackController::open(&library, id, speech.clone(), PlaybackOptions::default())
            .await
            .unwrap();

    assert_eq!(controller.snapshot().await.page_count, 7);
    controller.play().await.unwrap();
    let seen = collect_until_end(&mut notices).await;
    assert_eq!(
        seen.iter()
            .filter(|n| n.event == PlaybackEvent::EndOfStory)
            .count(),
        1
    );
    assert_eq!(speech.transcript().len(), 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rapid_pause_and_play_never_fails_the_live_run() {
    let speech = Arc::new(SimulatedSpeechAdapter::new(20));
    let (controller, mut notices) = StoryPlaybackController::new(
        story(&["あいうえお", "かきくけこ"]),
        speech,
        PlaybackOptions::default(),
    );

    let mut failures = 0;
    for _ in 0..1000 {
        controller.play().await.unwrap();
        controller.pause().await;
        controller.play().await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        while let Ok(notice) = notices.try_recv() {
            if matches!(notice.event, PlaybackEvent::NarrationFailed { .. }) {
                failures += 1;
            }
        }
    }
    controller.close().await;

    assert_eq!(failures, 0);
}
