//! End-to-end pipeline tests: physical change -> rewrite -> barrier ->
//! fetch -> traverse -> component reload.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use podium::client::{
    ComponentReload, ManifestFetcher, ReloadError, ReloadSession, RetryPolicy,
};
use podium::{AliasTable, EnsembleOverride, ReloadChannel, ReloadEvent};

const SENTINEL: &str = "public/app.json";

struct StaticFetcher {
    document: Value,
}

#[async_trait]
impl ManifestFetcher for StaticFetcher {
    async fn fetch(&self) -> Result<Value, ReloadError> {
        Ok(self.document.clone())
    }
}

#[derive(Clone, Default)]
struct RecordingReload {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ComponentReload for RecordingReload {
    fn reload_components_from_path(&self, logical_path: &str, fragment: &Value) {
        self.calls
            .lock()
            .unwrap()
            .push((logical_path.to_string(), fragment.clone()));
    }
}

fn session_over(
    document: Value,
    reloader: RecordingReload,
) -> ReloadSession<StaticFetcher> {
    ReloadSession::new(
        SENTINEL.to_string(),
        StaticFetcher { document },
        RetryPolicy::immediate(),
    )
    .with_reloader(reloader)
}

#[tokio::test]
async fn aliased_change_reaches_its_manifest_fragment() {
    // Override {name: "shared", path: "/abs/shared"}
    let table = AliasTable::new(vec![EnsembleOverride {
        name: "shared".to_string(),
        physical_root: PathBuf::from("/abs/shared"),
        watch_enabled: true,
    }]);

    let logical = table.rewrite(Path::new("/abs/shared/widgets/a.json"), Path::new("/proj"));
    assert_eq!(logical, "@shared/widgets/a.json");

    let fragment = json!({ "type": "label", "value": "hello" });
    let manifest = json!({
        "@shared": { "widgets": { "a.json": fragment.clone() } }
    });

    let reloader = RecordingReload::default();
    let mut session = session_over(manifest, reloader.clone());

    session.handle(ReloadEvent::new(logical)).await;
    session.handle(ReloadEvent::new(SENTINEL)).await;

    let calls = reloader.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "@shared/widgets/a.json");
    assert_eq!(calls[0].1, fragment);
}

#[tokio::test]
async fn project_change_is_addressed_under_dashboard() {
    // No override matches: the path stays root-relative
    let table = AliasTable::default();
    let logical = table.rewrite(
        Path::new("/proj/app/dashboard/panel.json"),
        Path::new("/proj"),
    );
    assert_eq!(logical, "app/dashboard/panel.json");

    let fragment = json!({ "type": "panel" });
    let manifest = json!({
        "dashboard": { "panel.json": fragment.clone() }
    });

    let reloader = RecordingReload::default();
    let mut session = session_over(manifest, reloader.clone());

    session.handle(ReloadEvent::new(logical)).await;
    session.handle(ReloadEvent::new(SENTINEL)).await;

    let calls = reloader.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "dashboard/panel.json");
    assert_eq!(calls[0].1, fragment);
}

#[tokio::test]
async fn notifications_flow_through_the_channel_in_order() {
    let manifest = json!({
        "dashboard": {
            "a.json": { "id": "a" },
            "b.json": { "id": "b" },
            "c.json": { "id": "c" }
        }
    });

    let channel = ReloadChannel::new(16);
    let receiver = channel.subscribe();

    let reloader = RecordingReload::default();
    let session = session_over(manifest, reloader.clone());
    let task = tokio::spawn(session.run(receiver));

    channel.send(ReloadEvent::new("app/a.json"));
    channel.send(ReloadEvent::new("app/b.json"));
    channel.send(ReloadEvent::new("app/c.json"));
    channel.send(ReloadEvent::new(SENTINEL));

    // The batch releases together once the sentinel lands
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if reloader.calls.lock().unwrap().len() == 3 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "pipeline did not drain in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let paths: Vec<String> = reloader
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(p, _)| p.clone())
        .collect();
    assert_eq!(
        paths,
        vec!["dashboard/a.json", "dashboard/b.json", "dashboard/c.json"]
    );

    task.abort();
}
