//! CLI 流程测试：配置文件 + RSS 文件 + mock Telegram/VK

use httpmock::prelude::*;
use serde_json::json;
use ssender::cli::{handle_run, RunArgs};
use ssender::{DeliveryStore, JsonFileStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const FEED_V1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Blog</title>
    <link>https://example.com</link>
    <description>Blog</description>
    <item><title>Old</title><link>https://example.com/old</link><description>old</description></item>
  </channel>
</rss>"#;

const FEED_V2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Blog</title>
    <link>https://example.com</link>
    <description>Blog</description>
    <item><title>New</title><link>https://example.com/new</link><description>fresh &amp;amp; hot</description></item>
    <item><title>Old</title><link>https://example.com/old</link><description>old</description></item>
  </channel>
</rss>"#;

struct Env {
    temp: TempDir,
    config: PathBuf,
}

impl Env {
    fn new(server: &MockServer) -> Self {
        let temp = tempdir().unwrap();
        let db = temp.path().join("ssender.db");
        let config = temp.path().join("config.yml");
        fs::write(
            &config,
            format!(
                r#"
dbpath: {db}
telegram:
  send: true
  chatid: 42
  token: TOKEN
  api_base: {base}
vk:
  send: true
  token: vk-secret
  ownerid: -7
  api_base: {base}
"#,
                db = db.display(),
                base = server.base_url()
            ),
        )
        .unwrap();
        Self { temp, config }
    }

    fn feed(&self, xml: &str) -> PathBuf {
        let path = self.temp.path().join("feed.xml");
        fs::write(&path, xml).unwrap();
        path
    }

    fn args(&self, feed: &Path, initdb: bool) -> RunArgs {
        RunArgs {
            fileparse: feed.to_path_buf(),
            configpath: Some(self.config.clone()),
            initdb,
            dry_run: false,
            json: true,
        }
    }

    fn recorded(&self) -> usize {
        JsonFileStore::open(self.temp.path().join("ssender.db"))
            .unwrap()
            .len()
            .unwrap()
    }
}

#[test]
fn test_initdb_then_announce_new_item() {
    let server = MockServer::start();
    let telegram = server.mock(|when, then| {
        when.method(POST)
            .path("/botTOKEN/sendMessage")
            .json_body_partial(r#"{"text": "<b>New</b>\nfresh & hot\nhttps://example.com/new"}"#);
        then.status(200).json_body(json!({"ok": true, "result": {}}));
    });
    let vk = server.mock(|when, then| {
        when.method(POST)
            .path("/method/wall.post")
            .body_contains("attachments=https%3A%2F%2Fexample.com%2Fnew");
        then.status(200).json_body(json!({"response": {"post_id": 1}}));
    });

    let env = Env::new(&server);

    let v1 = env.feed(FEED_V1);
    handle_run(env.args(&v1, true)).unwrap();
    assert_eq!(env.recorded(), 1);

    let v2 = env.feed(FEED_V2);
    handle_run(env.args(&v2, false)).unwrap();
    telegram.assert_hits(1);
    vk.assert_hits(1);
    assert_eq!(env.recorded(), 2);

    // 再次运行不应重复发送
    handle_run(env.args(&v2, false)).unwrap();
    telegram.assert_hits(1);
    vk.assert_hits(1);
}

#[test]
fn test_sink_failure_exits_with_error_and_no_commit() {
    let server = MockServer::start();
    let telegram = server.mock(|when, then| {
        when.method(POST).path("/botTOKEN/sendMessage");
        then.status(200).json_body(json!({"ok": true, "result": {}}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/method/wall.post");
        then.status(200).json_body(json!({
            "error": {"error_code": 5, "error_msg": "User authorization failed"}
        }));
    });

    let env = Env::new(&server);
    handle_run(env.args(&env.feed(FEED_V1), true)).unwrap();

    let err = handle_run(env.args(&env.feed(FEED_V2), false)).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("vk"), "unexpected error: {}", message);
    telegram.assert_hits(1);
    assert_eq!(env.recorded(), 1);
}

#[test]
fn test_missing_config_is_config_stage_error() {
    let temp = tempdir().unwrap();
    let feed = temp.path().join("feed.xml");
    fs::write(&feed, FEED_V1).unwrap();

    let args = RunArgs {
        fileparse: feed,
        configpath: Some(temp.path().join("nope.yml")),
        initdb: false,
        dry_run: false,
        json: false,
    };
    let err = handle_run(args).unwrap_err();
    assert!(format!("{:#}", err).contains("config stage"));
}
