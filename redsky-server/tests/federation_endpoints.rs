use anyhow::Result;
use axum::http::StatusCode;
use redsky_config::PeerTrust;
use redsky_core::api::routes::{v1, with_id};
use serde_json::{Value, json};

#[path = "support/mod.rs"]
mod support;
use support::{AsActor, LOCAL_URL, TestApp, peer_info, test_config};

const NORTH: &str = "https://north.example";
const SOUTH: &str = "https://south.example";

#[tokio::test]
async fn register_probes_the_peer_before_storing() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.platform_admin();
    app.peers.online(NORTH, peer_info("North Hub", NORTH));
    app.peers.down(SOUTH);

    let created = app
        .server
        .post(v1::directory::COLLECTION)
        .as_actor(admin)
        .json(&json!({"url": "https://North.Example/"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body: Value = created.json();
    assert_eq!(body["data"]["instance_url"], NORTH);
    assert_eq!(body["data"]["name"], "North Hub");
    assert_eq!(body["data"]["is_reachable"], true);

    let unreachable = app
        .server
        .post(v1::directory::COLLECTION)
        .as_actor(admin)
        .json(&json!({"url": SOUTH}))
        .await;
    unreachable.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = unreachable.json();
    assert_eq!(body["error"]["code"], "peer_unavailable");

    let listed = app
        .server
        .get(v1::directory::COLLECTION)
        .as_actor(admin)
        .await;
    listed.assert_status_ok();
    let body: Value = listed.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn refresh_flags_peers_that_stopped_answering() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.platform_admin();
    app.peers.online(NORTH, peer_info("North Hub", NORTH));
    app.peers.online(SOUTH, peer_info("South Hub", SOUTH));
    for url in [NORTH, SOUTH] {
        app.server
            .post(v1::directory::COLLECTION)
            .as_actor(admin)
            .json(&json!({ "url": url }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    app.peers.hang(SOUTH);
    let refreshed = app
        .server
        .post(v1::directory::REFRESH)
        .as_actor(admin)
        .await;
    refreshed.assert_status_ok();
    let body: Value = refreshed.json();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["refreshed"], 1);
    assert_eq!(body["data"]["unreachable"], 1);

    let reachable = app
        .server
        .get(v1::directory::COLLECTION)
        .add_query_param("reachable_only", true)
        .as_actor(admin)
        .await;
    let body: Value = reachable.json();
    assert_eq!(body["data"][0]["instance_url"], NORTH);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[tokio::test]
async fn only_platform_admins_remove_peers() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.platform_admin();
    let (_community, community_admin, _) = app.community(0);
    app.peers.online(NORTH, peer_info("North Hub", NORTH));

    let created = app
        .server
        .post(v1::directory::COLLECTION)
        .as_actor(community_admin)
        .json(&json!({"url": NORTH}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body: Value = created.json();
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    let item = with_id(v1::directory::ITEM, &id);

    app.server
        .delete(&item)
        .as_actor(community_admin)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .delete(&item)
        .as_actor(admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&item)
        .as_actor(admin)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn broadcast_survives_a_dead_peer() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.platform_admin();
    app.peers.online(NORTH, peer_info("North Hub", NORTH));
    app.peers.online(SOUTH, peer_info("South Hub", SOUTH));
    for url in [NORTH, SOUTH] {
        app.server
            .post(v1::directory::COLLECTION)
            .as_actor(admin)
            .json(&json!({ "url": url }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    app.peers.down(SOUTH);

    let (_community, member, _) = app.community(0);
    app.server
        .post(v1::alerts::SEND)
        .as_actor(member)
        .json(&json!({"title": "Wildfire", "severity": "critical"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let sent = app
        .server
        .post(v1::alerts::SEND)
        .as_actor(admin)
        .json(&json!({"title": "Wildfire", "body": "Evacuate zone 3", "severity": "critical"}))
        .await;
    sent.assert_status(StatusCode::CREATED);
    let body: Value = sent.json();
    assert_eq!(body["data"]["succeeded"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["alert"]["origin"], "local");
    assert_eq!(body["data"]["alert"]["source_instance_url"], LOCAL_URL);

    assert_eq!(app.peers.pushed_to(), vec![NORTH.to_string()]);
    let delivered = app.peers.delivered_alerts();
    assert_eq!(delivered[0].title, "Wildfire");
    assert_eq!(delivered[0].severity, "critical");

    Ok(())
}

#[tokio::test]
async fn received_alerts_can_be_dismissed_locally() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.platform_admin();

    // Peers push without an actor header.
    let received = app
        .server
        .post(v1::alerts::RECEIVE)
        .json(&json!({
            "source_instance_url": "https://North.Example/",
            "source_instance_name": "North Hub",
            "title": "Storm surge",
            "description": "Move to high ground",
            "severity": "warning"
        }))
        .await;
    received.assert_status(StatusCode::CREATED);
    let body: Value = received.json();
    assert_eq!(body["data"]["origin"], "remote");
    assert_eq!(body["data"]["source_instance_url"], NORTH);
    assert_eq!(body["data"]["body"], "Move to high ground");
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let active = app.server.get(v1::alerts::COLLECTION).as_actor(admin).await;
    let body: Value = active.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    app.server
        .patch(&with_id(v1::alerts::DISMISS, &id))
        .as_actor(admin)
        .await
        .assert_status_ok();

    let active = app.server.get(v1::alerts::COLLECTION).as_actor(admin).await;
    let body: Value = active.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let history = app
        .server
        .get(v1::alerts::COLLECTION)
        .add_query_param("active_only", false)
        .as_actor(admin)
        .await;
    let body: Value = history.json();
    assert_eq!(body["data"][0]["dismissed"], true);

    Ok(())
}

#[tokio::test]
async fn malformed_inbound_alerts_are_rejected() -> Result<()> {
    let app = TestApp::new()?;

    app.server
        .post(v1::alerts::RECEIVE)
        .json(&json!({
            "source_instance_url": "not a url",
            "title": "Storm",
            "severity": "warning"
        }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    app.server
        .post(v1::alerts::RECEIVE)
        .json(&json!({
            "source_instance_url": NORTH,
            "title": "Storm",
            "severity": "apocalyptic"
        }))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn known_peer_trust_rejects_strangers() -> Result<()> {
    let app = TestApp::with_config(test_config(PeerTrust::Known))?;
    let admin = app.platform_admin();
    app.peers.online(NORTH, peer_info("North Hub", NORTH));
    app.server
        .post(v1::directory::COLLECTION)
        .as_actor(admin)
        .json(&json!({"url": NORTH}))
        .await
        .assert_status(StatusCode::CREATED);

    let payload = |source: &str| {
        json!({"source_instance_url": source, "title": "Heat wave", "severity": "info"})
    };

    app.server
        .post(v1::alerts::RECEIVE)
        .json(&payload(SOUTH))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .post(v1::alerts::RECEIVE)
        .json(&payload(NORTH))
        .await
        .assert_status(StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn instance_info_is_public_and_reports_crisis() -> Result<()> {
    let app = TestApp::new()?;
    let (community, admin, _) = app.community(2);

    let info = app.server.get(v1::instance::INFO).await;
    info.assert_status_ok();
    let body: Value = info.json();
    assert_eq!(body["name"], "Local Hub");
    assert_eq!(body["url"], LOCAL_URL);
    assert_eq!(body["platform_mode"], "blue");
    assert_eq!(body["community_count"], 1);
    assert_eq!(body["user_count"], 3);

    app.server
        .post(&with_id(v1::crisis::TOGGLE, community))
        .as_actor(admin)
        .json(&json!({"mode": "red"}))
        .await
        .assert_status_ok();

    let body: Value = app.server.get(v1::instance::INFO).await.json();
    assert_eq!(body["platform_mode"], "red");

    Ok(())
}
