//! Runs against a live database: `cargo test --features postgres-tests` with
//! `DATABASE_URL` pointing at a server where the test user may create databases.
#![cfg(feature = "postgres-tests")]

use std::sync::Arc;

use anyhow::{Result, anyhow};
use axum::http::StatusCode;
use axum_test::TestServer;
use redsky_config::PeerTrust;
use redsky_core::{
    api::routes::{v1, with_id},
    application::unit_of_work::AppUnitOfWork,
    database::PostgresDatabase,
    testing::ScriptedPeerClient,
};
use redsky_model::{CommunityId, MemberId};
use redsky_server::infra::{app_state::AppState, startup::create_app};
use serde_json::{Value, json};
use sqlx::PgPool;

#[path = "support/mod.rs"]
mod support;
use support::{AsActor, peer_info, test_config};

async fn seed_community(pool: &PgPool, members: usize) -> Result<(CommunityId, Vec<MemberId>)> {
    let community = CommunityId::new();
    sqlx::query("INSERT INTO communities (id, name) VALUES ($1, $2)")
        .bind(community.to_uuid())
        .bind("Riverside")
        .execute(pool)
        .await?;

    let mut ids = Vec::with_capacity(members);
    for index in 0..members {
        let member = MemberId::new();
        sqlx::query("INSERT INTO members (id, display_name) VALUES ($1, $2)")
            .bind(member.to_uuid())
            .bind(format!("member-{index}"))
            .execute(pool)
            .await?;
        let role = if index == 0 { "admin" } else { "member" };
        sqlx::query(
            "INSERT INTO community_members (community_id, member_id, role) VALUES ($1, $2, $3)",
        )
        .bind(community.to_uuid())
        .bind(member.to_uuid())
        .bind(role)
        .execute(pool)
        .await?;
        ids.push(member);
    }
    Ok((community, ids))
}

fn server(pool: PgPool, peers: Arc<ScriptedPeerClient>) -> Result<TestServer> {
    let db = PostgresDatabase::from_pool(pool);
    let state = AppState::new(
        Arc::new(test_config(PeerTrust::Any)),
        Arc::new(AppUnitOfWork::from_postgres(&db)),
        peers,
    )?;
    TestServer::new(create_app(state)).map_err(|err| anyhow!(err.to_string()))
}

#[sqlx::test(migrator = "redsky_core::MIGRATOR")]
async fn votes_persist_and_flip_mode(pool: PgPool) -> Result<()> {
    let (community, members) = seed_community(&pool, 3).await?;
    let server = server(pool.clone(), Arc::default())?;
    let vote = with_id(v1::crisis::VOTE, community);

    let first = server
        .post(&vote)
        .as_actor(members[0])
        .json(&json!({"vote_type": "activate"}))
        .await;
    first.assert_status_ok();

    server
        .post(&vote)
        .as_actor(members[0])
        .json(&json!({"vote_type": "activate"}))
        .await
        .assert_status(StatusCode::CONFLICT);

    let second = server
        .post(&vote)
        .as_actor(members[1])
        .json(&json!({"vote_type": "activate"}))
        .await;
    second.assert_status_ok();
    let body: Value = second.json();
    assert_eq!(body["data"]["transitioned_to"], "red");

    let (mode, epoch): (String, i64) =
        sqlx::query_as("SELECT mode, transition_epoch FROM communities WHERE id = $1")
            .bind(community.to_uuid())
            .fetch_one(&pool)
            .await?;
    assert_eq!(mode, "red");
    assert_eq!(epoch, 1);

    Ok(())
}

#[sqlx::test(migrator = "redsky_core::MIGRATOR")]
async fn tickets_and_comments_round_trip(pool: PgPool) -> Result<()> {
    let (community, members) = seed_community(&pool, 2).await?;
    let server = server(pool, Arc::default())?;

    let created = server
        .post(&with_id(v1::tickets::COLLECTION, community))
        .as_actor(members[1])
        .json(&json!({"ticket_type": "request", "title": "Sandbags", "urgency": "high"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body: Value = created.json();
    let ticket_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let item = with_id(v1::tickets::ITEM, community).replacen("{ticket_id}", &ticket_id, 1);
    let updated = server
        .patch(&item)
        .as_actor(members[0])
        .json(&json!({"status": "in_progress", "assigned_to": members[1].to_string()}))
        .await;
    updated.assert_status_ok();
    let body: Value = updated.json();
    assert_eq!(body["data"]["status"], "in_progress");

    let comments = with_id(v1::tickets::COMMENTS, community).replacen("{ticket_id}", &ticket_id, 1);
    server
        .post(&comments)
        .as_actor(members[0])
        .json(&json!({"body": "Truck leaves at 6"}))
        .await
        .assert_status(StatusCode::CREATED);
    let listed: Value = server.get(&comments).as_actor(members[1]).await.json();
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    Ok(())
}

#[sqlx::test(migrator = "redsky_core::MIGRATOR")]
async fn directory_upserts_by_url(pool: PgPool) -> Result<()> {
    let (_community, members) = seed_community(&pool, 1).await?;
    sqlx::query("UPDATE members SET platform_role = 'admin' WHERE id = $1")
        .bind(members[0].to_uuid())
        .execute(&pool)
        .await?;

    let peers = Arc::new(ScriptedPeerClient::default());
    peers.online("https://north.example", peer_info("North Hub", "https://north.example"));
    let server = server(pool.clone(), peers)?;

    for url in ["https://north.example", "https://NORTH.example/"] {
        server
            .post(v1::directory::COLLECTION)
            .as_actor(members[0])
            .json(&json!({ "url": url }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM known_instances")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 1);

    Ok(())
}
