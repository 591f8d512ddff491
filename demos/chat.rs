use portal_realtime::{
    FileSessionStore, RealtimeClient, RealtimeClientOptions, RealtimeEvent, SessionStatus,
    SessionStore, listener,
};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_realtime=info".into()),
        )
        .init();

    let user_id = env::var("PORTAL_USER_ID")?;
    let recipient_id = env::var("PORTAL_RECIPIENT_ID").ok();

    let session = FileSessionStore::new(
        env::var("PORTAL_SESSION_FILE").unwrap_or_else(|_| "session.json".to_string()),
    );
    if let Ok(token) = env::var("PORTAL_TOKEN") {
        session.save(&token, None)?;
    }

    let client = RealtimeClient::builder(RealtimeClientOptions::from_env())?
        .with_session_store(session)
        .build();
    println!("Endpoint: {}", client.endpoint());

    client.on(
        RealtimeEvent::MessageReceive,
        listener(|payload| println!("📨 {}", payload)),
    );
    client.on(
        RealtimeEvent::MessageSent,
        listener(|payload| println!("✅ delivered {}", payload)),
    );
    client.on(
        RealtimeEvent::UserOnline,
        listener(|payload| println!("🟢 {}", payload)),
    );
    client.on(
        RealtimeEvent::UserOffline,
        listener(|payload| println!("⚪ {}", payload)),
    );
    client.on(
        RealtimeEvent::Disconnect,
        listener(|reason| println!("Disconnected: {}", reason)),
    );

    // Connect
    client.connect(&user_id).await?;

    let mut status = client.watch_status().await;
    let ready = status
        .wait_for(|s| matches!(s, SessionStatus::Ready | SessionStatus::Failed(_)))
        .await?
        .clone();
    if let SessionStatus::Failed(reason) = ready {
        println!("Could not authenticate: {}", reason);
        return Ok(());
    }
    println!("Connected as {}", user_id);

    if let Some(recipient_id) = recipient_id {
        client.start_typing(&recipient_id).await?;
        client
            .send_message(&recipient_id, "Hello from the realtime demo", None, Some("demo-1"))
            .await?;
        client.stop_typing(&recipient_id).await?;
    }

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    client.disconnect().await;

    Ok(())
}
