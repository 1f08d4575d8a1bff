//! Live notifications for dashboards, as a server-sent event stream.

use rocket::{
    response::stream::{Event, EventStream},
    tokio::{select, sync::broadcast::error::RecvError},
    Route, Shutdown, State,
};

use crate::events::Notifier;

pub fn routes() -> Vec<Route> {
    routes![events]
}

/// Stream every notification published from now on. Subscribers that fall behind skip ahead;
/// dashboards are expected to re-poll for anything they missed.
#[get("/events")]
fn events(notifier: &State<Notifier>, mut shutdown: Shutdown) -> EventStream![] {
    let mut receiver = notifier.subscribe();
    EventStream! {
        loop {
            let notification = select! {
                received = receiver.recv() => match received {
                    Ok(notification) => notification,
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Event subscriber skipped {skipped} notifications");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };
            yield Event::json(&notification).event(notification.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        tokio::{io::AsyncReadExt, time::timeout},
    };

    use crate::voting::Voting;

    use super::*;

    #[backend_test]
    async fn status_changes_are_streamed(client: Client, voting: Voting) {
        let mut response = client.get(uri!(events)).dispatch().await;
        assert_eq!(response.content_type(), Some(ContentType::EventStream));

        voting.start(None, None).await.unwrap();

        let mut text = String::new();
        let mut buf = [0u8; 256];
        while !text.contains("active") {
            let read = timeout(Duration::from_secs(5), response.read(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert!(read > 0, "Stream ended early: {text}");
            text.push_str(&String::from_utf8_lossy(&buf[..read]));
        }
        assert!(text.contains("status_changed"), "{text}");
    }
}
