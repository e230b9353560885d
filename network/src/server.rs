// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP front end.
//!
//! A client opens with `{"event":"join","value":"<room id>"}` and then
//! exchanges framed events. Each connection runs one reader loop and one
//! writer task draining its outbound queue.

use crate::codec;
use crate::event::Event;
use crate::registry::RoomRegistry;
use crate::RoomId;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

/// Accept connections until the listener fails
pub async fn serve(listener: TcpListener, registry: Arc<RoomRegistry>) -> Result<()> {
    let local = listener.local_addr().context("listener has no address")?;
    tracing::info!(%local, "accepting connections");
    loop {
        let (stream, peer) = listener.accept().await.context("accept failed")?;
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, registry).await {
                tracing::debug!(%peer, "connection ended: {e:#}");
            }
        });
    }
}

/// The room a client asked for in its first frame
fn join_target(first: &Event) -> Result<RoomId> {
    match (first.event.as_str(), first.value.as_str()) {
        ("join", Some(id)) if !id.is_empty() => Ok(id.to_string()),
        ("join", _) => bail!("join needs a room id"),
        (other, _) => bail!("expected join, got {other}"),
    }
}

async fn handle_connection(stream: TcpStream, registry: Arc<RoomRegistry>) -> Result<()> {
    let max_len = registry.config().max_frame_len;
    let (mut reader, mut writer) = stream.into_split();

    let Some(first) = codec::read_event(&mut reader, max_len).await? else {
        return Ok(());
    };
    let room_id = join_target(&first)?;
    let conn_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("connection", room = %room_id, conn = %conn_id);

    async move {
        let (room, mut outbound) = registry.join(&room_id, &conn_id).await;

        let writer_task = tokio::spawn(
            async move {
                while let Some(evt) = outbound.recv().await {
                    if let Err(e) = codec::write_event(&mut writer, &evt).await {
                        tracing::debug!("write failed: {e}");
                        break;
                    }
                }
            }
            .in_current_span(),
        );

        let mut closed = room.subscribe_closed();
        let result: Result<()> = loop {
            if *closed.borrow() {
                break Ok(());
            }
            tokio::select! {
                read = codec::read_event(&mut reader, max_len) => match read {
                    Ok(Some(evt)) => room.handle(&conn_id, evt).await,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                },
                _ = closed.changed() => break Ok(()),
            }
        };

        room.deregister_connection(&conn_id).await;
        // the queue's sender is gone now, so the writer drains and stops
        if let Err(e) = writer_task.await {
            tracing::debug!("writer task failed: {e}");
        }
        result
    }
    .instrument(span)
    .await
}
