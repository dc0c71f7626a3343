// SPDX-FileCopyrightText: 2026 Gramkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization from grammers objects to gramkeep's tagged records.
//!
//! Everything downstream of the gateway sees [`PeerInfo`] and
//! [`ArchivedMessage`] only; the library's `Chat` and `Message` types stop
//! here. Ids are canonicalized to the signed marked form (channels carry
//! the `-100...` prefix) so that they match what Telegram clients display
//! and what callers pass in.

use grammers_client::types::{Chat, Message};
use grammers_session::PackedType;
use gramkeep_core::peer::mark_id;
use gramkeep_core::{ArchivedMessage, PeerInfo, PeerKind};

/// Classify a packed peer type into the three dialog kinds.
pub(crate) fn peer_kind_from_packed(ty: PackedType) -> PeerKind {
    match ty {
        PackedType::User | PackedType::Bot => PeerKind::User,
        PackedType::Chat => PeerKind::Chat,
        PackedType::Megagroup | PackedType::Broadcast | PackedType::Gigagroup => PeerKind::Channel,
    }
}

/// The canonical signed id for a chat.
pub(crate) fn chat_marked_id(chat: &Chat) -> i64 {
    let packed = chat.pack();
    mark_id(peer_kind_from_packed(packed.ty), packed.id)
}

/// Map a chat to the peer record used by the dialog index and tools.
pub(crate) fn peer_info_from_chat(chat: &Chat) -> PeerInfo {
    let packed = chat.pack();
    let kind = peer_kind_from_packed(packed.ty);
    PeerInfo {
        id: mark_id(kind, packed.id),
        kind,
        title: chat.name().to_string(),
        username: chat.username().map(|u| u.to_lowercase()),
    }
}

/// Map a library message to the tagged record the archiver persists.
///
/// `from_id` is the stringified marked sender id, or `"unknown"` when the
/// sender is unavailable. `raw` is the serialized normalized form; it is
/// what lands in the archive's `raw_json` column.
pub(crate) fn normalize_message(msg: &Message, peer: &PeerInfo) -> ArchivedMessage {
    let id = i64::from(msg.id());
    let date = Some(msg.date().timestamp());
    let text = msg.text().to_string();
    let from_id = msg
        .sender()
        .map(|sender| chat_marked_id(&sender).to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let raw = serde_json::json!({
        "id": id,
        "date": date,
        "text": text,
        "fromId": from_id,
        "peerType": peer.kind,
        "peerId": peer.id,
        "replyToMsgId": msg.reply_to_message_id(),
        "outgoing": msg.outgoing(),
    });

    ArchivedMessage {
        id,
        date,
        text,
        from_id,
        peer_kind: peer.kind,
        peer_id: peer.id,
        raw,
    }
}
