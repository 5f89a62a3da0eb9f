//! Channel resolution: the business line is upserted on every event.

use database::channel::{self, ChannelUpsert};
use database::{Channel, SqlitePool};
use tracing::debug;

use crate::error::Critical;
use crate::payload::WhatsAppAccount;
use crate::phone::digits_only;
use crate::sanitize::{sanitize_text, truncate_chars, MAX_NAME_CHARS, MAX_PHONE_CHARS};

pub async fn resolve(pool: &SqlitePool, account: &WhatsAppAccount) -> Critical<Channel> {
    let external_id = digits_only(&account.phone);
    let phone = truncate_chars(account.phone.trim(), MAX_PHONE_CHARS);
    let name = account
        .full_name
        .as_deref()
        .map(|name| sanitize_text(name, MAX_NAME_CHARS))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| phone.clone());

    let channel = channel::upsert_channel(
        pool,
        &ChannelUpsert {
            external_id: &external_id,
            name: &name,
            phone: &phone,
        },
    )
    .await?;

    debug!(channel_id = %channel.id, external_id = %channel.external_id, "Channel resolved");
    Ok(channel)
}
