use crate::domain::MessageId;

/// Public deep link to a published channel post.
pub fn channel_post_link(channel: &str, message_id: MessageId) -> String {
    format!(
        "https://t.me/{}/{}",
        channel.strip_prefix('@').unwrap_or(channel),
        message_id.0
    )
}
