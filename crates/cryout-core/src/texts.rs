//! User-facing texts (fixed, operator-language).

use std::time::Duration;

pub const START_COMMAND: &str = "/start";

pub const RULES: &str = "📝 Правила отправки сообщений:\n\n\
1. Цель сообщения – выплеснуть эмоции и получить поддержку.\n\
2. Сообщение должно быть преимущественно на русском языке.\n\
3. Запрещены грубые матерные выражения.";

pub const DUPLICATE_NOTICE: &str = "⚠️ Вы уже отправляли такое сообщение ранее.";

pub const CHECK_FAILED_NOTICE: &str = "🚫 Ошибка проверки. Попробуйте позже.";

pub const PUBLISH_FAILED_NOTICE: &str = "🚫 Ошибка публикации. Попробуйте позже.";

pub fn rate_limited_notice(window: Duration) -> String {
    let minutes = (window.as_secs() / 60).max(1);
    format!("⏳ Вы можете отправлять одно сообщение раз в {minutes} минут.")
}

pub fn rejected_notice() -> String {
    format!("🚫 Сообщение не соответствует правилам.\n\n{RULES}")
}

pub fn published_notice(link: &str) -> String {
    format!("✅ Сообщение опубликовано: {link}")
}
