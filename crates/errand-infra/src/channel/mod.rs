//! Channel client implementations (Twitter, Telegram).

pub mod telegram;
pub mod twitter;

pub use telegram::TelegramBotClient;
pub use twitter::TwitterApiClient;
