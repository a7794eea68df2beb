mod poller;

pub use poller::{to_send_messages, TelegramPoller, MAX_MESSAGE_LEN};
