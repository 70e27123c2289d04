use std::sync::Arc;
use std::time::Instant;

use crate::chat::ChatService;
use crate::config::Settings;
use crate::hub::HubHandle;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub chat: Arc<ChatService>,
    pub hub: HubHandle,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings, chat: Arc<ChatService>, hub: HubHandle) -> Self {
        Self {
            settings: Arc::new(settings),
            chat,
            hub,
            start_time: Instant::now(),
        }
    }
}
