mod settings;

pub use settings::{
    ChatConfig, DatabaseConfig, OtelConfig, ServerConfig, Settings, StoreConfig, WebSocketConfig,
};
