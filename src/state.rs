use crate::config::AppConfig;
use crate::users::UserStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, users: Arc<dyn UserStore>) -> Self {
        Self { config, users }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::users::memory::MemoryUserStore;

        let config = AppConfig::from_lookup(|_| None).expect("default config");
        Self::new(Arc::new(config), Arc::new(MemoryUserStore::default()))
    }
}
