use crate::config::AppConfig;
use crate::locks::KeyLocks;
use crate::service::BagLifecycleManager;

#[derive(Clone)]
pub struct AppState {
    pub manager: BagLifecycleManager,
    pub locks: KeyLocks,
    pub config: AppConfig,
}
