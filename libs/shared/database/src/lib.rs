pub mod supabase;

pub use supabase::{StoreError, SupabaseClient};

use std::sync::Arc;

use shared_config::AppConfig;

/// Shared application state handed to every router. Holding the store client
/// here (rather than rebuilding it per request) keeps persistence an injected
/// dependency that tests can point at a local mock server.
pub struct AppState {
    pub config: AppConfig,
    pub supabase: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        Self { config, supabase }
    }
}
