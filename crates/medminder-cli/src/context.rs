//! Wiring shared by the subcommands.

use std::sync::Arc;

use medminder_core::remote::token_store;
use medminder_core::{AlarmDb, AlarmManager, Clock, ConfigStore, PreferenceStore, SupabaseClient, SystemClock};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Local state only: config file, alarm registry and clock.
pub struct Local {
    pub prefs: Arc<ConfigStore>,
    pub alarms: Arc<AlarmDb>,
    pub clock: Arc<dyn Clock>,
}

impl Local {
    pub fn open() -> CliResult<Self> {
        Ok(Self {
            prefs: Arc::new(ConfigStore::open()?),
            alarms: Arc::new(AlarmDb::open()?),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn manager(&self) -> AlarmManager {
        AlarmManager::new(self.alarms.clone(), self.prefs.clone(), self.clock.clone())
    }
}

/// Local state plus a backend client carrying the stored access token.
pub struct Context {
    pub local: Local,
    pub backend: Arc<SupabaseClient>,
}

impl Context {
    pub fn open() -> CliResult<Self> {
        let local = Local::open()?;
        let backend_cfg = local.prefs.config().backend;
        if backend_cfg.url.is_empty() {
            return Err("backend.url is not set; run `medminder config set backend.url <url>`".into());
        }

        let token = match token_store::load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "keyring unavailable, continuing without a stored session");
                None
            }
        };
        let backend = SupabaseClient::new(&backend_cfg.url, &backend_cfg.anon_key)?.with_access_token(token);
        Ok(Self {
            local,
            backend: Arc::new(backend),
        })
    }

    pub fn prefs(&self) -> Arc<dyn PreferenceStore> {
        self.local.prefs.clone()
    }

    /// Store or clear the keyring token to match the client.
    pub fn persist_token(&self) {
        let result = match self.backend.access_token() {
            Some(token) => token_store::save(&token),
            None => token_store::clear(),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to update stored access token");
        }
    }
}
