use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MAX_APPOINTMENT_MINUTES: i64 = 240;
pub const DEFAULT_PATIENT_FEED_POLL_SECONDS: u64 = 5;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Upper bound on a bookable duration. Also the look-back of the conflict pre-filter.
    pub max_appointment_minutes: i64,
    pub patient_feed_poll_seconds: u64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            max_appointment_minutes: DEFAULT_MAX_APPOINTMENT_MINUTES,
            patient_feed_poll_seconds: DEFAULT_PATIENT_FEED_POLL_SECONDS,
            server_port: DEFAULT_SERVER_PORT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            max_appointment_minutes: parse_or_default(
                "SCHEDULING_MAX_APPOINTMENT_MINUTES",
                DEFAULT_MAX_APPOINTMENT_MINUTES,
            ),
            patient_feed_poll_seconds: parse_or_default(
                "PATIENT_FEED_POLL_SECONDS",
                DEFAULT_PATIENT_FEED_POLL_SECONDS,
            ),
            server_port: parse_or_default("SERVER_PORT", DEFAULT_SERVER_PORT),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to in-memory stores");
        }

        config
    }

    /// True when the Supabase-backed stores can be used.
    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", key, default);
            default
        }
    }
}
