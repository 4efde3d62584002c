pub mod server;

use secrecy::SecretString;

pub enum Action {
    Server {
        port: u16,
        dsn: String,
        secret: SecretString,
        frontend_url: String,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        rotate_refresh: bool,
    },
}
