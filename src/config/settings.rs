use std::env;
use std::net::SocketAddr;

#[derive(Clone)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub supabase_url: String,
    pub service_role_key: String,
    pub storage_bucket: String,
}

impl Settings {
    pub fn new() -> Self {
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        let supabase_url = env::var("SUPABASE_URL").expect("SUPABASE_URL must be set");
        let service_role_key =
            env::var("SUPABASE_SERVICE_ROLE_KEY").expect("SUPABASE_SERVICE_ROLE_KEY must be set");
        let storage_bucket =
            env::var("STORAGE_BUCKET").unwrap_or_else(|_| "checkin-photos".to_string());

        Self {
            port,
            addr,
            database_url,
            jwt_secret,
            supabase_url,
            service_role_key,
            storage_bucket,
        }
    }
}
