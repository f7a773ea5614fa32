use anyhow::Result;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: Option<String>,
    pub http_addr: String,
    pub bot_token: Option<String>,
    pub upload_dir: String,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok();
        let http_addr =
            std::env::var("HTTP_ADDR").unwrap_or_else(|_| default_http_addr.to_string());
        let bot_token = std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty());
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

        Ok(Self {
            database_url,
            http_addr,
            bot_token,
            upload_dir,
        })
    }
}
