pub struct Env {
    pub database_url: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub supabase_bucket: String,
    pub cloud_timeout_secs: u64,
    pub upload_dir: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    pub allowed_file_types: Option<Vec<String>>,
    pub max_jpeg_bytes: Option<usize>,
    pub max_png_bytes: Option<usize>,
    pub max_pdf_bytes: Option<usize>,
}

fn optional_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional_var(key).unwrap_or_else(|| default.to_string())
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: &str) -> T {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>()))
}

fn optional_size(key: &str) -> Option<usize> {
    optional_var(key).map(|v| {
        v.parse::<usize>()
            .unwrap_or_else(|_| panic!("{key} must be a byte count"))
    })
}

impl Env {
    fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");

        let supabase_url = optional_var("SUPABASE_URL");
        let supabase_key = optional_var("SUPABASE_KEY");
        let supabase_bucket = var_or("SUPABASE_BUCKET", "files");
        let cloud_timeout_secs = parsed_var::<u64>("CLOUD_TIMEOUT_SECS", "30");

        let upload_dir = var_or("UPLOAD_DIR", "uploads");
        let frontend_url = var_or("FRONTEND_URL", "http://localhost:5173");
        let ip = var_or("IP", "127.0.0.1");
        let port = parsed_var::<u16>("PORT", "5000");

        let rate_limit_max = parsed_var::<u32>("RATE_LIMIT_MAX", "100");
        let rate_limit_window_secs = parsed_var::<u64>("RATE_LIMIT_WINDOW_SECS", "900");

        let allowed_file_types = optional_var("ALLOWED_FILE_TYPES").map(|list| {
            list.split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect()
        });

        Env {
            database_url,
            supabase_url,
            supabase_key,
            supabase_bucket,
            cloud_timeout_secs,
            upload_dir,
            frontend_url,
            ip,
            port,
            rate_limit_max,
            rate_limit_window_secs,
            allowed_file_types,
            max_jpeg_bytes: optional_size("MAX_JPEG_BYTES"),
            max_png_bytes: optional_size("MAX_PNG_BYTES"),
            max_pdf_bytes: optional_size("MAX_PDF_BYTES"),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
